//! kb-chat - knowledge-base chatbot client
//!
//! Client for a knowledge-base assistant whose backend answers each query with
//! a stream of pipeline steps (intent analysis, field identification, retrieval
//! from OpenSearch/PostgreSQL/Neo4j, generation) before the final answer.
//!
//! # Modules
//!
//! - [`chat`] - NDJSON stream decoding, progress tracking and the session controller
//! - [`auth`] - Login, logout and stored credentials
//! - [`config`] - API environment, timeouts and language
//! - [`i18n`] - English and Japanese labels
//! - [`logging`] - tracing subscriber setup
//!
//! # Example
//!
//! ```rust,no_run
//! use kb_chat::{auth::CredentialStore, chat::{ChatLog, LogSender, MessageLog, SessionController}, config::AppConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load(None)?;
//! let store = Arc::new(CredentialStore::open(config.credentials_file())?);
//! let controller = SessionController::from_config(&config, store);
//!
//! let (log_tx, mut log_rx) = LogSender::channel();
//! let outcome = controller.submit("売上上位の顧客は?", &log_tx).await?;
//!
//! let mut log = ChatLog::new();
//! while let Ok(cmd) = log_rx.try_recv() {
//!     cmd.apply(&mut log);
//! }
//! println!("{:?} -> {} turns", outcome, log.list().len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod chat;
pub mod config;
pub mod i18n;
pub mod logging;

pub use auth::{AuthClient, CredentialStore, Credentials};
pub use chat::{ChatLog, ChatTurn, ProgressView, SessionController, SessionOutcome};
pub use config::AppConfig;
pub use i18n::Locale;
