//! kb-chat - command line client for the knowledge-base chatbot
//!
//! Owns the message log, applies the commands sessions send it, and redraws a
//! one-line progress bar while an answer streams in.

use clap::{Parser, Subcommand};
use kb_chat::{
    auth::{AuthClient, CredentialProvider, CredentialStore},
    chat::{ChatLog, LogSender, MessageLog, ProgressView, SessionController, SessionOutcome, TurnId},
    config::AppConfig,
    i18n::Locale,
    logging,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Token of the session currently running, if any
type ActiveSession = watch::Sender<Option<CancellationToken>>;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    CancelSession,
    Exit,
}

/// What Ctrl-C means right now: cancel the running request, or quit at the prompt
fn on_interrupt(active: &watch::Receiver<Option<CancellationToken>>) -> Interrupt {
    let current = active.borrow().clone();
    match current {
        Some(token) => {
            token.cancel();
            Interrupt::CancelSession
        }
        None => Interrupt::Exit,
    }
}

/// One handler for the whole process. Once `ctrl_c()` has been polled the
/// default SIGINT behavior is gone, so idle Ctrl-C has to exit explicitly.
fn spawn_interrupt_handler(active: watch::Receiver<Option<CancellationToken>>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&active) {
                Interrupt::CancelSession => tracing::info!("Cancelling chat request"),
                Interrupt::Exit => {
                    eprintln!();
                    std::process::exit(130);
                }
            }
        }
    });
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the issued token
    Login {
        /// Account name
        #[arg(short, long)]
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Revoke the stored token and forget it
    Logout,
    /// Ask a single question
    Ask {
        /// Question text
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Interactive chat
    Chat,
}

#[derive(Parser, Debug)]
#[command(name = "kb-chat")]
#[command(version)]
#[command(about = "Knowledge-base chatbot client", long_about = None)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// API environment: development, production, docker_deploy
    #[arg(long)]
    env: Option<String>,

    /// UI language: en, ja
    #[arg(long)]
    lang: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(env) = &args.env {
        config.set_environment(env.parse()?);
    }
    if let Some(lang) = args.lang {
        config.language = Some(lang);
    }
    config.validate()?;

    let interactive = matches!(args.command, Command::Chat);
    logging::init_logging(args.verbose || config.debug, interactive)?;

    let locale = config.locale();
    tracing::info!(
        "Using {} API at {} ({}, {})",
        config.environment,
        config.api.base_url(),
        locale.display_name(),
        locale.code()
    );

    let store = Arc::new(CredentialStore::open(config.credentials_file())?);
    store.purge_expired()?;

    match args.command {
        Command::Login { username, password } => login(&config, &store, &username, password).await,
        Command::Logout => logout(&config, &store).await,
        Command::Ask { query } => {
            let controller = SessionController::from_config(&config, store);
            let (active, active_rx) = watch::channel(None);
            spawn_interrupt_handler(active_rx);

            let mut log = ChatLog::new();
            let outcome = run_query(&controller, &active, &query.join(" "), &mut log).await?;
            if matches!(outcome, SessionOutcome::Failed(_)) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Chat => {
            eprintln!("Logging to {}", logging::log_path_display());
            let controller = SessionController::from_config(&config, store);
            chat_loop(&controller).await
        }
    }
}

async fn login(
    config: &AppConfig,
    store: &CredentialStore,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            eprint!("Password: ");
            std::io::stderr().flush()?;
            let mut line = String::new();
            BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let client = AuthClient::new(config.api.clone(), config.timeouts.default_timeout());
    let credentials = client.login(username, &password).await?;
    store.save(credentials)?;

    println!("Logged in as {}", username);
    tracing::info!("Credentials stored at {:?}", store.path());
    Ok(())
}

async fn logout(config: &AppConfig, store: &CredentialStore) -> anyhow::Result<()> {
    if let Some(credentials) = store.credentials() {
        let client = AuthClient::new(config.api.clone(), config.timeouts.default_timeout());
        if let Err(e) = client.logout(&credentials).await {
            tracing::error!("Logout error: {}", e);
        }
    }

    // local state goes away even if the server call failed
    store.clear()?;
    println!("Logged out");
    Ok(())
}

async fn chat_loop(controller: &SessionController) -> anyhow::Result<()> {
    let (active, active_rx) = watch::channel(None);
    spawn_interrupt_handler(active_rx);

    let mut log = ChatLog::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                log.clear();
                continue;
            }
            query => {
                run_query(controller, &active, query, &mut log).await?;
            }
        }
    }

    Ok(())
}

/// Run one session, applying its log commands and redrawing as they arrive
async fn run_query(
    controller: &SessionController,
    active: &ActiveSession,
    query: &str,
    log: &mut ChatLog,
) -> anyhow::Result<SessionOutcome> {
    let (log_tx, mut log_rx) = LogSender::channel();
    let cancel = CancellationToken::new();
    let mut renderer = Renderer::new(controller.settings().locale, log);

    active.send_replace(Some(cancel.clone()));
    let session = controller.submit_with_cancel(query, &log_tx, cancel);
    tokio::pin!(session);

    let outcome = loop {
        tokio::select! {
            outcome = &mut session => break outcome,
            Some(command) = log_rx.recv() => {
                command.apply(log);
                renderer.render(log);
            }
        }
    };
    active.send_replace(None);
    let outcome = outcome?;

    while let Ok(command) = log_rx.try_recv() {
        command.apply(log);
    }
    renderer.render(log);

    Ok(outcome)
}

/// Prints finished bot turns once and keeps a progress line for the loading one
struct Renderer {
    locale: Locale,
    printed: HashSet<TurnId>,
    progress_shown: bool,
}

impl Renderer {
    fn new(locale: Locale, log: &ChatLog) -> Self {
        Self {
            locale,
            printed: log.list().iter().map(|t| t.id).collect(),
            progress_shown: false,
        }
    }

    fn render(&mut self, log: &ChatLog) {
        for turn in log.list() {
            if turn.is_user || self.printed.contains(&turn.id) {
                continue;
            }

            if turn.is_loading {
                if let Some(progress) = &turn.progress {
                    let view = ProgressView::derive(progress, self.locale);
                    eprint!(
                        "\r\x1b[2K{} {}  {}",
                        view.bar(30),
                        view.status_line(),
                        view.indicator_line()
                    );
                    let _ = std::io::stderr().flush();
                    self.progress_shown = true;
                }
                continue;
            }

            if self.progress_shown {
                eprint!("\r\x1b[2K");
                self.progress_shown = false;
            }
            println!("{}", turn.content);
            for doc in &turn.source_documents {
                println!("  [{}] ({:.2})", doc.document_id, doc.relevance_score);
            }
            self.printed.insert(turn.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_cancels_running_session() {
        let (active, active_rx) = watch::channel(None);
        let token = CancellationToken::new();
        active.send_replace(Some(token.clone()));

        assert_eq!(on_interrupt(&active_rx), Interrupt::CancelSession);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_interrupt_at_idle_prompt_exits() {
        let (active, active_rx) = watch::channel(Some(CancellationToken::new()));
        assert_eq!(on_interrupt(&active_rx), Interrupt::CancelSession);

        // session finished, prompt is idle again
        active.send_replace(None);
        assert_eq!(on_interrupt(&active_rx), Interrupt::Exit);
    }
}
