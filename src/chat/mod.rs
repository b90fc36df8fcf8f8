//! Streaming chat pipeline
//!
//! Response bytes flow through these pieces in order:
//!
//! - [`frame`] - NDJSON decoding with carry-over across chunk boundaries
//! - [`classifier`] - backend step name → progress stage and percentage
//! - [`progress`] - monotonic progress state of the running session
//! - [`view`] - render-ready progress (label, bar, stage indicators)
//! - [`log`] - chat turns and the message log contract
//! - [`session`] - the controller that ties them to one HTTP request

pub mod classifier;
pub mod error;
pub mod frame;
pub mod log;
pub mod progress;
pub mod session;
pub mod transport;
pub mod view;

pub use classifier::{classify, Classification, Stage, FINAL_ANSWER_STEP};
pub use error::{ChatError, SubmitError};
pub use frame::{decode_frames, FrameDecoder, StreamFrame};
pub use log::{ChatLog, ChatTurn, LogCommand, LogSender, MessageLog, TurnId, TurnPatch};
pub use progress::ProgressState;
pub use session::{SessionController, SessionOutcome, SessionPhase, SessionSettings};
pub use transport::{ByteStream, ChatRequest, ChatTransport, HttpTransport, StreamResponse};
pub use view::ProgressView;
