// Library interface for trackside
// The replay engine lives here so that integration tests and benchmarks can
// drive it without a window

pub mod backend;
pub mod errors;
pub mod replay;
pub mod session;

// Re-export commonly used types
pub use backend::{FrameSource, HttpBackend, RecordedBackend, SessionLoader};
pub use errors::ReplayError;
pub use replay::{PlaybackCommand, ReplayController};
pub use session::{Frame, Session, SessionRequest, SessionType};
