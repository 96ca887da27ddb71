// Error types for trackside

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReplayError {
    // Errors talking to the replay server
    #[snafu(display("Error sending request to {url}"))]
    HttpRequestError { url: String, source: reqwest::Error },
    #[snafu(display("Server error: {status} - {message}"))]
    HttpStatusError { status: u16, message: String },
    #[snafu(display("Empty response from server"))]
    EmptyResponse,
    #[snafu(display("Invalid JSON response"))]
    InvalidResponse { source: serde_json::Error },

    // Session loading errors
    #[snafu(display("Error loading session: {reason}"))]
    SessionLoadFailed { reason: String },
    #[snafu(display("Session not found: {session_id}"))]
    UnknownSession { session_id: String },

    // Frame retrieval errors
    #[snafu(display("Error loading frames {start_index}..{end_index}"))]
    FrameBatchError {
        start_index: usize,
        end_index: usize,
        source: Box<ReplayError>,
    },

    // Recorded session files
    #[snafu(display("Error reading session recording"))]
    RecordingIOError { source: io::Error },
    #[snafu(display("Invalid session recording"))]
    RecordingParseError { source: serde_json::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}

impl ReplayError {
    /// Walks the boxed batch error chain down to the error that actually
    /// happened, so the UI can show something more useful than a range.
    pub fn root_cause(&self) -> &ReplayError {
        match self {
            ReplayError::FrameBatchError { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
