// Seams towards the data collaborators: the service that prepares a session
// and the one that serves its frames in batches

pub mod http;
pub mod recorded;

pub use http::HttpBackend;
pub use recorded::RecordedBackend;

use crate::{
    errors::ReplayError,
    session::{FrameBatch, FrameBatchRequest, Session, SessionRequest},
};

/// Loads the metadata of a session so that its frames can be requested.
pub trait SessionLoader: Send + Sync {
    /// Prepares the session described by `request`.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the load attempt: transport errors,
    /// non-2xx responses, empty or malformed bodies and `success: false`.
    fn load_session(&self, request: &SessionRequest) -> Result<Session, ReplayError>;
}

/// Serves contiguous runs of frames for a loaded session.
///
/// Implementations are called from background threads, one call per batch.
pub trait FrameSource: Send + Sync {
    /// Returns the frames `[start_index, start_index + count)`, or fewer if
    /// the session ends earlier. An empty batch is not an error.
    fn fetch_frames(&self, request: &FrameBatchRequest) -> Result<FrameBatch, ReplayError>;

    /// Base URL that driver portraits and tyre icons are served from, if any.
    fn asset_base_url(&self) -> Option<String> {
        None
    }
}
