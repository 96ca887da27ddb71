use std::{fs::File, io::BufReader, path::Path};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    errors::ReplayError,
    session::{Frame, FrameBatch, FrameBatchRequest, Session, SessionRequest},
};

use super::{FrameSource, SessionLoader};

/// On-disk layout of a recorded session: the load response plus every frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecording {
    pub session: Session,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// Serves a session held entirely in memory, with the same batch semantics
/// as the replay server. Lets a recording be replayed without a server.
#[derive(Clone, Debug)]
pub struct RecordedBackend {
    session: Session,
    frames: Vec<Frame>,
}

impl RecordedBackend {
    pub fn new(mut session: Session, frames: Vec<Frame>) -> Self {
        if session.total_frames != frames.len() {
            warn!(
                "Recording declares {} frames but holds {}, using the latter",
                session.total_frames,
                frames.len()
            );
            session.total_frames = frames.len();
        }
        Self { session, frames }
    }

    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|e| ReplayError::RecordingIOError { source: e })?;
        let recording: SessionRecording = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ReplayError::RecordingParseError { source: e })?;
        info!(
            "Loaded recording {:?}: session {} with {} frames",
            path,
            recording.session.session_id,
            recording.frames.len()
        );
        Ok(Self::new(recording.session, recording.frames))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl SessionLoader for RecordedBackend {
    fn load_session(&self, _request: &SessionRequest) -> Result<Session, ReplayError> {
        Ok(self.session.clone())
    }
}

impl FrameSource for RecordedBackend {
    fn fetch_frames(&self, request: &FrameBatchRequest) -> Result<FrameBatch, ReplayError> {
        if request.session_id != self.session.session_id {
            return Err(ReplayError::UnknownSession {
                session_id: request.session_id.clone(),
            });
        }
        let start_index = request.start_index.min(self.frames.len());
        let end_index = (request.start_index + request.count).min(self.frames.len());
        Ok(FrameBatch {
            frames: self.frames[start_index..end_index].to_vec(),
            start_index,
            end_index,
            total_frames: Some(self.frames.len()),
        })
    }
}
