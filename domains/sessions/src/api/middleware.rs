//! Sessions domain state

use crate::pipeline::ChatPipeline;
use crate::service::SessionService;

/// Application state for the Sessions domain
#[derive(Clone)]
pub struct SessionsState {
    pub sessions: SessionService,
    pub pipeline: ChatPipeline,
}

impl SessionsState {
    pub fn new(sessions: SessionService, pipeline: ChatPipeline) -> Self {
        Self { sessions, pipeline }
    }
}
