//! Shared state handed to every Axum handler via the `State<AppState>`
//! extractor, mirroring the teacher's MCP server state struct.

use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub max_upload_bytes: u64,
}
