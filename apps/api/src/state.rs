use std::sync::Arc;

use crate::config::Config;
use crate::reactions::generator::ReactionGenerator;
use crate::voters::cache::VoterCache;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Voter file, loaded once and shared read-only.
    pub voters: Arc<VoterCache>,
    pub reactions: ReactionGenerator,
    pub config: Config,
}
