use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    backend::ExamBackend,
    config::Config,
    exam::{registry::SessionRegistry, results::ResultCache},
};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn ExamBackend>,
    pub config: Config,
    pub sessions: SessionRegistry,
    pub results: ResultCache,
}

impl AppState {
    pub fn new(backend: Arc<dyn ExamBackend>, config: Config) -> Self {
        Self {
            backend,
            config,
            sessions: SessionRegistry::new(),
            results: ResultCache::default(),
        }
    }
}

impl FromRef<AppState> for Arc<dyn ExamBackend> {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for ResultCache {
    fn from_ref(state: &AppState) -> Self {
        state.results.clone()
    }
}
