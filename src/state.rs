use crate::config::Config;
use crate::repository::RepositoryState;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: Config,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
