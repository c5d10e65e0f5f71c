use axum::extract::FromRef;

use crate::programa_store::ProgramaStore;
use std::sync::Arc;

use super::ServerConfig;

pub type GuardedProgramaStore = Arc<dyn ProgramaStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub programa_store: GuardedProgramaStore,
}

impl FromRef<ServerState> for GuardedProgramaStore {
    fn from_ref(input: &ServerState) -> Self {
        input.programa_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
