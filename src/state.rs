use std::sync::Arc;

use crate::config::Config;
use crate::repository::{MemoryRepository, PgRepository, TaskRepository, UserRepository};

/// Shared, read-only state handed to every handler and to the session middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
    ) -> Self {
        Self {
            config,
            users,
            tasks,
        }
    }

    pub fn postgres(config: Config, repository: PgRepository) -> Self {
        let repository = Arc::new(repository);
        Self::new(config, repository.clone(), repository)
    }

    /// State backed by a fresh `MemoryRepository`; nothing survives a restart.
    pub fn in_memory(config: Config) -> Self {
        let repository = Arc::new(MemoryRepository::new());
        Self::new(config, repository.clone(), repository)
    }
}
