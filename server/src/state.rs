use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::coordinator::MotionCoordinator;
use crate::registry::{IdGenerator, Registry};
use crate::store::PendulumStore;

/// Shared app state passed to every HTTP and WebSocket handler.
pub struct AppState<S> {
    pub coordinator: MotionCoordinator<S>,
    pub registry: Arc<Registry<S>>,
    pub connection_semaphore: Arc<Semaphore>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            registry: Arc::clone(&self.registry),
            connection_semaphore: Arc::clone(&self.connection_semaphore),
        }
    }
}

impl<S: PendulumStore> AppState<S> {
    /// Wire the coordinator and the registry to one store and one clock.
    pub fn new(store: Arc<S>, config: &ServerConfig, clock: Clock) -> Self {
        let registry = Registry::new(Arc::clone(&store), clock, IdGenerator::new(config.rng_seed));
        Self {
            coordinator: MotionCoordinator::new(store, config, clock),
            registry: Arc::new(registry),
            connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
        }
    }
}
