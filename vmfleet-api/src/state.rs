//! Application State
//!
//! Shared state for the vmfleet API server

use std::sync::Arc;

use crate::health::HealthChecker;
use crate::registry::Registry;
use crate::remote::VmInventory;
use crate::shutdown::ShutdownCoordinator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub inventory: Arc<dyn VmInventory>,
    pub health: Arc<HealthChecker>,
    pub shutdown: ShutdownCoordinator,
}

impl AppState {
    pub fn new(registry: Registry, inventory: Arc<dyn VmInventory>) -> Self {
        Self {
            registry: Arc::new(registry),
            inventory,
            health: Arc::new(HealthChecker::new(env!("CARGO_PKG_VERSION"))),
            shutdown: ShutdownCoordinator::new(),
        }
    }
}
