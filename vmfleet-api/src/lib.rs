//! vmfleet API Library
//!
//! In-memory registry of virtualization hosts and their VMs, the lifecycle
//! operations applied to those VMs, and the HTTP surface exposing both.

// Core modules
pub mod config;
pub mod error;
pub mod validation;

// Registry and lifecycle
pub mod registry;
pub mod lifecycle;
pub use registry::Registry;

// Hypervisor access
pub mod remote;
pub mod inventory;

// HTTP surface
pub mod state;
pub mod routes;
pub use state::AppState;

// Logging configuration
pub mod logging;

// Health checks
pub mod health;

// Graceful shutdown handling
pub mod shutdown;
