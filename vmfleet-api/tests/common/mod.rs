//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use reqwest::Client;
use tokio::net::TcpListener;
use vmfleet_api::{
    remote::{RemoteError, VmInventory},
    routes,
    shutdown::ShutdownCoordinator,
    AppState, Registry,
};
use vmfleet_common::{Host, HostConnection, Vm};

/// Create HTTP client with default settings
pub fn create_test_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

/// Serve a router on an ephemeral local port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });

    format!("http://{}", addr)
}

/// Inventory that reports a fixed VM list for every host
pub struct StaticInventory(pub Vec<Vm>);

#[async_trait]
impl VmInventory for StaticInventory {
    async fn try_fetch_vms(&self, _connection: &HostConnection) -> Result<Vec<Vm>, RemoteError> {
        Ok(self.0.clone())
    }
}

/// Inventory whose hypervisors never answer
pub struct DownInventory;

#[async_trait]
impl VmInventory for DownInventory {
    async fn try_fetch_vms(&self, _connection: &HostConnection) -> Result<Vec<Vm>, RemoteError> {
        Err(RemoteError::MissingToken)
    }
}

/// Test environment: a running API server plus a client
pub struct TestEnv {
    pub client: Client,
    pub base_url: String,
    pub shutdown: ShutdownCoordinator,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self::with_registry(Registry::new(), StaticInventory(Vec::new())).await
    }

    pub async fn with_registry(registry: Registry, inventory: impl VmInventory + 'static) -> Self {
        let state = AppState::new(registry, Arc::new(inventory));
        let shutdown = state.shutdown.clone();
        let base_url = serve(routes::router(state)).await;

        TestEnv {
            client: create_test_client(),
            base_url,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn create_host(&self, id: &str, name: &str) -> reqwest::Response {
        self.client
            .post(self.url("/hosts"))
            .json(&Host::new(id, name))
            .send()
            .await
            .expect("Create host request failed")
    }

    pub async fn create_vm(&self, host_id: &str, vm: &Vm) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/hosts/{}/vms", host_id)))
            .json(vm)
            .send()
            .await
            .expect("Create VM request failed")
    }

    pub async fn action(&self, host_id: &str, vm_id: &str, action: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/hosts/{}/vms/{}/{}", host_id, vm_id, action)))
            .send()
            .await
            .expect("VM action request failed")
    }

    pub async fn get_host(&self, host_id: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/hosts/{}", host_id)))
            .send()
            .await
            .expect("Get host request failed")
    }
}
