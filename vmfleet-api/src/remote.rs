///! Hypervisor client
///!
///! Logs into the API exposed by each host's hypervisor and lists its VMs.
///! Callers choose between the fallible fetch and one that reports an
///! unreachable host or rejected login as no VMs.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vmfleet_common::{HostConnection, Vm};

use crate::validation;

/// Source of VM lists for a host
#[async_trait]
pub trait VmInventory: Send + Sync {
    /// VMs currently reported by the host
    async fn try_fetch_vms(&self, connection: &HostConnection) -> Result<Vec<Vm>, RemoteError>;

    /// Like [`VmInventory::try_fetch_vms`], but any failure is logged and
    /// reported as an empty list.
    async fn fetch_vms(&self, connection: &HostConnection) -> Vec<Vm> {
        match self.try_fetch_vms(connection).await {
            Ok(vms) => {
                debug!(address = %connection.address, count = vms.len(), "Fetched VMs from hypervisor");
                vms
            }
            Err(e) => {
                warn!(address = %connection.address, port = connection.port, "Failed to fetch VMs: {}", e);
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// VM entry as reported by the hypervisor
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteVm {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Status", alias = "status")]
    pub status: String,
}

impl From<RemoteVm> for Vm {
    fn from(remote: RemoteVm) -> Self {
        Vm::new(remote.name.clone(), remote.name, remote.status)
    }
}

/// Convert reported VMs into registry records. Names that are not valid VM
/// identifiers could never be addressed through the API and are skipped.
pub fn into_registry_vms(remote: Vec<RemoteVm>) -> Vec<Vm> {
    remote
        .into_iter()
        .map(Vm::from)
        .filter(|vm| match validation::validate_id("VM", &vm.id) {
            Ok(()) => true,
            Err(e) => {
                warn!(vm = %vm.name, "Skipping reported VM: {}", e);
                false
            }
        })
        .collect()
}

/// Hypervisor API errors
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("login response carried no token")]
    MissingToken,
}

/// reqwest-backed client for the hypervisor API
pub struct HypervisorClient {
    client: reqwest::Client,
}

impl HypervisorClient {
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, connection: &HostConnection) -> Result<String, RemoteError> {
        let url = format!("{}/login", connection.base_url());
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &connection.username,
                password: &connection.password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                endpoint: "/login",
                status: response.status(),
            });
        }

        let login: LoginResponse = response.json().await?;
        if login.token.is_empty() {
            return Err(RemoteError::MissingToken);
        }
        Ok(login.token)
    }

    /// List VMs with a previously obtained token
    pub async fn list_vms(&self, connection: &HostConnection, token: &str) -> Result<Vec<RemoteVm>, RemoteError> {
        let url = format!("{}/api/vms", connection.base_url());
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(RemoteError::Status {
                endpoint: "/api/vms",
                status: response.status(),
            });
        }

        Ok(response.json().await?)
    }

}

#[async_trait]
impl VmInventory for HypervisorClient {
    async fn try_fetch_vms(&self, connection: &HostConnection) -> Result<Vec<Vm>, RemoteError> {
        let token = self.login(connection).await?;
        let vms = self.list_vms(connection, &token).await?;
        Ok(into_registry_vms(vms))
    }
}
