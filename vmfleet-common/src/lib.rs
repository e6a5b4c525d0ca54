//! Common types shared between vmfleet-api and its clients

use serde::{Deserialize, Serialize};

/// Virtual machine record
///
/// `status` is an open label: whatever the creator supplied, or the target
/// label of the last lifecycle action applied to the VM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vm {
    pub id: String,
    pub name: String,
    pub status: String,
}

impl Vm {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: status.into(),
        }
    }
}

/// Connection details for the hypervisor running on a host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostConnection {
    pub address: String,
    pub port: u16,
    pub username: String,
    /// Accepted on input, never echoed back
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl HostConnection {
    /// Base URL of the hypervisor API
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    /// Take over the stored password when none was supplied for the same
    /// hypervisor account. Responses never carry the password, so a record
    /// read and written back would otherwise lose it.
    pub fn inherit_password(&mut self, previous: &HostConnection) {
        if self.password.is_empty()
            && self.address == previous.address
            && self.port == previous.port
            && self.username == previous.username
        {
            self.password = previous.password.clone();
        }
    }
}

/// Virtualization host and the VMs it currently owns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vms: Vec<Vm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<HostConnection>,
}

impl Host {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vms: Vec::new(),
            connection: None,
        }
    }

    /// First VM with the given identifier
    pub fn vm(&self, vm_id: &str) -> Option<&Vm> {
        self.vms.iter().find(|vm| vm.id == vm_id)
    }

    pub fn vm_mut(&mut self, vm_id: &str) -> Option<&mut Vm> {
        self.vms.iter_mut().find(|vm| vm.id == vm_id)
    }

    /// Remove and return the first VM with the given identifier
    pub fn take_vm(&mut self, vm_id: &str) -> Option<Vm> {
        let index = self.vms.iter().position(|vm| vm.id == vm_id)?;
        Some(self.vms.remove(index))
    }
}

/// Fleet error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Virtual machine {vm_id} not found on host {host_id}")]
    VmNotFound { host_id: String, vm_id: String },

    #[error("Virtual machine {0} not found on any host")]
    VmNotLocated(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Host {0} has no hypervisor connection configured")]
    MissingConnection(String),
}

impl Error {
    pub fn vm_not_found(host_id: &str, vm_id: &str) -> Self {
        Error::VmNotFound {
            host_id: host_id.to_string(),
            vm_id: vm_id.to_string(),
        }
    }

    /// Whether the error means the addressed record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::HostNotFound(_) | Error::VmNotFound { .. } | Error::VmNotLocated(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
