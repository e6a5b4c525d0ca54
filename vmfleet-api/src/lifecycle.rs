//! VM lifecycle actions
//!
//! Status changes are plain label overwrites: no transition table rejects an
//! edge, every action is accepted from every state. Copy and migrate are the
//! only composite operations and both complete under a single acquisition of
//! the registry lock.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;
use vmfleet_common::{Error, Result, Vm};

use crate::registry::{find_vm, host_entry, Registry};
use crate::validation;

/// Suffix appended to the identifier of a copied VM
pub const COPY_SUFFIX: &str = "_copy";

/// Status-changing lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Start,
    Reboot,
    Reset,
    Shutdown,
    Destroy,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 5] = [
        LifecycleAction::Start,
        LifecycleAction::Reboot,
        LifecycleAction::Reset,
        LifecycleAction::Shutdown,
        LifecycleAction::Destroy,
    ];

    /// Status label written to the VM by this action
    pub fn target_status(&self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Reboot => "rebooted",
            Self::Reset => "reset",
            Self::Shutdown => "shutdown",
            Self::Destroy => "destroyed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Reboot => "reboot",
            Self::Reset => "reset",
            Self::Shutdown => "shutdown",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown lifecycle action: {}", s)))
    }
}

/// Identifier given to a copy of `vm_id`
pub fn copy_id(vm_id: &str) -> String {
    format!("{}{}", vm_id, COPY_SUFFIX)
}

impl Registry {
    /// Apply a lifecycle action and return the updated VM
    pub async fn apply_action(&self, host_id: &str, vm_id: &str, action: LifecycleAction) -> Result<Vm> {
        let mut hosts = self.lock().await;
        let vm = find_vm(&mut hosts, host_id, vm_id)?;

        info!(
            host_id,
            vm_id,
            action = %action,
            from = %vm.status,
            to = action.target_status(),
            "VM status changed"
        );
        vm.status = action.target_status().to_string();
        Ok(vm.clone())
    }

    /// Clone a VM under `<id>_copy` and append it to the same host.
    ///
    /// Identifiers are not checked for collisions: copying the same VM twice
    /// leaves two VMs with the same derived identifier. A derived identifier
    /// past the length limit is rejected and nothing is added.
    pub async fn copy_vm(&self, host_id: &str, vm_id: &str) -> Result<Vm> {
        let mut hosts = self.lock().await;
        let host = host_entry(&mut hosts, host_id)?;

        let mut copy = host
            .vm(vm_id)
            .cloned()
            .ok_or_else(|| Error::vm_not_found(host_id, vm_id))?;
        copy.id = copy_id(vm_id);
        validation::validate_id("VM", &copy.id)?;

        info!(host_id, vm_id, copy_id = %copy.id, "VM copied");
        host.vms.push(copy.clone());
        Ok(copy)
    }

    /// Move a VM, located by identifier alone, to `target_host_id`.
    ///
    /// The target host is checked before the VM leaves its source, so a
    /// failed migration leaves the registry untouched. When the identifier
    /// exists on several hosts the host with the lowest identifier is used.
    pub async fn migrate_vm(&self, vm_id: &str, target_host_id: &str) -> Result<Vm> {
        let mut hosts = self.lock().await;

        if !hosts.contains_key(target_host_id) {
            return Err(Error::HostNotFound(target_host_id.to_string()));
        }

        let source_host_id = hosts
            .values()
            .find(|host| host.vm(vm_id).is_some())
            .map(|host| host.id.clone())
            .ok_or_else(|| Error::VmNotLocated(vm_id.to_string()))?;

        let vm = host_entry(&mut hosts, &source_host_id)?
            .take_vm(vm_id)
            .ok_or_else(|| Error::VmNotLocated(vm_id.to_string()))?;
        host_entry(&mut hosts, target_host_id)?.vms.push(vm.clone());

        info!(
            vm_id,
            source = %source_host_id,
            target = target_host_id,
            "VM migrated"
        );
        Ok(vm)
    }
}
