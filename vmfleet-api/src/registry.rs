//! In-memory host and VM registry
//!
//! Every operation, reads included, runs under one exclusive lock held for
//! the whole call. Host records are mutated in place behind the guard, so
//! callers only ever see complete before/after states.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use vmfleet_common::{Error, Host, Result, Vm};

/// Host and VM totals
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub hosts: usize,
    pub vms: usize,
}

/// Registry of hosts keyed by host identifier
pub struct Registry {
    hosts: Mutex<BTreeMap<String, Host>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            hosts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Build a registry pre-populated with hosts (later duplicates win)
    pub fn with_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        let map = hosts
            .into_iter()
            .map(|host| (host.id.clone(), host))
            .collect();

        Self {
            hosts: Mutex::new(map),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Host>> {
        self.hosts.lock().await
    }

    /// Insert or overwrite a host. Last write wins, except that an overwrite
    /// without a password keeps the one stored for the same hypervisor account.
    pub async fn create_host(&self, mut host: Host) -> Host {
        let mut hosts = self.lock().await;

        if let Some(previous) = hosts.get(&host.id) {
            debug!(host_id = %host.id, "Overwriting existing host record");
            if let (Some(connection), Some(stored)) = (host.connection.as_mut(), previous.connection.as_ref()) {
                connection.inherit_password(stored);
            }
        }
        info!(host_id = %host.id, vms = host.vms.len(), "Host stored");

        hosts.insert(host.id.clone(), host.clone());
        host
    }

    pub async fn get_host(&self, host_id: &str) -> Result<Host> {
        let hosts = self.lock().await;
        hosts
            .get(host_id)
            .cloned()
            .ok_or_else(|| Error::HostNotFound(host_id.to_string()))
    }

    /// All hosts ordered by identifier
    pub async fn list_hosts(&self) -> Vec<Host> {
        let hosts = self.lock().await;
        hosts.values().cloned().collect()
    }

    /// Remove a host together with all of its VMs
    pub async fn delete_host(&self, host_id: &str) -> Result<Host> {
        let mut hosts = self.lock().await;
        let host = hosts
            .remove(host_id)
            .ok_or_else(|| Error::HostNotFound(host_id.to_string()))?;

        info!(host_id, vms = host.vms.len(), "Host deleted");
        Ok(host)
    }

    /// Append a VM to a host's list and return it unchanged
    pub async fn create_vm(&self, host_id: &str, vm: Vm) -> Result<Vm> {
        let mut hosts = self.lock().await;
        let host = host_entry(&mut hosts, host_id)?;

        info!(host_id, vm_id = %vm.id, "VM created");
        host.vms.push(vm.clone());
        Ok(vm)
    }

    pub async fn get_vm(&self, host_id: &str, vm_id: &str) -> Result<Vm> {
        let mut hosts = self.lock().await;
        find_vm(&mut hosts, host_id, vm_id).map(|vm| vm.clone())
    }

    pub async fn list_vms(&self, host_id: &str) -> Result<Vec<Vm>> {
        let hosts = self.lock().await;
        hosts
            .get(host_id)
            .map(|host| host.vms.clone())
            .ok_or_else(|| Error::HostNotFound(host_id.to_string()))
    }

    /// Remove the first VM with a matching identifier
    pub async fn delete_vm(&self, host_id: &str, vm_id: &str) -> Result<Vm> {
        let mut hosts = self.lock().await;
        let host = host_entry(&mut hosts, host_id)?;
        let vm = host
            .take_vm(vm_id)
            .ok_or_else(|| Error::vm_not_found(host_id, vm_id))?;

        info!(host_id, vm_id, "VM deleted");
        Ok(vm)
    }

    /// Overwrite a host's VM list, e.g. with what its hypervisor reports
    pub async fn replace_vms(&self, host_id: &str, vms: Vec<Vm>) -> Result<Host> {
        let mut hosts = self.lock().await;
        let host = host_entry(&mut hosts, host_id)?;

        info!(host_id, previous = host.vms.len(), current = vms.len(), "Host VM list replaced");
        host.vms = vms;
        Ok(host.clone())
    }

    pub async fn stats(&self) -> RegistryStats {
        let hosts = self.lock().await;
        RegistryStats {
            hosts: hosts.len(),
            vms: hosts.values().map(|host| host.vms.len()).sum(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable access to a host entry held under the registry lock
pub(crate) fn host_entry<'a>(
    hosts: &'a mut BTreeMap<String, Host>,
    host_id: &str,
) -> Result<&'a mut Host> {
    hosts
        .get_mut(host_id)
        .ok_or_else(|| Error::HostNotFound(host_id.to_string()))
}

/// Locate a VM by (host, vm) under the registry lock
pub(crate) fn find_vm<'a>(
    hosts: &'a mut BTreeMap<String, Host>,
    host_id: &str,
    vm_id: &str,
) -> Result<&'a mut Vm> {
    host_entry(hosts, host_id)?
        .vm_mut(vm_id)
        .ok_or_else(|| Error::vm_not_found(host_id, vm_id))
}
