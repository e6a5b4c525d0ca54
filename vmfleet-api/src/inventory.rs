//! Host inventory file
//!
//! Seeds the registry at startup from a JSON document listing each host and
//! the credentials of its hypervisor:
//!
//! ```json
//! { "hosts": [ { "Hostname": "node1", "IP": "10.0.0.11", "Port": "8443",
//!                "Username": "admin", "Password": "secret" } ] }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};
use vmfleet_common::{Error, Host, HostConnection};

use crate::registry::Registry;
use crate::remote::VmInventory;

/// Inventory errors
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Failed to read inventory file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse inventory: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    hosts: Vec<InventoryHost>,
}

/// One host entry of the inventory file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InventoryHost {
    #[serde(rename = "Hostname", alias = "hostname")]
    pub hostname: String,
    #[serde(rename = "IP", alias = "ip")]
    pub ip: String,
    #[serde(rename = "Port", alias = "port", deserialize_with = "port_from_str_or_int")]
    pub port: u16,
    #[serde(rename = "Username", alias = "username", default)]
    pub username: String,
    #[serde(rename = "Password", alias = "password", default)]
    pub password: String,
}

impl From<InventoryHost> for Host {
    fn from(entry: InventoryHost) -> Self {
        let mut host = Host::new(entry.hostname.clone(), entry.hostname);
        host.connection = Some(HostConnection {
            address: entry.ip,
            port: entry.port,
            username: entry.username,
            password: entry.password,
        });
        host
    }
}

fn port_from_str_or_int<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Parse inventory JSON into host records
pub fn parse_inventory(content: &str) -> Result<Vec<Host>, InventoryError> {
    let file: InventoryFile = serde_json::from_str(content)?;
    Ok(file.hosts.into_iter().map(Host::from).collect())
}

/// Load hosts from an inventory file. A missing file yields no hosts.
pub fn load_inventory(path: &Path) -> Result<Vec<Host>, InventoryError> {
    if !path.exists() {
        warn!("Inventory file {:?} not found, starting with an empty registry", path);
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let hosts = parse_inventory(&content)?;
    info!("Loaded {} host(s) from {:?}", hosts.len(), path);
    Ok(hosts)
}

/// Fill each host's VM list from its hypervisor before it enters the registry
pub async fn populate_vms(hosts: &mut [Host], source: &dyn VmInventory) {
    for host in hosts.iter_mut() {
        if let Some(connection) = &host.connection {
            host.vms = source.fetch_vms(connection).await;
            info!(host_id = %host.id, vms = host.vms.len(), "Host VMs loaded from hypervisor");
        }
    }
}

/// Replace a registered host's VM list with what its hypervisor reports.
///
/// The registry lock is not held while the hypervisor is queried; a host
/// deleted in the meantime yields `HostNotFound`. When the hypervisor cannot
/// be queried the stored list is left untouched and returned as is.
pub async fn refresh_host(
    registry: &Registry,
    source: &dyn VmInventory,
    host_id: &str,
) -> vmfleet_common::Result<Host> {
    let connection = registry
        .get_host(host_id)
        .await?
        .connection
        .ok_or_else(|| Error::MissingConnection(host_id.to_string()))?;

    match source.try_fetch_vms(&connection).await {
        Ok(vms) => registry.replace_vms(host_id, vms).await,
        Err(e) => {
            warn!(host_id = %host_id, address = %connection.address, "Keeping stored VMs, refresh failed: {}", e);
            registry.get_host(host_id).await
        }
    }
}

/// Refresh every host that carries connection details and return the
/// resulting host list.
pub async fn refresh_all(registry: &Registry, source: &dyn VmInventory) -> Vec<Host> {
    let connected: Vec<String> = registry
        .list_hosts()
        .await
        .into_iter()
        .filter(|host| host.connection.is_some())
        .map(|host| host.id)
        .collect();

    for host_id in &connected {
        if let Err(e) = refresh_host(registry, source, host_id).await {
            // Deleted or stripped of its connection while refreshing
            debug!(host_id = %host_id, "Skipping host during refresh: {}", e);
        }
    }

    info!(hosts = connected.len(), "Refreshed connected hosts");
    registry.list_hosts().await
}

/// Build the startup registry from the inventory
pub async fn seed_registry(
    path: &Path,
    refresh: bool,
    source: &dyn VmInventory,
) -> Result<Registry, InventoryError> {
    let mut hosts = load_inventory(path)?;
    if refresh {
        populate_vms(&mut hosts, source).await;
    }
    Ok(Registry::with_hosts(hosts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{HypervisorClient, RemoteError};
    use async_trait::async_trait;
    use std::io::Write;
    use std::time::Duration;
    use vmfleet_common::Vm;

    struct FixedInventory;

    #[async_trait]
    impl VmInventory for FixedInventory {
        async fn try_fetch_vms(&self, connection: &HostConnection) -> Result<Vec<Vm>, RemoteError> {
            Ok(vec![Vm::new(
                format!("{}-vm", connection.address),
                "guest",
                "running",
            )])
        }
    }

    struct UnreachableInventory;

    #[async_trait]
    impl VmInventory for UnreachableInventory {
        async fn try_fetch_vms(&self, _connection: &HostConnection) -> Result<Vec<Vm>, RemoteError> {
            Err(RemoteError::MissingToken)
        }
    }

    const INVENTORY_JSON: &str = r#"{
        "hosts": [
            {"Hostname": "node1", "IP": "10.0.0.11", "Port": "8443", "Username": "admin", "Password": "pw"},
            {"hostname": "node2", "ip": "10.0.0.12", "port": 9000}
        ]
    }"#;

    #[test]
    fn test_parse_inventory_shapes() {
        let hosts = parse_inventory(INVENTORY_JSON).unwrap();
        assert_eq!(hosts.len(), 2);

        assert_eq!(hosts[0].id, "node1");
        assert_eq!(hosts[0].name, "node1");
        let conn = hosts[0].connection.as_ref().unwrap();
        assert_eq!(conn.address, "10.0.0.11");
        assert_eq!(conn.port, 8443);
        assert_eq!(conn.password, "pw");

        let conn = hosts[1].connection.as_ref().unwrap();
        assert_eq!(conn.port, 9000);
        assert!(conn.username.is_empty());
    }

    #[test]
    fn test_parse_inventory_rejects_bad_port() {
        let content = r#"{"hosts":[{"Hostname":"n","IP":"1.2.3.4","Port":"http"}]}"#;
        assert!(matches!(parse_inventory(content), Err(InventoryError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = load_inventory(&dir.path().join("absent.json")).unwrap();
        assert!(hosts.is_empty());
    }

    #[tokio::test]
    async fn test_seed_registry_with_refresh() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INVENTORY_JSON.as_bytes()).unwrap();

        let registry = seed_registry(file.path(), true, &FixedInventory).await.unwrap();
        let vm = registry.get_vm("node1", "10.0.0.11-vm").await.unwrap();
        assert_eq!(vm.status, "running");

        let registry = seed_registry(file.path(), false, &FixedInventory).await.unwrap();
        assert!(registry.list_vms("node2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_host() {
        let registry = Registry::with_hosts(parse_inventory(INVENTORY_JSON).unwrap());
        registry.create_host(Host::new("bare", "no connection")).await;

        let host = refresh_host(&registry, &FixedInventory, "node2").await.unwrap();
        assert_eq!(host.vms, vec![Vm::new("10.0.0.12-vm", "guest", "running")]);

        let err = refresh_host(&registry, &FixedInventory, "bare").await.unwrap_err();
        assert!(matches!(err, Error::MissingConnection(_)));

        let err = refresh_host(&registry, &FixedInventory, "ghost").await.unwrap_err();
        assert!(matches!(err, Error::HostNotFound(_)));
    }

    #[tokio::test]
    async fn test_refresh_keeps_vms_when_hypervisor_unreachable() {
        let mut host = Host::new("node1", "node1");
        host.vms = vec![
            Vm::new("web", "web", "running"),
            Vm::new("db", "db", "stopped"),
        ];
        host.connection = Some(HostConnection {
            address: "127.0.0.1".to_string(),
            // Nothing listens on port 1
            port: 1,
            username: "admin".to_string(),
            password: "admin".to_string(),
        });
        let registry = Registry::with_hosts(vec![host.clone()]);
        let client = HypervisorClient::new(Duration::from_millis(500)).unwrap();

        let refreshed = refresh_host(&registry, &client, "node1").await.unwrap();
        assert_eq!(refreshed.vms, host.vms);
        assert_eq!(registry.list_vms("node1").await.unwrap(), host.vms);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_not_an_empty_answer() {
        let registry = Registry::with_hosts(parse_inventory(INVENTORY_JSON).unwrap());
        registry
            .create_vm("node1", Vm::new("kept", "kept", "running"))
            .await
            .unwrap();

        let host = refresh_host(&registry, &UnreachableInventory, "node1").await.unwrap();
        assert_eq!(host.vms, vec![Vm::new("kept", "kept", "running")]);
    }

    #[tokio::test]
    async fn test_refresh_all_skips_hosts_without_connection() {
        let registry = Registry::with_hosts(parse_inventory(INVENTORY_JSON).unwrap());
        let mut bare = Host::new("bare", "no connection");
        bare.vms = vec![Vm::new("local", "local", "created")];
        registry.create_host(bare).await;

        let hosts = refresh_all(&registry, &FixedInventory).await;
        let ids: Vec<&str> = hosts.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["bare", "node1", "node2"]);

        assert_eq!(hosts[0].vms, vec![Vm::new("local", "local", "created")]);
        assert_eq!(hosts[1].vms, vec![Vm::new("10.0.0.11-vm", "guest", "running")]);
        assert_eq!(hosts[2].vms, vec![Vm::new("10.0.0.12-vm", "guest", "running")]);
    }
}
