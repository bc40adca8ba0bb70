//! Per-service compose definition rendering.
//!
//! The compose file is built as typed structs and serialized to YAML at
//! the boundary. The service joins the shared proxy network, loads its
//! merged env file, and carries the routing labels plus berth ownership
//! labels used for orphan detection.

use std::collections::BTreeMap;

use serde::Serialize;

use berth_core::config::ProxyConfig;
use berth_core::types::ServiceRecord;
use berth_proxy::RoutingDirectives;

use crate::error::RuntimeError;

/// Label marking containers managed by berth; the value is the service name.
pub const MANAGED_LABEL: &str = "berth.service";

#[derive(Serialize)]
struct ComposeFile {
    services: BTreeMap<String, ComposeService>,
    networks: BTreeMap<String, NetworkRef>,
}

#[derive(Serialize)]
struct ComposeService {
    image: String,
    container_name: String,
    restart: String,
    env_file: Vec<String>,
    labels: Vec<String>,
    networks: Vec<String>,
}

#[derive(Serialize)]
struct NetworkRef {
    external: bool,
}

/// Render the compose definition for one service. Deterministic for
/// unchanged inputs.
pub fn render_service_compose(
    record: &ServiceRecord,
    proxy: &ProxyConfig,
) -> Result<String, RuntimeError> {
    let directives = RoutingDirectives::emit(record, proxy);
    let mut labels = directives.to_label_strings();
    labels.push(format!("{MANAGED_LABEL}={}", record.name));

    let mut services = BTreeMap::new();
    services.insert(
        record.name.clone(),
        ComposeService {
            image: record.image.clone(),
            container_name: record.name.clone(),
            restart: "unless-stopped".to_string(),
            env_file: vec![".env".to_string()],
            labels,
            networks: vec![proxy.network.clone()],
        },
    );
    let mut networks = BTreeMap::new();
    networks.insert(proxy.network.clone(), NetworkRef { external: true });

    serde_yaml::to_string(&ComposeFile { services, networks })
        .map_err(|e| RuntimeError::Render(e.to_string()))
}
