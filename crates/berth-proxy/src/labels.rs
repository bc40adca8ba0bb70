//! Routing directives — typed construction of proxy labels.
//!
//! The emitter is a pure function of the service record and proxy
//! settings. Directives are built as typed pairs and serialized to label
//! strings only at the boundary, so a hostname containing rule-breaking
//! characters cannot smuggle extra directives in (names and hostnames
//! are validated upstream as well). Regenerating with unchanged inputs
//! yields byte-identical output.

use serde::{Deserialize, Serialize};

use berth_core::config::ProxyConfig;
use berth_core::types::ServiceRecord;

/// The derived routing configuration for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDirectives {
    labels: Vec<(String, String)>,
}

impl RoutingDirectives {
    /// Derive directives from a record. The router and load-balancer
    /// names reuse the already-unique service name, so two services can
    /// never collide on router identity.
    pub fn emit(record: &ServiceRecord, proxy: &ProxyConfig) -> Self {
        let name = &record.name;
        let mut labels = vec![
            ("traefik.enable".to_string(), "true".to_string()),
            (
                format!("traefik.http.routers.{name}.rule"),
                format!("Host(`{}`)", record.hostname),
            ),
            (
                format!("traefik.http.routers.{name}.entrypoints"),
                "websecure".to_string(),
            ),
            (
                format!("traefik.http.routers.{name}.tls.certresolver"),
                proxy.cert_resolver.clone(),
            ),
            (
                format!("traefik.http.services.{name}.loadbalancer.server.port"),
                record.port.to_string(),
            ),
        ];
        if let Some(path) = &record.health_path {
            labels.push((
                format!("traefik.http.services.{name}.loadbalancer.healthcheck.path"),
                path.clone(),
            ));
            labels.push((
                format!("traefik.http.services.{name}.loadbalancer.healthcheck.interval"),
                "30s".to_string(),
            ));
        }
        Self { labels }
    }

    /// Serialize to `key=value` label strings for the compose file.
    pub fn to_label_strings(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }

    /// The backend port these directives route to.
    pub fn backend_port(&self) -> Option<u16> {
        self.labels
            .iter()
            .find(|(k, _)| k.ends_with(".loadbalancer.server.port"))
            .and_then(|(_, v)| v.parse().ok())
    }
}
