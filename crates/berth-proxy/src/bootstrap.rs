//! One-time proxy infrastructure bring-up files.
//!
//! Emits the proxy's own compose definition and static configuration
//! under `<root>/proxy/`. Regeneration is wholesale and idempotent;
//! starting the emitted stack is the caller's job via the runtime
//! adapter.

use std::collections::BTreeMap;
use std::fs;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use berth_core::config::ProxyConfig;
use berth_core::paths::ConfigRoot;

/// Container name assigned to the proxy; status lookups use it too.
pub const PROXY_CONTAINER: &str = "berth-proxy";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render proxy config: {0}")]
    Render(String),
}

/// Write the proxy compose file and static config. Safe to re-run;
/// unchanged settings produce byte-identical files.
pub fn emit_proxy_files(root: &ConfigRoot, proxy: &ProxyConfig) -> Result<(), ProxyError> {
    fs::create_dir_all(root.proxy_dir())?;

    let static_config = render_static_config(proxy)?;
    fs::write(root.proxy_static_path(), static_config)?;

    let compose = render_proxy_compose(proxy)?;
    fs::write(root.proxy_compose_path(), compose)?;

    info!(dir = %root.proxy_dir().display(), "proxy infrastructure files written");
    Ok(())
}

// ── Static config model ────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StaticConfig {
    entry_points: BTreeMap<&'static str, EntryPoint>,
    providers: Providers,
    certificates_resolvers: BTreeMap<String, CertResolver>,
}

#[derive(Serialize)]
struct EntryPoint {
    address: String,
}

#[derive(Serialize)]
struct Providers {
    docker: DockerProvider,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DockerProvider {
    exposed_by_default: bool,
    network: String,
}

#[derive(Serialize)]
struct CertResolver {
    acme: AcmeConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcmeConfig {
    email: String,
    storage: String,
    http_challenge: HttpChallenge,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HttpChallenge {
    entry_point: String,
}

fn render_static_config(proxy: &ProxyConfig) -> Result<String, ProxyError> {
    let mut entry_points = BTreeMap::new();
    entry_points.insert("web", EntryPoint { address: ":80".to_string() });
    entry_points.insert("websecure", EntryPoint { address: ":443".to_string() });

    let mut resolvers = BTreeMap::new();
    resolvers.insert(
        proxy.cert_resolver.clone(),
        CertResolver {
            acme: AcmeConfig {
                email: proxy.acme_email.clone().unwrap_or_default(),
                storage: "/letsencrypt/acme.json".to_string(),
                http_challenge: HttpChallenge {
                    entry_point: "web".to_string(),
                },
            },
        },
    );

    let config = StaticConfig {
        entry_points,
        providers: Providers {
            docker: DockerProvider {
                exposed_by_default: false,
                network: proxy.network.clone(),
            },
        },
        certificates_resolvers: resolvers,
    };
    serde_yaml::to_string(&config).map_err(|e| ProxyError::Render(e.to_string()))
}

// ── Proxy compose model ────────────────────────────────────────────

#[derive(Serialize)]
struct ProxyCompose {
    services: BTreeMap<&'static str, ProxyService>,
    networks: BTreeMap<String, NetworkRef>,
}

#[derive(Serialize)]
struct ProxyService {
    image: String,
    container_name: String,
    restart: String,
    ports: Vec<String>,
    volumes: Vec<String>,
    networks: Vec<String>,
}

#[derive(Serialize)]
struct NetworkRef {
    external: bool,
}

fn render_proxy_compose(proxy: &ProxyConfig) -> Result<String, ProxyError> {
    let mut services = BTreeMap::new();
    services.insert(
        "traefik",
        ProxyService {
            image: "traefik:v3.1".to_string(),
            container_name: PROXY_CONTAINER.to_string(),
            restart: "unless-stopped".to_string(),
            ports: vec!["80:80".to_string(), "443:443".to_string()],
            volumes: vec![
                "/var/run/docker.sock:/var/run/docker.sock:ro".to_string(),
                "./traefik.yaml:/etc/traefik/traefik.yml:ro".to_string(),
                "./letsencrypt:/letsencrypt".to_string(),
            ],
            networks: vec![proxy.network.clone()],
        },
    );
    let mut networks = BTreeMap::new();
    networks.insert(proxy.network.clone(), NetworkRef { external: true });

    serde_yaml::to_string(&ProxyCompose { services, networks })
        .map_err(|e| ProxyError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy_config() -> ProxyConfig {
        ProxyConfig {
            network: "berth-proxy".to_string(),
            cert_resolver: "letsencrypt".to_string(),
            acme_email: Some("ops@example.com".to_string()),
        }
    }

    #[test]
    fn emits_both_files_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let root = ConfigRoot::new(dir.path());

        emit_proxy_files(&root, &proxy_config()).unwrap();
        let static_1 = fs::read_to_string(root.proxy_static_path()).unwrap();
        let compose_1 = fs::read_to_string(root.proxy_compose_path()).unwrap();

        emit_proxy_files(&root, &proxy_config()).unwrap();
        assert_eq!(fs::read_to_string(root.proxy_static_path()).unwrap(), static_1);
        assert_eq!(fs::read_to_string(root.proxy_compose_path()).unwrap(), compose_1);
    }

    #[test]
    fn static_config_wires_resolver_and_network() {
        let yaml = render_static_config(&proxy_config()).unwrap();
        assert!(yaml.contains("letsencrypt:"));
        assert!(yaml.contains("email: ops@example.com"));
        assert!(yaml.contains("network: berth-proxy"));
        assert!(yaml.contains("exposedByDefault: false"));
    }

    #[test]
    fn proxy_compose_joins_external_network() {
        let yaml = render_proxy_compose(&proxy_config()).unwrap();
        assert!(yaml.contains("traefik:v3.1"));
        assert!(yaml.contains(&format!("container_name: {PROXY_CONTAINER}")));
        assert!(yaml.contains("external: true"));
        assert!(yaml.contains("- 80:80") || yaml.contains("- '80:80'") || yaml.contains("- \"80:80\""));
    }
}
