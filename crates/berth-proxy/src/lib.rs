pub mod bootstrap;
pub mod labels;

pub use bootstrap::{emit_proxy_files, ProxyError, PROXY_CONTAINER};
pub use labels::RoutingDirectives;
