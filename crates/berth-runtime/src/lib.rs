pub mod compose;
pub mod docker;
pub mod error;

pub use compose::render_service_compose;
pub use docker::{ContainerRuntime, ContainerStatus, DockerCli};
pub use error::{RuntimeError, RuntimeResult};
