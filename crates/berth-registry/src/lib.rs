pub mod error;
pub mod lock;
pub mod store;

pub use error::{RegistryError, RegistryResult};
pub use lock::OperationLock;
pub use store::Registry;
