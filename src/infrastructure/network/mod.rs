// Network module - Endpoints and the connection supervisor
pub mod endpoint;
pub mod supervisor;

pub use endpoint::{Endpoint, IpFamily, NetworkListener};
pub use supervisor::{ConnectionSupervisor, Role, DEFAULT_RETRY_DELAY};
