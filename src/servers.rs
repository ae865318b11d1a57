/// Contains the [Servers][crate::Server] making up a Microcks ensemble.
pub mod generic;
pub mod microcks;
pub mod minion;
pub mod postman;

pub use generic::{GenericServer, GenericServerConfig, LogStream};
pub use microcks::{MicrocksServer, MicrocksServerConfig};
pub use minion::{AsyncMinionServer, AsyncMinionServerConfig};
pub use postman::{PostmanServer, PostmanServerConfig};
