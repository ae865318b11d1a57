pub mod client;
pub mod common;
pub mod connection;
pub mod ensemble;
pub mod error;
pub mod naming;
pub mod server;
pub mod servers;

pub use ensemble::{EnsembleInstance, MicrocksEnsemble};
pub use error::{Error, Result};
pub use server::{new_handle, Config, ContainerConfig, Server};
pub use test::{Test, TestInstance};
