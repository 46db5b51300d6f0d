//! Configuration models
//!
//! Two layers of configuration meet here. The gateway's [`ServiceConfig`] is a route table
//! whose endpoints and backends each carry an opaque [`ExtraConfig`] tree that other
//! components own. The expression gate only reads the entry stored under [`NAMESPACE`],
//! decoding it into a list of [`Definition`]s with [`load_definitions`].

mod definition;
mod service_config;

pub use definition::{Definition, ExtraConfig, NAMESPACE, load_definitions};
pub use service_config::{BackendConfig, EXAMPLE_CONFIG_TOML, EndpointConfig, ServiceConfig};
