//! Command implementations.

mod port;

pub use port::{port_manifest, resolve_options, run_port, PortReport};
