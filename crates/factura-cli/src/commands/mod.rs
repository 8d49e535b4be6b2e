//! Subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod price;

use std::path::Path;

use factura_core::FacturaConfig;

/// Load the configuration from `path`, or the defaults when no path was given.
pub fn load_config(path: Option<&str>) -> anyhow::Result<FacturaConfig> {
    match path {
        Some(path) => Ok(FacturaConfig::from_file(Path::new(path))?),
        None => Ok(FacturaConfig::default()),
    }
}
