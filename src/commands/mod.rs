pub mod scan;
pub mod serve;

use anyhow::Result;
use pulsecast::config::Config;
use std::path::Path;

// Re-export command functions for convenience
pub use scan::scan;
pub use serve::{serve, ServeParams};

/// Load configuration: TOML file when given, then environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env()?;
            Ok(config)
        }
        None => Config::from_env(),
    }
}
