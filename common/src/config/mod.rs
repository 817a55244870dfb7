mod config;

pub use config::RouterConfig;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::err::decode_error::ReError;

/// Load a `RouterConfig` from a TOML file on disk.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<RouterConfig, ReError> {
    let mut file = File::open(path.as_ref())?;
    let mut s = String::new();
    file.read_to_string(&mut s)?;

    toml::from_str(s.as_str()).map_err(|e| ReError::Config(e.to_string()))
}
