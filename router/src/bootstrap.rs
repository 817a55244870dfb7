//! Ties the ambient stack (config loading, logging) to the router core:
//! the wiring a real service entry point would do before handing a
//! `RouterInstance` its transport and storage collaborators.

use std::path::Path;
use std::sync::Arc;

use common::config::{read_config, RouterConfig};
use common::err::CResult;
use common::log::tracing_factory::{TracingFactory, TracingFactoryOptions};

use crate::router_instance::RouterInstance;
use crate::storage::StorageSink;
use crate::transport::Transport;

/// Loads a `RouterConfig` from `path` and installs the tracing subscriber
/// at the level the config would imply in a fuller service (debug-level
/// in development, as the default options do).
pub fn load_config<P: AsRef<Path>>(path: P) -> CResult<RouterConfig> {
    let cfg = read_config(path)?;
    TracingFactory::init_log_with_options(TracingFactoryOptions::new_with_debug(true));
    Ok(cfg)
}

/// Loads config and builds a ready-to-run `RouterInstance` in one step.
pub fn bootstrap<P: AsRef<Path>>(
    path: P,
    primary_link: Arc<dyn Transport>,
    storage: Box<dyn StorageSink>,
) -> CResult<Arc<RouterInstance>> {
    let cfg = load_config(path)?;
    Ok(RouterInstance::from_config(&cfg, primary_link, storage))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{FakeStorage, FakeTransport};
    use common::err::ReError;

    #[test]
    fn bootstrap_surfaces_io_error_for_missing_config() {
        let result = bootstrap(
            "/nonexistent/router.toml",
            Arc::new(FakeTransport::new()),
            Box::new(FakeStorage::new()),
        );
        assert!(matches!(result, Err(ReError::Io(_))));
    }
}
