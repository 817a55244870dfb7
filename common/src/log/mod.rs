pub mod tracing_factory;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Installs a bare-bones tracing subscriber for test binaries that don't
/// need the full `TracingFactory` (file rotation, pretty formatting).
pub fn init_test_log() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .finish();

    // Ignore the error if a global subscriber has already been set.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
