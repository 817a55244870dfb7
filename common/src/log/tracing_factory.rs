use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;

static INIT: Once = Once::new();

#[derive(Debug, Clone, Default)]
pub struct TracingFactory {
    options: TracingFactoryOptions,
}

#[derive(Debug, Clone)]
pub struct TracingFactoryOptions {
    output_type: OutputType,
    level: Level,
    log_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub enum OutputType {
    Stdout,
    Log,
}

impl TracingFactory {
    pub fn init_log(debug: bool) -> Self {
        TracingFactory::init_log_with_options(TracingFactoryOptions::new_with_debug(debug))
    }

    pub fn init_log_with_options(opt: TracingFactoryOptions) -> Self {
        let mut opts = opt;
        let dir = opts
            .log_dir
            .get_or_insert_with(|| String::from("/tmp/binlog-router/logs"))
            .clone();

        INIT.call_once(|| {
            let format = tracing_subscriber::fmt::format()
                .pretty()
                .with_file(true)
                .with_line_number(false)
                .with_target(false)
                .with_thread_ids(true)
                .with_thread_names(true)
                .compact();

            match opts.output_type {
                OutputType::Stdout => {
                    let _ = tracing_subscriber::fmt()
                        .with_max_level(opts.level)
                        .event_format(format)
                        .pretty()
                        .try_init();
                }
                OutputType::Log => {
                    let file_appender = rolling::daily(format!("{}/router", dir.as_str()), "file.log");
                    let merge = file_appender.and(io::stdout);

                    let _ = tracing_subscriber::fmt()
                        .with_max_level(opts.level)
                        .event_format(format)
                        .pretty()
                        .with_writer(merge)
                        .try_init();
                }
            };
        });

        TracingFactory { options: opts }
    }

    pub fn get_log_dir(&self) -> &str {
        self.options.get_log_dir()
    }
}

impl Default for TracingFactoryOptions {
    fn default() -> Self {
        TracingFactoryOptions::new_with_debug(true)
    }
}

impl TracingFactoryOptions {
    pub fn new_with_debug(debug: bool) -> Self {
        TracingFactoryOptions::new_with_type(debug, OutputType::Stdout)
    }

    pub fn new_with_type(debug: bool, output_type: OutputType) -> Self {
        TracingFactoryOptions::new(debug, output_type, None)
    }

    pub fn new(debug: bool, output_type: OutputType, log_dir: Option<String>) -> Self {
        let level = if debug { Level::DEBUG } else { Level::INFO };
        TracingFactoryOptions {
            output_type,
            level,
            log_dir,
        }
    }

    pub fn get_log_dir(&self) -> &str {
        self.log_dir.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tracing::{debug, error, info, warn};

    #[test]
    fn init_log_is_idempotent() {
        let first = TracingFactory::init_log(true);
        let second = TracingFactory::init_log(true);
        assert_eq!(first.get_log_dir(), second.get_log_dir());

        debug!("tracing factory test");
        info!("tracing factory test");
        warn!("tracing factory test");
        error!("tracing factory test");
    }
}
