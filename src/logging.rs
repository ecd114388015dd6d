use std::env;
use std::sync::OnceLock;

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;

/// How the process-wide logger is set up.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` directives such as `"prim_sandbox::batch=debug"`.
    /// `RUST_LOG` is consulted when this is `None`.
    pub directives: Option<String>,
    /// Level used when there are no directives at all.
    pub fallback: LevelFilter,
    pub style: WriteStyle,
    /// Prefix records with their module path.
    pub show_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directives: None,
            fallback: LevelFilter::Info,
            style: WriteStyle::Auto,
            show_targets: true,
        }
    }
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Installs `env_logger` as the global logger on the first call.
///
/// Returns whether this crate owns the logger; `false` means another logger
/// was already in place (a test harness, say). Later calls return the
/// first call's answer and ignore their config.
pub fn init_logging(config: LoggingConfig) -> bool {
    *INSTALLED.get_or_init(|| {
        let mut builder = Builder::new();
        match config.directives.or_else(|| env::var("RUST_LOG").ok()) {
            Some(directives) => builder.parse_filters(&directives),
            None => builder.filter_level(config.fallback),
        };
        builder
            .write_style(config.style)
            .format_target(config.show_targets);

        let installed = builder.try_init().is_ok();
        if installed {
            log::debug!("logger installed");
        }
        installed
    })
}
