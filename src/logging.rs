//! Diagnostic logging.
//!
//! Compact timestamped `tracing` output on stderr, quiet (`warn`) by default.
//! `-v` raises the crate's level to `debug`; `COMMITWATCH_LOG` takes
//! precedence over both and accepts the usual filter syntax:
//!
//! ```bash
//! COMMITWATCH_LOG=info commitwatch run
//! COMMITWATCH_LOG=commitwatch::git=debug commitwatch watch
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const LOG_ENV: &str = "COMMITWATCH_LOG";

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// The filter directive used when `COMMITWATCH_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,commitwatch=debug"
    } else {
        "warn"
    }
}

/// Initialize logging. Only the first call takes effect.
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let filter = match std::env::var(LOG_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
            _ => EnvFilter::new(default_directive(verbose)),
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}
