//! Log setup for the CLI
//!
//! Human-readable lines go to stderr; a daily `filament_atlas.log.<date>`
//! file in the log directory gets the detailed form with source locations.

use std::path::Path;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,filament_atlas=debug";
const FILE_PREFIX: &str = "filament_atlas.log";

/// `RUST_LOG` when set and parseable, otherwise [`DEFAULT_FILTER`]
fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Background writer for the rolling file. Its guard is leaked: the process
/// logs until exit and nothing may drop buffered lines.
fn file_writer(log_dir: &Path) -> anyhow::Result<NonBlocking> {
    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    std::mem::forget(guard);
    Ok(writer)
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(log_dir: &str) -> anyhow::Result<()> {
    let writer = file_writer(Path::new(log_dir))?;

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()?;

    tracing::info!("Writing logs to {}", log_dir);
    Ok(())
}

/// Emit `error` (any `Display`) at error level, plus optional tracing fields
#[macro_export]
macro_rules! log_error {
    ($err:expr $(, $($field:tt)+)?) => {
        tracing::error!(error = %$err $(, $($field)+)?, "operation failed")
    };
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_log_error_fields() {
        let plain = capture(|| crate::log_error!("disk full"));
        assert!(plain.contains("ERROR"));
        assert!(plain.contains("operation failed"));
        assert!(plain.contains("error=disk full"));

        let strategy = "direct";
        let tagged = capture(|| crate::log_error!(crate::AccessError::Status(503), strategy = %strategy));
        assert!(tagged.contains("strategy=direct"), "{}", tagged);
        assert!(tagged.contains("503"), "{}", tagged);
    }

    #[test]
    fn test_file_writer_creates_dir() {
        let dir = std::env::temp_dir().join(format!("filament_atlas_logs_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        super::file_writer(&dir).unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
