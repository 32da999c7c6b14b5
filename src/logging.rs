// ==========================================
// Logging initialisation
// ==========================================
// tracing + tracing-subscriber, filtered through RUST_LOG.
// ==========================================

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Human-readable logs
///
/// # Environment
/// - RUST_LOG: filter directives (default: info)
///   e.g. RUST_LOG=debug or RUST_LOG=arrival_sequencer::engine=trace
///
/// # Example
/// ```no_run
/// use arrival_sequencer::logging;
/// logging::init();
/// ```
pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// One JSON object per line on stdout, for log shippers.
///
/// # Errors
/// - a global subscriber is already installed
pub fn init_json() -> Result<(), SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(json_subscriber(std::io::stdout))
}

fn json_subscriber<W>(writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fmt()
        .json()
        .with_env_filter(env_filter())
        .with_current_span(true)
        .with_writer(writer)
        .finish()
}

/// Test logging at debug level; safe to call from every test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_logs_one_object_per_line() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = json_subscriber(move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("pass", airport = "YSSY");
            let _entered = span.enter();
            tracing::warn!(callsign = "QFA1", "no runway resolvable");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["level"], "WARN");
        assert_eq!(record["fields"]["message"], "no runway resolvable");
        assert_eq!(record["fields"]["callsign"], "QFA1");
        assert_eq!(record["span"]["airport"], "YSSY");
    }
}
