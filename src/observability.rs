//! Tracing setup and opt-in request timing

use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

/// Filter used until the configured one is known.
pub const BOOTSTRAP_FILTER: &str = "info";

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// The filter stays swappable so it can be set from config once that is
/// loaded; events logged while loading still go out under `default_filter`.
pub fn init_tracing(default_filter: &str) -> TracingHandle {
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_override = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(default_filter));

    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    TracingHandle {
        handle,
        env_override,
    }
}

/// Handle to the installed filter.
pub struct TracingHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl TracingHandle {
    /// Replaces the active filter, unless `RUST_LOG` set it.
    pub fn set_filter(&self, directives: &str) -> Result<(), reload::Error> {
        if self.env_override {
            return Ok(());
        }
        self.handle.reload(EnvFilter::new(directives))
    }

    pub fn current_filter(&self) -> Result<String, reload::Error> {
        self.handle.with_current(|filter| filter.to_string())
    }
}

/// Coarse per-request stopwatch. Only constructed for requests that opted
/// in with `x-debug: 1`.
#[derive(Debug)]
pub struct RequestTimer {
    started: Instant,
    fetched: Option<Instant>,
    decrypted: Option<Instant>,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            fetched: None,
            decrypted: None,
        }
    }

    pub fn mark_fetched(&mut self) {
        self.fetched = Some(Instant::now());
    }

    pub fn mark_decrypted(&mut self) {
        self.decrypted = Some(Instant::now());
    }

    pub fn fetch_duration(&self) -> Option<Duration> {
        self.fetched.map(|t| t.duration_since(self.started))
    }

    pub fn decrypt_duration(&self) -> Option<Duration> {
        match (self.fetched, self.decrypted) {
            (Some(fetched), Some(decrypted)) => Some(decrypted.duration_since(fetched)),
            _ => None,
        }
    }

    pub fn report(&self, size_bytes: usize) {
        info!(
            fetch_ms = self.fetch_duration().map(millis),
            decrypt_ms = self.decrypt_duration().map(millis),
            total_ms = millis(self.started.elapsed()),
            size_bytes,
            "request timing"
        );
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations_follow_marks() {
        let mut timer = RequestTimer::start();
        assert!(timer.fetch_duration().is_none());
        assert!(timer.decrypt_duration().is_none());

        timer.mark_fetched();
        assert!(timer.fetch_duration().is_some());
        assert!(timer.decrypt_duration().is_none());

        timer.mark_decrypted();
        let decrypt = timer.decrypt_duration().unwrap();
        assert!(decrypt <= timer.started.elapsed());
    }

    #[test]
    fn test_set_filter_swaps_directives() {
        let (_layer, handle) = reload::Layer::<_, Registry>::new(EnvFilter::new("info"));
        let logs = TracingHandle {
            handle,
            env_override: false,
        };

        logs.set_filter("debug").unwrap();
        assert_eq!(logs.current_filter().unwrap(), "debug");
    }

    #[test]
    fn test_rust_log_wins_over_config() {
        let (_layer, handle) = reload::Layer::<_, Registry>::new(EnvFilter::new("warn"));
        let logs = TracingHandle {
            handle,
            env_override: true,
        };

        logs.set_filter("trace").unwrap();
        assert_eq!(logs.current_filter().unwrap(), "warn");
    }

    #[test]
    fn test_millis() {
        assert!((millis(Duration::from_micros(1500)) - 1.5).abs() < 1e-9);
    }
}
