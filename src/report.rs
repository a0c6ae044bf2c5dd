//! Run-scoped logging handle.
//!
//! A [`Reporter`] is created once per run and passed by reference into every
//! stage. All events are emitted under its run span, warnings are counted,
//! and a reporter built with [`Reporter::stderr`] installs its subscriber
//! only for its own lifetime (no process-global logger).

use std::cell::Cell;
use std::fmt;

use tracing::subscriber::DefaultGuard;
use tracing::{error, info, info_span, warn, Span};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "combine_to_osv=info";

pub struct Reporter {
    span: Span,
    warnings: Cell<usize>,
    // Dropped last so the closing summary still reaches the subscriber.
    _guard: Option<DefaultGuard>,
}

impl Reporter {
    /// Reports through whatever subscriber is already active.
    pub fn new(run: &str) -> Self {
        Self {
            span: info_span!("run", name = run),
            warnings: Cell::new(0),
            _guard: None,
        }
    }

    /// Installs a formatted stderr subscriber for the lifetime of the
    /// returned reporter, filtered by `RUST_LOG` (or [`DEFAULT_FILTER`]).
    pub fn stderr(run: &str) -> Self {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);

        let mut reporter = Self::new(run);
        reporter._guard = Some(guard);
        reporter
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        info!(parent: &self.span, "{}", message);
    }

    /// Records a recoverable problem; the run continues.
    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.warnings.set(self.warnings.get() + 1);
        warn!(parent: &self.span, "{}", message);
    }

    /// Records the problem that is about to abort the run.
    pub fn error(&self, message: fmt::Arguments<'_>) {
        error!(parent: &self.span, "{}", message);
    }

    pub fn warnings(&self) -> usize {
        self.warnings.get()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        info!(
            parent: &self.span,
            warnings = self.warnings.get(),
            "Run finished"
        );
    }
}
