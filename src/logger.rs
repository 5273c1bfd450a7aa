use tracing::{debug, error, info, warn};

/// A logging handle scoped to a dotted path of names, exposed to factories
/// through the built-in `"logger"` wrapper.
///
/// Events are emitted through the [`tracing`] facade with the scope attached
/// as a field, so any installed subscriber decides formatting and filtering.
#[derive(Clone, Debug)]
pub struct ScopedLogger {
    scope: String,
}

impl ScopedLogger {
    pub(crate) fn new(scope: impl Into<String>) -> Self {
        ScopedLogger {
            scope: scope.into(),
        }
    }

    /// Creates a child handle scoped one level deeper.
    #[must_use]
    pub fn child(&self, name: &str) -> ScopedLogger {
        ScopedLogger {
            scope: format!("{}.{name}", self.scope),
        }
    }

    /// The dotted scope path this handle is bound to.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Logs an error message.
    pub fn error(&self, message: &str) {
        error!(scope = %self.scope, "{message}");
    }

    /// Logs a warning message.
    pub fn warn(&self, message: &str) {
        warn!(scope = %self.scope, "{message}");
    }

    /// Logs an informational message.
    pub fn info(&self, message: &str) {
        info!(scope = %self.scope, "{message}");
    }

    /// Logs a debug message.
    pub fn debug(&self, message: &str) {
        debug!(scope = %self.scope, "{message}");
    }
}
