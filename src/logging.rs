use std::fmt;

/// Log target handed to each long-running task when it is built
///
/// Targets share the crate prefix so the `env_logger` filter in `main`
/// applies to every task, while still letting one be singled out,
/// E.g. `RUST_LOG=zbgp::health=trace`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogContext {
    target: &'static str,
}

impl LogContext {
    pub const ROUTES: LogContext = LogContext::new("zbgp::routes");
    pub const HEALTH: LogContext = LogContext::new("zbgp::health");
    pub const RECONCILE: LogContext = LogContext::new("zbgp::reconcile");
    pub const RIB: LogContext = LogContext::new("zbgp::rib");

    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.target)
    }
}
