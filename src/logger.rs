//! Logging seam
//!
//! Rewrite operations report what they changed through a [`Logger`]. The
//! number of messages is part of the observable behavior: one per renamed
//! entry, one per substituted placeholder kind, one per stripped entry.

/// Receives informational messages from rewrite operations
pub trait Logger {
    fn info(&self, message: &str);
}

/// Forwards messages to `tracing` at INFO level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

pub(crate) fn log_info(logger: Option<&dyn Logger>, message: impl FnOnce() -> String) {
    if let Some(logger) = logger {
        logger.info(&message());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Logger;
    use std::cell::RefCell;

    /// Captures messages so tests can assert exact call counts
    #[derive(Debug, Default)]
    pub struct RecordingLogger {
        pub messages: RefCell<Vec<String>>,
    }

    impl RecordingLogger {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn count(&self) -> usize {
            self.messages.borrow().len()
        }
    }

    impl Logger for RecordingLogger {
        fn info(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }
}
