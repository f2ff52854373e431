//! # Keystroke Output
//!
//! Layout buttons fire key combinations (`["ctrl", "shift", "s"]`) when
//! released. The engine hands the combination to a [`KeystrokeSink`].

use tracing::info;

use crate::error::Result;

/// Executes key combinations.
#[cfg_attr(test, mockall::automock)]
pub trait KeystrokeSink: Send {
    /// Presses `keys` in order, then releases them in reverse order.
    ///
    /// # Errors
    ///
    /// Implementations report platform failures as `Device`.
    fn execute(&mut self, keys: &[String]) -> Result<()>;
}

/// Sink that only logs the combination.
#[derive(Debug, Default)]
pub struct LoggingKeystrokeSink;

impl KeystrokeSink for LoggingKeystrokeSink {
    fn execute(&mut self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        info!("Keystroke: {}", keys.join("+"));
        Ok(())
    }
}
