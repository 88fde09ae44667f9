//! Admit at most a fixed number of requests per time window.

pub mod counter;
pub mod http;
pub mod internal_event;
pub mod layer;
mod limiter;
pub mod reqwest_integration;
pub mod service;

use std::time::Duration;

use bon::Builder;
use snafu::Snafu;

pub use counter::WindowCounter;
pub use layer::WindowLimitLayer;
pub use limiter::Limiter;
pub use service::WindowLimit;

/// Configuration of the fixed window.
///
/// Both values are immutable once a [`Limiter`] is built from them.
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | `window` | 1s | Length of one window; the counter resets on this cadence and a waiting caller re-checks at least this often |
/// | `max_requests` | 2 | Admissions allowed per window<br>Set to the external service's published quota |
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use submission_gate::window_limit::WindowLimitSettings;
///
/// let settings = WindowLimitSettings::builder()
///     .window(Duration::from_secs(60))
///     .max_requests(100)
///     .build();
/// assert_eq!(settings.get_max_requests(), 100);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Builder)]
pub struct WindowLimitSettings {
    /// Length of one window.
    ///
    /// **Default**: 1 second
    #[builder(default = default_window())]
    pub(super) window: Duration,

    /// Upper bound on admissions within one window.
    ///
    /// **Default**: 2
    #[builder(default = default_max_requests())]
    pub(super) max_requests: usize,
}

const fn default_window() -> Duration {
    Duration::from_secs(1)
}

const fn default_max_requests() -> usize {
    2
}

impl Default for WindowLimitSettings {
    fn default() -> Self {
        Self {
            window: default_window(),
            max_requests: default_max_requests(),
        }
    }
}

impl WindowLimitSettings {
    pub fn get_window(&self) -> Duration {
        self.window
    }

    pub fn get_max_requests(&self) -> usize {
        self.max_requests
    }

    /// A zero window cannot drive a timer and a zero limit would never admit anyone.
    pub fn validate(&self) -> Result<(), LimitError> {
        if self.window.is_zero() {
            return InvalidSettingsSnafu {
                details: "window must be longer than zero",
            }
            .fail();
        }
        if self.max_requests == 0 {
            return InvalidSettingsSnafu {
                details: "max_requests must be at least 1",
            }
            .fail();
        }
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LimitError {
    #[snafu(display("Invalid window limit settings: {}", details))]
    InvalidSettings { details: &'static str },

    #[snafu(display("Window limiter must be started inside a tokio runtime"))]
    NoRuntime,

    /// The limiter was shut down while the caller was waiting, or before it asked.
    #[snafu(display("Wait for a window slot was interrupted by limiter shutdown"))]
    Interrupted,
}
