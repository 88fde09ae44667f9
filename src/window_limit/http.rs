use crate::Error as CrateError;
use snafu::Snafu;

/// Failures of the HTTP transport itself.
///
/// Response statuses are never mapped to errors here: any response the server
/// produced, successful or not, is handed back to the caller as-is.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum HttpError {
    /// The request never reached the server (connection refused, DNS, TLS).
    #[snafu(display("HTTP transport error: {}", source))]
    Transport { source: CrateError },

    /// The request itself was malformed before sending.
    #[snafu(display("Invalid HTTP request: {}", details))]
    InvalidRequest { details: String },

    #[snafu(display("HTTP request timed out"))]
    Timeout,

    /// Other client failures, including an unreadable response body.
    #[snafu(display("Generic HTTP client error: {}", source))]
    ClientError { source: CrateError },
}
