use thiserror::Error;

use crate::session::SessionState;

/// Convenient result alias for the planning library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
///
/// Every variant is recoverable: a failed computation returns the session to
/// a state from which the operator can correct inputs and try again.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a computation attempt is started with zero resolved
    /// destinations.
    #[error("no destinations could be resolved to coordinates")]
    NoResolvedDestinations,

    /// Non-2xx response from a provider endpoint. The raw body is preserved
    /// verbatim for diagnostics.
    #[error("provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    /// Wrapper for HTTP transport errors.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Raised when a time window is set with start not strictly before end.
    #[error("time window start {start_secs}s must be before end {end_secs}s")]
    InvalidTimeWindow { start_secs: i32, end_secs: i32 },

    /// Raised when a service duration is set to a negative number of minutes.
    #[error("service duration must be non-negative, got {minutes} minutes")]
    NegativeServiceDuration { minutes: i32 },

    /// Raised when constraint entry or computation is requested with no
    /// selected destinations.
    #[error("at least one destination must be selected")]
    EmptySelection,

    /// Raised when an operation is invoked in a session state that does not
    /// permit it.
    #[error("operation {operation} is not valid in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Raised when a computation result arrives for a planning attempt that
    /// was reset or superseded while the computation was in flight.
    #[error("computation result belongs to a superseded planning attempt")]
    StaleComputation,

    /// Raised when the provider returned a different number of job steps
    /// than waypoints were submitted.
    #[error("provider returned {actual} job steps for {expected} waypoints")]
    StepMismatch { expected: usize, actual: usize },

    /// Raised when a provider job step cannot be matched back to any
    /// submitted waypoint.
    #[error("provider step at ({lon}, {lat}) does not match any waypoint")]
    UnmatchedStep { lon: f64, lat: f64 },

    /// Raised when a provider response parses but carries no usable route.
    #[error("provider response did not contain a route")]
    MissingRoute,

    /// Wrapper for geocoding worker pool construction failures.
    #[error(transparent)]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Raised when a share link cannot be assembled.
    #[error("failed to build share link: {0}")]
    ShareLink(String),
}

impl Error {
    /// Whether a retry may succeed: timeouts, connection failures and
    /// server-side (5xx) responses. Client errors (4xx) are never transient.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            Error::Transport(err) => err.is_timeout() || err.is_connect(),
            Error::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
