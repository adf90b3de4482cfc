/// The current state of a redirect job.
/// Loosely follows net/base/load_states.h, narrowed to the states a
/// redirect-following request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The job has not started.
    #[default]
    Idle,

    /// Building the normalized request (headers, body, cookies).
    Preparing,

    /// Waiting for the engine to return response headers.
    Requesting,

    /// Inspecting the response status and Location header.
    Deciding,

    /// Following a redirect; the next state is `Preparing`.
    Redirecting,

    /// Terminal: the response is handed back to the caller.
    Returning,
}

impl LoadState {
    /// Whether the job has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Returning)
    }
}
