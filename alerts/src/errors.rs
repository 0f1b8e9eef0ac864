use thiserror::Error;

/// Why an alert did not reach the channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("no webhook url configured")]
    NotConfigured,

    /// The notifier's own minimum was not met; nothing was sent.
    #[error("drop of {percentage:.1}% is below the {minimum}% notification minimum")]
    BelowMinimum { percentage: f64, minimum: f64 },

    #[error("webhook transport error: {0}")]
    Transport(String),

    #[error("webhook rejected alert with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
