/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The provider is missing required settings (API key, endpoint).
    Configuration,
    /// The request could not be delivered, or the connection failed.
    Network,
    /// The provider answered with a non-success status.
    Status,
    /// The provider is rate limited.
    RateLimitExceeded,
    /// The response body could not be decoded.
    InvalidResponse,
    /// Any other errors.
    Other,
}
