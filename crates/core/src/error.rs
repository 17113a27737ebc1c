/// Request-level failures that carry no storage or token detail.
///
/// The HTTP layer maps each variant to a fixed status: `Validation` to 400,
/// `Unauthorized` to 401 and `Forbidden` to 403.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// One or more input fields failed validation. The message lists them
    /// as `field: reason` pairs.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No authenticated caller.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but lacking a required role or ownership.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}
