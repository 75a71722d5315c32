use garde::Validate;

use crate::error::{AppError, Result};

/// Validates a request payload.
///
/// # Arguments
///
/// * `payload` - The deserialized request body.
///
/// # Returns
///
/// A `Result<()>` carrying every failed rule, one `path: message` per line.
pub fn validate_request<T>(payload: &T) -> Result<()>
where
    T: Validate,
    T::Context: Default,
{
    payload.validate().map_err(|report| {
        let message = report
            .iter()
            .map(|(path, error)| format!("{path}: {error}"))
            .collect::<Vec<_>>()
            .join("; ");
        AppError::Validation(message)
    })
}
