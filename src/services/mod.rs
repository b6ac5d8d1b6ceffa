pub mod branches;
pub mod cargo;
pub mod orders;
pub mod users;

use crate::errors::ServiceError;

/// Presence check for request fields the API requires. Mirrors the
/// field-keyed failure mode of the HTTP surface: absence and emptiness
/// are reported against the field name.
pub(crate) fn require_str(field: &str, value: Option<String>) -> Result<String, ServiceError> {
    match value {
        None => Err(ServiceError::validation(
            field,
            format!("{field} must be provided."),
        )),
        Some(v) if v.trim().is_empty() => Err(ServiceError::validation(
            field,
            format!("{field} cannot be empty."),
        )),
        Some(v) => Ok(v),
    }
}

pub(crate) fn require<T>(field: &str, value: Option<T>) -> Result<T, ServiceError> {
    value.ok_or_else(|| ServiceError::validation(field, format!("{field} must be provided.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_named() {
        let err = require_str("title", None).unwrap_err();
        assert_eq!(err.to_string(), "title must be provided.");
    }

    #[test]
    fn blank_field_is_named() {
        let err = require_str("title", Some("   ".into())).unwrap_err();
        assert_eq!(err.to_string(), "title cannot be empty.");
    }

    #[test]
    fn present_field_passes_through() {
        assert_eq!(require_str("title", Some("Books".into())).unwrap(), "Books");
    }
}
