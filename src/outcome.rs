//! Uniform boundary shape for host applications.
//!
//! Store and pricing actions return `Result<T>` inside the crate; at the
//! application boundary (REST handlers, IPC) every action is reported as
//! `{ "success": true, ...data }` or `{ "success": false, "error": "..." }`.
//! No error type crosses that boundary.

use serde::Serialize;

use crate::error::BinderError;

/// One action's outcome in the uniform boundary shape.
///
/// Success flattens the payload next to the `success` flag; failure carries
/// the error message.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ActionOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T: Serialize> From<std::result::Result<T, BinderError>> for ActionOutcome<T> {
    fn from(result: std::result::Result<T, BinderError>) -> Self {
        match result {
            Ok(data) => ActionOutcome::ok(data),
            Err(e) => ActionOutcome::err(e.to_string()),
        }
    }
}
