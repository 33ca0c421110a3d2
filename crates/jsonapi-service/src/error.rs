//! # Service Errors
//!
//! This module defines the error type shared by every layer of the service.
//! By centralizing error construction, sanitization, field validation and
//! storage backends all aggregate and report failures the same way.
//!
//! An [`ApiError`] doubles as an error *collector*: callers append entries
//! (optionally bound to an attribute or relationship pointer) and finally
//! call [`ApiError::report`], which resolves successfully iff no entry was
//! collected. Insertion order of entries is preserved and is part of the
//! observable contract.

use serde_json::{json, Value};

/// Failure categories a transport can map to protocol status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or unknown-type input. Client error, never retried.
    BadRequest,
    /// One or more requested ids could not be resolved.
    ResourceNotFound,
    /// Field-level failures, carries an ordered sub-error list.
    ValidationError,
    /// Storage backend failure not otherwise classified.
    InternalError,
}

impl ErrorKind {
    /// Stable machine-readable code used in rendered error documents.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "badRequest",
            ErrorKind::ResourceNotFound => "resourceNotFound",
            ErrorKind::ValidationError => "validationError",
            ErrorKind::InternalError => "internalError",
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad request",
            ErrorKind::ResourceNotFound => "Resource not found",
            ErrorKind::ValidationError => "Validation error",
            ErrorKind::InternalError => "Internal error",
        }
    }
}

/// A single collected failure, optionally bound to a source pointer
/// (`/data/attributes/<field>` or `/data/relationships/<field>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: String,
    pub pointer: Option<String>,
    pub detail: String,
}

/// The error type for all service operations.
///
/// Also acts as the collector described in the module docs: build one with
/// a kind constructor, append entries, then collapse with [`report`].
/// The name of the message field in rendered entries (`"detail"` by
/// default) is explicit per-instance configuration, never process state.
///
/// [`report`]: ApiError::report
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    message_field: String,
    errors: Vec<ErrorEntry>,
}

impl ApiError {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            message_field: "detail".to_string(),
            errors: Vec::new(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(ErrorKind::BadRequest)
    }

    pub fn resource_not_found() -> Self {
        Self::new(ErrorKind::ResourceNotFound)
    }

    pub fn validation_error() -> Self {
        Self::new(ErrorKind::ValidationError)
    }

    pub fn internal_error() -> Self {
        Self::new(ErrorKind::InternalError)
    }

    /// Shorthand for the "storage primitive missing" failure. A backend
    /// that does not supply a CRUD primitive fails fatally with this; there
    /// is no silent no-op fallback.
    pub fn not_implemented(method: &str, type_name: &str) -> Self {
        Self::internal_error()
            .with_message(format!("{method} not implemented for resource type \"{type_name}\""))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the field name under which entry messages are rendered.
    pub fn with_message_field(mut self, field: impl Into<String>) -> Self {
        self.message_field = field.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn entries(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn has_entries(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Append a failure not bound to any field.
    pub fn add_error(&mut self, detail: impl Into<String>) -> &mut Self {
        self.errors.push(ErrorEntry {
            code: self.kind.code().to_string(),
            pointer: None,
            detail: detail.into(),
        });
        self
    }

    /// Append a failure bound to `/data/attributes/<field>`.
    pub fn add_attribute_error(&mut self, field: &str, detail: impl Into<String>) -> &mut Self {
        self.add_field_error("attributes", field, detail)
    }

    /// Append a failure bound to `/data/relationships/<field>`.
    pub fn add_relationship_error(&mut self, field: &str, detail: impl Into<String>) -> &mut Self {
        self.add_field_error("relationships", field, detail)
    }

    fn add_field_error(&mut self, domain: &str, field: &str, detail: impl Into<String>) -> &mut Self {
        self.errors.push(ErrorEntry {
            code: self.kind.code().to_string(),
            pointer: Some(format!("/data/{domain}/{field}")),
            detail: detail.into(),
        });
        self
    }

    /// Collapse "maybe there were problems" into a definite outcome:
    /// `Ok(())` iff no entry was collected.
    pub fn report(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Consuming variant of [`add_error`](ApiError::add_error) for one-shot
    /// construction sites.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.add_error(detail);
        self
    }

    /// Render a JSON:API error document. Entry messages appear under the
    /// configured message field name.
    pub fn to_json(&self) -> Value {
        let errors: Vec<Value> = self
            .errors
            .iter()
            .map(|entry| {
                let mut object = json!({ "code": entry.code });
                if let Some(pointer) = &entry.pointer {
                    object["source"] = json!({ "pointer": pointer });
                }
                object[self.message_field.as_str()] = Value::String(entry.detail.clone());
                object
            })
            .collect();
        json!({ "errors": errors })
    }
}
