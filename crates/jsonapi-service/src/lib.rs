//! # JSON:API Service Core
//!
//! This crate provides a transport-agnostic resource-access service built
//! around the JSON:API document model. It takes raw, untrusted JSON input,
//! sanitizes it, validates payloads against per-type field schemas and
//! renders compound documents, while delegating actual persistence to a
//! pluggable storage backend.
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into three layers:
//!
//! 1. **Service Layer** ([`ServiceApi`]) - Input sanitization and dispatch.
//!    The only layer that sees untrusted input.
//! 2. **Adapter Layer** ([`ResourceAdapter`]) - CRUD orchestration:
//!    validation, default-field injection, per-type overrides and
//!    compound-document building.
//! 3. **Storage Layer** ([`Storage`]) - The six persistence primitives a
//!    backend supplies. Everything above this line is backend-agnostic.
//!
//! Resource behavior is declared, not subclassed: a [`SchemaRegistry`]
//! maps each resource type to its [`ResourceSchema`] (field definitions,
//! filters, sorters, validation hooks), and a [`TypeOverride`] registered
//! on the adapter replaces individual storage primitives for one type.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use jsonapi_service::{
//!     empty_context, ApiError, ErrorKind, ResourceAdapter, ResourceSchema,
//!     SchemaRegistry, ServiceApi, Storage,
//! };
//! use serde_json::json;
//!
//! // A backend that supplies no primitives; every operation fails with
//! // an internal "not implemented" error.
//! struct NoopStorage;
//!
//! #[async_trait::async_trait]
//! impl Storage for NoopStorage {}
//!
//! #[tokio::main]
//! async fn main() {
//!     let schemas = Arc::new(
//!         SchemaRegistry::new().register("article", ResourceSchema::new()),
//!     );
//!     let adapter = Arc::new(ResourceAdapter::new(Arc::new(NoopStorage), schemas.clone()));
//!     let service = ServiceApi::new(adapter, schemas);
//!
//!     // Unknown types are rejected before storage is ever consulted.
//!     let error = service
//!         .get(json!({ "type": "comment" }), empty_context())
//!         .await
//!         .unwrap_err();
//!     assert_eq!(error.kind(), ErrorKind::BadRequest);
//! }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`ApiError`], which doubles as an error
//! collector so sanitization and validation report every problem in one
//! response. See the [`error`] module.
//!
//! ## Testing
//!
//! Storage backends and overrides are plain trait objects, so unit tests
//! can stub them with a few lines. The `jsonapi-memory` crate in this
//! workspace provides a complete in-memory backend used by the
//! integration suite.

pub mod adapter;
pub mod error;
mod included;
pub mod query;
pub mod resource;
pub mod schema;
pub mod service;
pub mod storage;
pub mod tracing;
pub mod validator;

// Re-export core types for convenience
pub use adapter::ResourceAdapter;
pub use error::{ApiError, ErrorEntry, ErrorKind};
pub use query::{empty_context, Context, Page, Query, Request};
pub use resource::{
    Document, Meta, Pointer, PrimaryData, RelationshipData, Resource, ResourceContents,
};
pub use schema::{
    AttributeField, CrudAction, FieldsSchema, RelationshipField, ResourceSchema, SchemaRegistry,
    Sort, SortOrder, ValidateArgs, ValidateHook,
};
pub use service::{PaginationStrategy, ServiceApi};
pub use storage::{CollectionResult, Storage, TypeOverride};
pub use validator::FieldValidator;
