//! # Sanitized Requests
//!
//! The canonical, trusted request shapes produced by sanitization. Storage
//! backends and the document builder only ever see these, never raw caller
//! input.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::resource::RelationshipData;

/// Opaque caller context threaded through every storage and schema-hook
/// call. The service core never interprets it.
pub type Context = Arc<Value>;

/// A context carrying no information.
pub fn empty_context() -> Context {
    Arc::new(Value::Null)
}

/// Normalized pagination window: an offset plus an optional limit, where
/// `None` means "no limit".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Normalized query parameters.
///
/// `include` distinguishes "not constrained" (`None`, resolve the full
/// relationship closure) from an explicit path list; `Some(vec![])`
/// expands nothing.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub fields: HashMap<String, Vec<String>>,
    pub include: Option<Vec<String>>,
    pub page: Option<Page>,
    pub filter: Map<String, Value>,
    pub sort: Option<String>,
}

/// A sanitized CRUD request: well-formed by construction.
#[derive(Debug, Clone)]
pub struct Request {
    pub type_name: String,
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, RelationshipData>,
    pub query: Query,
    pub context: Context,
}

impl Request {
    /// A minimal request for the given type, useful to embedders calling
    /// the adapter layer directly.
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            query: Query::default(),
            context: empty_context(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }
}
