//! # Resource Schemas
//!
//! Declarative per-type configuration supplied by the embedding
//! application: field declarations with defaults and constraints, named
//! filter predicates, named sort strategies, an optional async validation
//! hook, and an optional seed dataset for backends that want one.
//!
//! Schemas are loaded once into a [`SchemaRegistry`] at construction time
//! and are immutable afterwards. Field declaration order is significant:
//! it is the order validation errors are reported in.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::query::Context;
use crate::resource::{RelationshipData, Resource};
use crate::validator::FieldValidator;

/// The CRUD action a field schema or validation run applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudAction {
    Create,
    Update,
}

/// Primitive attribute value kinds the validator checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Boolean,
    Number,
}

/// Custom per-field predicate with its failure message.
#[derive(Clone)]
pub struct AttributeCheck {
    pub test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    pub message: String,
}

/// One declared attribute: kind, constraints and an optional default.
#[derive(Clone)]
pub struct AttributeField {
    pub name: String,
    pub kind: AttributeKind,
    pub required_on_create: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub default: Option<Value>,
    pub check: Option<AttributeCheck>,
}

impl AttributeField {
    fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required_on_create: false,
            min_length: None,
            max_length: None,
            default: None,
            check: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Boolean)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Number)
    }

    pub fn required(mut self) -> Self {
        self.required_on_create = true;
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Attach a custom predicate; `message` is reported when it fails.
    pub fn check(
        mut self,
        message: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.check = Some(AttributeCheck {
            test: Arc::new(test),
            message: message.into(),
        });
        self
    }
}

/// Relationship cardinality with the expected target resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipKind {
    HasOne(String),
    HasMany(String),
}

/// One declared relationship.
#[derive(Clone)]
pub struct RelationshipField {
    pub name: String,
    pub kind: RelationshipKind,
    pub nullable: bool,
    pub required_on_create: bool,
    pub default: Option<RelationshipData>,
}

impl RelationshipField {
    pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::HasOne(target.into()),
            nullable: false,
            required_on_create: false,
            default: None,
        }
    }

    pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::HasMany(target.into()),
            nullable: false,
            required_on_create: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required_on_create = true;
        self
    }

    pub fn default_value(mut self, data: RelationshipData) -> Self {
        self.default = Some(data);
        self
    }
}

/// Ordered field declarations for one resource type.
#[derive(Clone, Default)]
pub struct FieldsSchema {
    pub attributes: Vec<AttributeField>,
    pub relationships: Vec<RelationshipField>,
}

impl FieldsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, field: AttributeField) -> Self {
        self.attributes.push(field);
        self
    }

    pub fn relationship(mut self, field: RelationshipField) -> Self {
        self.relationships.push(field);
        self
    }

    pub fn find_attribute(&self, name: &str) -> Option<&AttributeField> {
        self.attributes.iter().find(|field| field.name == name)
    }

    pub fn find_relationship(&self, name: &str) -> Option<&RelationshipField> {
        self.relationships.iter().find(|field| field.name == name)
    }
}

/// Computes the field schema for a CRUD action; lets a schema require a
/// field on create but not on update, or consult the caller context.
pub type FieldsSchemaFn = Arc<dyn Fn(CrudAction, &Context) -> FieldsSchema + Send + Sync>;

/// Named filter predicate: `(resource, requested filter value) -> keep?`.
pub type FilterFn = Arc<dyn Fn(&Resource, &Value) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Named sort strategy: either an attribute field (or `"id"`) with a
/// direction, or an arbitrary comparator.
#[derive(Clone)]
pub enum Sort {
    Field { field: String, order: SortOrder },
    Comparator(Arc<dyn Fn(&Resource, &Resource) -> Ordering + Send + Sync>),
}

/// Arguments handed to a schema's custom validation hook.
///
/// The hook receives a ready [`FieldValidator`] so it can combine
/// schema-driven checks with ad-hoc ones in a single pass, then collapse
/// everything through one `report()`.
pub struct ValidateArgs<'a> {
    pub action: CrudAction,
    /// The resource being validated against: the merged blueprint on
    /// create, the currently stored resource on update.
    pub resource: &'a Resource,
    pub attributes: &'a Map<String, Value>,
    pub relationships: &'a BTreeMap<String, RelationshipData>,
    pub validator: FieldValidator,
    pub context: &'a Context,
}

/// Custom validation logic for one resource type. Replaces the generic
/// field validation entirely; implementations that want it call
/// `args.validator.validate(..)` themselves.
#[async_trait]
pub trait ValidateHook: Send + Sync {
    async fn validate(&self, args: ValidateArgs<'_>) -> Result<(), ApiError>;
}

/// Seed dataset supplier for backends that load initial data.
pub type DatasetFn = Arc<dyn Fn() -> Vec<Resource> + Send + Sync>;

/// Everything the embedding application declares about one resource type.
#[derive(Clone, Default)]
pub struct ResourceSchema {
    fields: Option<FieldsSchemaFn>,
    filters: HashMap<String, FilterFn>,
    sorts: HashMap<String, Sort>,
    validate: Option<Arc<dyn ValidateHook>>,
    dataset: Option<DatasetFn>,
}

impl ResourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field declarations computed per action/context.
    pub fn fields(
        mut self,
        schema: impl Fn(CrudAction, &Context) -> FieldsSchema + Send + Sync + 'static,
    ) -> Self {
        self.fields = Some(Arc::new(schema));
        self
    }

    /// Field declarations that do not depend on action or context.
    pub fn static_fields(mut self, schema: FieldsSchema) -> Self {
        self.fields = Some(Arc::new(move |_, _| schema.clone()));
        self
    }

    pub fn filter(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Resource, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filters.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn sort_by_field(
        mut self,
        name: impl Into<String>,
        field: impl Into<String>,
        order: SortOrder,
    ) -> Self {
        self.sorts.insert(
            name.into(),
            Sort::Field {
                field: field.into(),
                order,
            },
        );
        self
    }

    pub fn sort_with(
        mut self,
        name: impl Into<String>,
        comparator: impl Fn(&Resource, &Resource) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.sorts
            .insert(name.into(), Sort::Comparator(Arc::new(comparator)));
        self
    }

    pub fn validate_with(mut self, hook: Arc<dyn ValidateHook>) -> Self {
        self.validate = Some(hook);
        self
    }

    pub fn dataset(mut self, supplier: impl Fn() -> Vec<Resource> + Send + Sync + 'static) -> Self {
        self.dataset = Some(Arc::new(supplier));
        self
    }

    pub fn resolve_fields(&self, action: CrudAction, context: &Context) -> Option<FieldsSchema> {
        self.fields.as_ref().map(|schema| schema(action, context))
    }

    pub fn find_filter(&self, name: &str) -> Option<&FilterFn> {
        self.filters.get(name)
    }

    pub fn find_sort(&self, name: &str) -> Option<&Sort> {
        self.sorts.get(name)
    }

    pub fn validate_hook(&self) -> Option<&Arc<dyn ValidateHook>> {
        self.validate.as_ref()
    }

    pub fn seed_dataset(&self) -> Vec<Resource> {
        self.dataset
            .as_ref()
            .map(|supplier| supplier())
            .unwrap_or_default()
    }
}

/// All resource schemas known to one service instance, keyed by type.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ResourceSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, type_name: impl Into<String>, schema: ResourceSchema) -> Self {
        self.schemas.insert(type_name.into(), schema);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&ResourceSchema> {
        self.schemas.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
