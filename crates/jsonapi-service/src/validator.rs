//! # Field Validation
//!
//! Validates an attributes/relationships payload against a declarative
//! [`FieldsSchema`] and extracts declared defaults. Failures are collected
//! into a single validation error, never thrown one at a time; the error
//! list order follows schema declaration order, which tests may rely on.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::resource::RelationshipData;
use crate::schema::{AttributeKind, CrudAction, FieldsSchema, RelationshipKind};

/// Per-call validator built from a resolved field schema.
///
/// A custom schema hook may interleave [`validate`](FieldValidator::validate)
/// with its own [`add_attribute_error`](FieldValidator::add_attribute_error)
/// calls before collapsing everything with a single
/// [`report`](FieldValidator::report).
pub struct FieldValidator {
    schema: FieldsSchema,
    action: CrudAction,
    errors: ApiError,
}

impl FieldValidator {
    pub fn new(schema: FieldsSchema, action: CrudAction, message_field: &str) -> Self {
        Self {
            schema,
            action,
            errors: ApiError::validation_error().with_message_field(message_field),
        }
    }

    /// Extract schema-declared attribute and relationship defaults.
    pub fn defaults(&self) -> (Map<String, Value>, BTreeMap<String, RelationshipData>) {
        let attributes = self
            .schema
            .attributes
            .iter()
            .filter_map(|field| {
                field
                    .default
                    .as_ref()
                    .map(|value| (field.name.clone(), value.clone()))
            })
            .collect();
        let relationships = self
            .schema
            .relationships
            .iter()
            .filter_map(|field| {
                field
                    .default
                    .as_ref()
                    .map(|data| (field.name.clone(), data.clone()))
            })
            .collect();
        (attributes, relationships)
    }

    /// Run every declared check over the payload, then flag undeclared
    /// payload fields. Errors accumulate; nothing short-circuits.
    pub fn validate(
        &mut self,
        attributes: &Map<String, Value>,
        relationships: &BTreeMap<String, RelationshipData>,
    ) -> &mut Self {
        // Borrow the declarations up front so error collection below can
        // take &mut self.errors freely.
        let schema = std::mem::take(&mut self.schema);

        for field in &schema.attributes {
            self.validate_attribute(field, attributes.get(&field.name));
        }
        for field in &schema.relationships {
            self.validate_relationship(field, relationships.get(&field.name));
        }

        for name in attributes.keys() {
            if schema.find_attribute(name).is_none() {
                self.errors
                    .add_attribute_error(name, format!("Field \"{name}\" is not declared"));
            }
        }
        for name in relationships.keys() {
            if schema.find_relationship(name).is_none() {
                self.errors
                    .add_relationship_error(name, format!("Field \"{name}\" is not declared"));
            }
        }

        self.schema = schema;
        self
    }

    fn validate_attribute(&mut self, field: &crate::schema::AttributeField, value: Option<&Value>) {
        let Some(value) = value else {
            if field.required_on_create && self.action == CrudAction::Create {
                self.errors
                    .add_attribute_error(&field.name, "Field is required");
            }
            return;
        };

        let kind_matches = match field.kind {
            AttributeKind::String => value.is_string(),
            AttributeKind::Boolean => value.is_boolean(),
            AttributeKind::Number => value.is_number(),
        };
        if !kind_matches {
            // Remaining checks assume the declared kind; skip them.
            self.errors
                .add_attribute_error(&field.name, "Invalid field type");
            return;
        }

        if let Some(text) = value.as_str() {
            let length = text.chars().count();
            if let Some(min) = field.min_length {
                if length < min {
                    self.errors
                        .add_attribute_error(&field.name, format!("Field minimum length is {min}"));
                }
            }
            if let Some(max) = field.max_length {
                if length > max {
                    self.errors
                        .add_attribute_error(&field.name, format!("Field maximum length is {max}"));
                }
            }
        }

        if let Some(check) = &field.check {
            if !(check.test)(value) {
                self.errors
                    .add_attribute_error(&field.name, check.message.clone());
            }
        }
    }

    fn validate_relationship(
        &mut self,
        field: &crate::schema::RelationshipField,
        data: Option<&RelationshipData>,
    ) {
        let Some(data) = data else {
            if field.required_on_create && self.action == CrudAction::Create {
                self.errors
                    .add_relationship_error(&field.name, "Field is required");
            }
            return;
        };

        let valid = match (&field.kind, data) {
            (RelationshipKind::HasOne(_), RelationshipData::One(None)) => field.nullable,
            (RelationshipKind::HasOne(target), RelationshipData::One(Some(pointer))) => {
                pointer.type_name == *target
            }
            (RelationshipKind::HasMany(target), RelationshipData::Many(pointers)) => {
                pointers.iter().all(|pointer| pointer.type_name == *target)
            }
            // Cardinality mismatch.
            _ => false,
        };
        if !valid {
            self.errors
                .add_relationship_error(&field.name, "Relationship not valid");
        }
    }

    pub fn add_attribute_error(&mut self, field: &str, detail: impl Into<String>) -> &mut Self {
        self.errors.add_attribute_error(field, detail);
        self
    }

    pub fn add_relationship_error(&mut self, field: &str, detail: impl Into<String>) -> &mut Self {
        self.errors.add_relationship_error(field, detail);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.errors.has_entries()
    }

    /// Resolve successfully iff no check failed.
    pub fn report(self) -> Result<(), ApiError> {
        self.errors.report()
    }
}
