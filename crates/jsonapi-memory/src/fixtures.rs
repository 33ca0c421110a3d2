//! Demo resource declarations: articles written by users and labeled with
//! tags. Used by the binary and the integration suite, so the datasets
//! are deterministic.

use std::sync::Arc;

use async_trait::async_trait;
use jsonapi_service::{
    ApiError, AttributeField, CrudAction, FieldsSchema, Pointer, RelationshipData,
    RelationshipField, Resource, ResourceSchema, SchemaRegistry, SortOrder, ValidateArgs,
    ValidateHook,
};
use serde_json::{json, Value};

fn article_fields(action: CrudAction) -> FieldsSchema {
    let title = AttributeField::string("title").min_length(2);
    let title = match action {
        CrudAction::Create => title.required(),
        CrudAction::Update => title,
    };
    FieldsSchema::new()
        .attribute(title)
        .attribute(AttributeField::string("body").default_value(json!("")))
        .attribute(AttributeField::boolean("published").default_value(json!(false)))
        .relationship(
            RelationshipField::has_many("tags", "tag").default_value(RelationshipData::Many(vec![])),
        )
        .relationship(
            RelationshipField::has_one("author", "user")
                .nullable()
                .default_value(RelationshipData::One(None)),
        )
}

fn user_fields(action: CrudAction) -> FieldsSchema {
    let email = AttributeField::string("email").check("Invalid email format", |value| {
        value
            .as_str()
            .is_some_and(|email| email.contains('@') && email.contains('.'))
    });
    let (email, boss) = match action {
        CrudAction::Create => (
            email.required(),
            RelationshipField::has_one("boss", "user").required(),
        ),
        CrudAction::Update => (email, RelationshipField::has_one("boss", "user")),
    };
    FieldsSchema::new()
        .attribute(AttributeField::string("nickname").default_value(json!("")))
        .attribute(email)
        .relationship(boss)
}

struct UserValidation;

#[async_trait]
impl ValidateHook for UserValidation {
    async fn validate(&self, args: ValidateArgs<'_>) -> Result<(), ApiError> {
        let mut validator = args.validator;
        validator.validate(args.attributes, args.relationships);
        validator.report()
    }
}

fn title_filter(resource: &Resource, value: &Value) -> bool {
    let title = resource
        .attributes
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default();
    value
        .as_str()
        .is_some_and(|needle| title.to_lowercase().contains(&needle.to_lowercase()))
}

fn article_dataset() -> Vec<Resource> {
    (1..=9)
        .map(|index| {
            Resource::new("article", index.to_string())
                .attribute("title", json!(format!("Article title {index}")))
                .attribute("body", json!(format!("Article body {index}")))
                .attribute("published", json!(index % 2 == 0))
                .relationship("author", Some(Pointer::new("user", "1")).into())
                .relationship(
                    "tags",
                    vec![
                        Pointer::new("tag", "1"),
                        Pointer::new("tag", (1 + index % 5).to_string()),
                        Pointer::new("tag", (6 + index % 5).to_string()),
                    ]
                    .into(),
                )
        })
        .collect()
}

fn tag_dataset() -> Vec<Resource> {
    (1..=10)
        .map(|index| {
            Resource::new("tag", index.to_string())
                .attribute("title", json!(format!("Tag {index}")))
        })
        .collect()
}

fn user_dataset() -> Vec<Resource> {
    (1..=5)
        .map(|index| {
            Resource::new("user", index.to_string())
                .attribute("nickname", json!(format!("testUser{index}")))
                .attribute("email", json!(format!("testUser{index}@gmail.com")))
                .relationship("boss", Some(Pointer::new("user", "2")).into())
        })
        .collect()
}

/// The article/tag/user registry with seed data.
pub fn demo_registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .register(
            "article",
            ResourceSchema::new()
                .fields(|action, _| article_fields(action))
                .filter("title", title_filter)
                .sort_by_field("-title", "title", SortOrder::Descending)
                .dataset(article_dataset),
        )
        .register("tag", ResourceSchema::new().dataset(tag_dataset))
        .register(
            "user",
            ResourceSchema::new()
                .fields(|action, _| user_fields(action))
                .validate_with(Arc::new(UserValidation))
                .dataset(user_dataset),
        )
}
