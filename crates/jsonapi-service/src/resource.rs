//! # Resource Model
//!
//! Data shapes shared by every layer: typed resources with attribute and
//! relationship maps, weak `(type, id)` pointers between them, and the
//! rendered document envelope (`data` + `included` + `meta`).
//!
//! A [`Pointer`] is never an ownership edge; resolving it requires a round
//! trip through a storage backend. Anywhere in the system a pointer must
//! resolve to at most one resource of matching `(type, id)`.

use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Weak reference to a resource: `{ "type": ..., "id": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
}

impl Pointer {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Deduplication key, unique per `(type, id)` pair.
    pub fn key(&self) -> String {
        format!("{}@{}", self.id, self.type_name)
    }
}

/// Relationship linkage: a to-one pointer (possibly empty) or a to-many
/// pointer list. Serialized as `{"data": null | {..} | [..]}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipData {
    One(Option<Pointer>),
    Many(Vec<Pointer>),
}

impl RelationshipData {
    /// All pointers carried by this entry. Empty for `One(None)`.
    pub fn pointers(&self) -> Vec<&Pointer> {
        match self {
            RelationshipData::One(Some(pointer)) => vec![pointer],
            RelationshipData::One(None) => Vec::new(),
            RelationshipData::Many(pointers) => pointers.iter().collect(),
        }
    }

    /// Drop every pointer matching `(type, id)`: to-one entries become
    /// empty, to-many entries are filtered.
    pub fn remove_pointer(&mut self, type_name: &str, id: &str) {
        match self {
            RelationshipData::One(slot) => {
                if slot
                    .as_ref()
                    .is_some_and(|p| p.type_name == type_name && p.id == id)
                {
                    *slot = None;
                }
            }
            RelationshipData::Many(pointers) => {
                pointers.retain(|p| !(p.type_name == type_name && p.id == id));
            }
        }
    }
}

impl From<Option<Pointer>> for RelationshipData {
    fn from(pointer: Option<Pointer>) -> Self {
        RelationshipData::One(pointer)
    }
}

impl From<Vec<Pointer>> for RelationshipData {
    fn from(pointers: Vec<Pointer>) -> Self {
        RelationshipData::Many(pointers)
    }
}

impl Serialize for RelationshipData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            RelationshipData::One(pointer) => map.serialize_entry("data", pointer)?,
            RelationshipData::Many(pointers) => map.serialize_entry("data", pointers)?,
        }
        map.end()
    }
}

/// A typed, identified record with attributes and relationships.
///
/// Storage backends own the canonical copies; the service layer only ever
/// holds transient clones. Empty attribute/relationship maps are pruned
/// when serialized but kept in storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl Resource {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, data: RelationshipData) -> Self {
        self.relationships.insert(name.into(), data);
        self
    }

    pub fn pointer(&self) -> Pointer {
        Pointer::new(self.type_name.clone(), self.id.clone())
    }

    /// Deduplication key, same scheme as [`Pointer::key`].
    pub fn key(&self) -> String {
        format!("{}@{}", self.id, self.type_name)
    }

    /// Apply a sparse fieldset: when a whitelist exists for this resource
    /// type, keep only the listed attributes and relationships. Projection
    /// is idempotent.
    pub fn project(&self, fields: &HashMap<String, Vec<String>>) -> Resource {
        let Some(field_list) = fields.get(&self.type_name) else {
            return self.clone();
        };
        Resource {
            type_name: self.type_name.clone(),
            id: self.id.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|(name, _)| field_list.iter().any(|f| f == *name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            relationships: self
                .relationships
                .iter()
                .filter(|(name, _)| field_list.iter().any(|f| f == *name))
                .map(|(name, data)| (name.clone(), data.clone()))
                .collect(),
        }
    }
}

/// Attribute/relationship payload handed to storage on create and update.
/// On update, supplied keys overwrite and everything else is untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceContents {
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, RelationshipData>,
}

/// Primary data of a response document: one resource or a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(Resource),
    Many(Vec<Resource>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    pub total: usize,
}

/// A compound response document. `included` is omitted when empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Document {
    /// The single primary resource; `None` on collection documents.
    pub fn resource(&self) -> Option<&Resource> {
        match &self.data {
            PrimaryData::One(resource) => Some(resource),
            PrimaryData::Many(_) => None,
        }
    }

    /// The primary resource collection; empty slice for single documents.
    pub fn resources(&self) -> &[Resource] {
        match &self.data {
            PrimaryData::Many(resources) => resources,
            PrimaryData::One(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article() -> Resource {
        Resource::new("article", "1")
            .attribute("title", json!("Article title 1"))
            .attribute("body", json!("Article body 1"))
            .relationship(
                "author",
                RelationshipData::One(Some(Pointer::new("user", "1"))),
            )
            .relationship(
                "tags",
                RelationshipData::Many(vec![Pointer::new("tag", "1"), Pointer::new("tag", "2")]),
            )
    }

    #[test]
    fn projection_keeps_only_listed_fields() {
        let fields = HashMap::from([(
            "article".to_string(),
            vec!["title".to_string(), "author".to_string()],
        )]);
        let view = article().project(&fields);
        assert_eq!(view.attributes.len(), 1);
        assert!(view.attributes.contains_key("title"));
        assert_eq!(view.relationships.len(), 1);
        assert!(view.relationships.contains_key("author"));
    }

    #[test]
    fn projection_is_idempotent() {
        let fields = HashMap::from([("article".to_string(), vec!["title".to_string()])]);
        let once = article().project(&fields);
        let twice = once.project(&fields);
        assert_eq!(once, twice);
    }

    #[test]
    fn projection_without_whitelist_is_identity() {
        let resource = article();
        assert_eq!(resource.project(&HashMap::new()), resource);
    }

    #[test]
    fn empty_maps_are_pruned_from_rendered_output() {
        let rendered = serde_json::to_value(Resource::new("tag", "7")).unwrap();
        assert_eq!(rendered, json!({ "type": "tag", "id": "7" }));
    }

    #[test]
    fn relationship_serializes_under_data_key() {
        let one = serde_json::to_value(RelationshipData::One(None)).unwrap();
        assert_eq!(one, json!({ "data": null }));
        let many =
            serde_json::to_value(RelationshipData::Many(vec![Pointer::new("tag", "1")])).unwrap();
        assert_eq!(many, json!({ "data": [{ "type": "tag", "id": "1" }] }));
    }

    #[test]
    fn remove_pointer_severs_matching_edges_only() {
        let mut one = RelationshipData::One(Some(Pointer::new("user", "1")));
        one.remove_pointer("user", "2");
        assert_eq!(one, RelationshipData::One(Some(Pointer::new("user", "1"))));
        one.remove_pointer("user", "1");
        assert_eq!(one, RelationshipData::One(None));

        let mut many =
            RelationshipData::Many(vec![Pointer::new("tag", "1"), Pointer::new("tag", "2")]);
        many.remove_pointer("tag", "2");
        assert_eq!(many, RelationshipData::Many(vec![Pointer::new("tag", "1")]));
    }

    #[test]
    fn document_accessors_select_by_primary_data_shape() {
        let single = Document {
            data: PrimaryData::One(article()),
            included: Vec::new(),
            meta: None,
        };
        assert_eq!(single.resource().map(|r| r.id.as_str()), Some("1"));
        assert!(single.resources().is_empty());

        let collection = Document {
            data: PrimaryData::Many(vec![article()]),
            included: Vec::new(),
            meta: None,
        };
        assert!(collection.resource().is_none());
        assert_eq!(collection.resources().len(), 1);
    }
}
