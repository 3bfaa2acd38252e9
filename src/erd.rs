use std::collections::BTreeMap;

use serde_derive::Deserialize;

use crate::error::{GeneratorError, Result};

/// An ERD document as exported by the diagram editor: a flat list of shapes
/// of which only the `Table` ones are meaningful to the generator.
#[derive(Clone, Debug, Deserialize)]
pub struct ErdDocument {
    pub shapes: Vec<Shape>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum Shape {
    Table(Table),
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: u64,
    pub name: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: u64,
    pub names: Vec<String>,
    pub data_type: String,
    #[serde(default)]
    pub data_type_size: Option<String>,
    #[serde(default)]
    pub fk: bool,
    #[serde(default)]
    pub references: Vec<AttributeRef>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub pk_member: bool,
    #[serde(default)]
    pub solo_unique: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRef {
    pub table_id: u64,
    pub attribute_id: u64,
}

impl Attribute {
    /// First entry of `names` is the canonical attribute name.
    pub fn canonical_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }
}

/// Deserialize an already-parsed JSON value into an ERD document. A shape
/// that claims to be a table but lacks required fields fails here.
pub fn parse_document(value: serde_json::Value) -> Result<ErdDocument> {
    serde_json::from_value(value).map_err(|e: serde_json::Error| GeneratorError::MalformedSchema {
        reason: e.to_string(),
    })
}

/// All tables of the document, indexed by id. Iteration order is table id
/// order so every downstream pass is deterministic.
#[derive(Clone, Debug, Default)]
pub struct TableIndex {
    tables: BTreeMap<u64, Table>,
}

impl TableIndex {
    pub fn from_document(document: &ErdDocument) -> Result<Self> {
        let mut tables: BTreeMap<u64, Table> = BTreeMap::new();

        for shape in &document.shapes {
            let Shape::Table(table) = shape else {
                continue;
            };

            if table.name.is_empty() {
                return Err(GeneratorError::MalformedSchema {
                    reason: format!("table {} has an empty name", table.id),
                });
            }
            if let Some(attr) = table.attributes.iter().find(|attr: &&Attribute| attr.names.is_empty()) {
                return Err(GeneratorError::MalformedSchema {
                    reason: format!("table '{}' attribute {} has no name", table.name, attr.id),
                });
            }
            if tables.insert(table.id, table.clone()).is_some() {
                return Err(GeneratorError::MalformedSchema {
                    reason: format!("duplicate table id {}", table.id),
                });
            }
        }

        Ok(Self { tables })
    }

    pub fn get(&self, id: u64) -> Option<&Table> {
        self.tables.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.tables.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tables_and_skips_other_shapes() {
        let doc = parse_document(json!({
            "shapes": [
                {
                    "type": "Table",
                    "details": {
                        "id": 1,
                        "name": "user",
                        "attributes": [
                            { "id": 10, "names": ["id"], "dataType": "int", "pkMember": true }
                        ]
                    }
                },
                { "type": "Connector", "details": { "source": 1, "destination": 2 } }
            ]
        }))
        .unwrap();

        let index = TableIndex::from_document(&doc).unwrap();
        assert_eq!(index.len(), 1);
        let user = index.get(1).unwrap();
        assert_eq!(user.name, "user");
        assert_eq!(user.attributes[0].canonical_name(), "id");
        assert!(user.attributes[0].pk_member);
    }

    #[test]
    fn table_shape_missing_fields_is_malformed() {
        let err = parse_document(json!({
            "shapes": [
                { "type": "Table", "details": { "id": 1 } }
            ]
        }))
        .unwrap_err();

        assert!(matches!(err, GeneratorError::MalformedSchema { .. }));
    }

    #[test]
    fn duplicate_table_id_is_malformed() {
        let doc = parse_document(json!({
            "shapes": [
                { "type": "Table", "details": { "id": 1, "name": "a", "attributes": [] } },
                { "type": "Table", "details": { "id": 1, "name": "b", "attributes": [] } }
            ]
        }))
        .unwrap();

        let err = TableIndex::from_document(&doc).unwrap_err();
        assert!(matches!(err, GeneratorError::MalformedSchema { .. }));
    }
}
