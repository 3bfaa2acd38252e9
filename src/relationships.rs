use std::collections::{BTreeMap, BTreeSet};

use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::erd::{Attribute, Table, TableIndex};
use crate::error::{GeneratorError, Result};
use crate::types::{
    AssociationMeta, AssociationSide, RelationEnd, RelationKind, RelationMeta, ViaJunction,
};

/// Classifier output: one adjacency list per table plus the recognized
/// association entities, everything in table id order.
#[derive(Clone, Debug, Default)]
pub struct Classification {
    pub adjacency: BTreeMap<u64, Vec<RelationMeta>>,
    pub associations: Vec<AssociationMeta>,
}

impl Classification {
    pub fn association_ids(&self) -> BTreeSet<u64> {
        self.associations
            .iter()
            .map(|assoc: &AssociationMeta| assoc.table_id)
            .collect()
    }

    pub fn is_association(&self, table_id: u64) -> bool {
        self.associations
            .iter()
            .any(|assoc: &AssociationMeta| assoc.table_id == table_id)
    }

    pub fn edges(&self, table_id: u64) -> &[RelationMeta] {
        self.adjacency
            .get(&table_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Derive typed relationship edges from naming conventions and foreign key
/// attributes. Every edge ends up in the adjacency lists of both endpoint
/// tables, exactly once per endpoint.
pub fn classify(index: &TableIndex) -> Result<Classification> {
    let mut classification = Classification::default();

    for table in index.iter() {
        classification.adjacency.insert(table.id, Vec::new());
    }

    for table in index.iter() {
        match table.name.matches('-').count() {
            0 | 1 => classify_foreign_keys(index, table, &mut classification)?,
            2 => classify_association(index, table, &mut classification)?,
            _ => {
                return Err(GeneratorError::MalformedSchema {
                    reason: format!(
                        "table name '{}' does not match the <parentA>-<parentB>-<cardinality> convention",
                        table.name
                    ),
                });
            }
        }
    }

    tracing::debug!(
        tables = index.len(),
        associations = classification.associations.len(),
        "relationship classification complete"
    );

    Ok(classification)
}

/// Explicit association convention: `<parentA>-<parentB>-<code>` names a
/// pure association entity carrying exactly two foreign keys.
fn classify_association(
    index: &TableIndex,
    table: &Table,
    classification: &mut Classification,
) -> Result<()> {
    let parts: Vec<&str> = table.name.split('-').collect();
    let code = parts[2];
    let Some(kind) = RelationKind::from_code(code) else {
        return Err(GeneratorError::MalformedSchema {
            reason: format!("table '{}' has unknown cardinality code '{}'", table.name, code),
        });
    };

    let fks: Vec<&Attribute> = table
        .attributes
        .iter()
        .filter(|attr: &&Attribute| attr.fk)
        .collect();
    if fks.len() != 2 {
        return Err(GeneratorError::AmbiguousAssociation {
            table: table.name.clone(),
            found: fks.len(),
        });
    }

    let first = resolve_reference(index, table, fks[0])?;
    let second = resolve_reference(index, table, fks[1])?;

    // Orient the pair so the first embedded name is the edge origin.
    let (mut left, mut right) = ((fks[0], first), (fks[1], second));
    if parts[0] != left.1.name {
        std::mem::swap(&mut left, &mut right);
    }
    if parts[0] != left.1.name || parts[1] != right.1.name {
        return Err(GeneratorError::MalformedSchema {
            reason: format!(
                "association table '{}' does not reference parents '{}' and '{}'",
                table.name, parts[0], parts[1]
            ),
        });
    }
    if left.1.id == right.1.id {
        return Err(GeneratorError::MalformedSchema {
            reason: format!("association table '{}' parents must be distinct", table.name),
        });
    }

    let truncated = parts[..2].join("-");
    let module_name = truncated.to_snake_case();

    let side = |attr: &Attribute, parent: &Table| AssociationSide {
        parent_table_id: parent.id,
        parent_module: parent.name.to_snake_case(),
        parent_entity: parent.name.to_upper_camel_case(),
        column_name: attr.canonical_name().to_snake_case(),
        data_type: attr.data_type.clone(),
        data_type_size: attr.data_type_size.clone(),
    };

    let forward = RelationMeta {
        kind,
        from: RelationEnd {
            table_id: left.1.id,
            table_name: left.1.name.clone(),
            attribute_id: left.0.references[0].attribute_id,
        },
        to: RelationEnd {
            table_id: right.1.id,
            table_name: right.1.name.clone(),
            attribute_id: right.0.references[0].attribute_id,
        },
        origin: true,
        fk_column: None,
        via: Some(ViaJunction {
            module: module_name.clone(),
            self_variant: left.1.name.to_upper_camel_case(),
            other_variant: right.1.name.to_upper_camel_case(),
        }),
    };
    let inverse = RelationMeta {
        kind: kind.inverse(),
        from: forward.to.clone(),
        to: forward.from.clone(),
        origin: false,
        fk_column: None,
        via: Some(ViaJunction {
            module: module_name.clone(),
            self_variant: right.1.name.to_upper_camel_case(),
            other_variant: left.1.name.to_upper_camel_case(),
        }),
    };

    push_edge(classification, forward);
    push_edge(classification, inverse);

    classification.associations.push(AssociationMeta {
        table_id: table.id,
        table_name: truncated,
        module_name,
        kind,
        left: side(left.0, left.1),
        right: side(right.0, right.1),
    });

    Ok(())
}

/// Implicit convention: every foreign key of a plain table is a
/// many-to-one edge toward the referenced table, with its one-to-many
/// inverse recorded on the referenced side.
fn classify_foreign_keys(
    index: &TableIndex,
    table: &Table,
    classification: &mut Classification,
) -> Result<()> {
    for attr in table.attributes.iter().filter(|attr: &&Attribute| attr.fk) {
        let referenced = resolve_reference(index, table, attr)?;

        let forward = RelationMeta {
            kind: RelationKind::ManyToOne,
            from: RelationEnd {
                table_id: table.id,
                table_name: table.name.clone(),
                attribute_id: attr.id,
            },
            to: RelationEnd {
                table_id: referenced.id,
                table_name: referenced.name.clone(),
                attribute_id: attr.references[0].attribute_id,
            },
            origin: true,
            fk_column: Some(attr.canonical_name().to_snake_case()),
            via: None,
        };
        let inverse = RelationMeta {
            kind: RelationKind::OneToMany,
            from: forward.to.clone(),
            to: forward.from.clone(),
            origin: false,
            fk_column: forward.fk_column.clone(),
            via: None,
        };

        push_edge(classification, forward);
        push_edge(classification, inverse);
    }

    Ok(())
}

// TODO support composite foreign keys; only references[0] is honored.
fn resolve_reference<'a>(
    index: &'a TableIndex,
    table: &Table,
    attr: &Attribute,
) -> Result<&'a Table> {
    let Some(reference) = attr.references.first() else {
        return Err(GeneratorError::MalformedSchema {
            reason: format!(
                "table '{}' attribute '{}' is marked fk but has no references",
                table.name,
                attr.canonical_name()
            ),
        });
    };

    let Some(referenced) = index.get(reference.table_id) else {
        return Err(GeneratorError::DanglingReference {
            table: table.name.clone(),
            attribute: attr.canonical_name().to_string(),
            target: reference.table_id,
        });
    };

    if !referenced
        .attributes
        .iter()
        .any(|target: &Attribute| target.id == reference.attribute_id)
    {
        return Err(GeneratorError::DanglingReference {
            table: table.name.clone(),
            attribute: attr.canonical_name().to_string(),
            target: reference.table_id,
        });
    }

    Ok(referenced)
}

fn push_edge(classification: &mut Classification, edge: RelationMeta) {
    classification
        .adjacency
        .entry(edge.from.table_id)
        .or_default()
        .push(edge);
}
