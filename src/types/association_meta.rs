use super::relation_meta::RelationKind;

/// A table recognized as a pure association entity. It produces a junction
/// construct and one relationship edge between its two parents, never a
/// standalone entity.
#[derive(Clone, Debug)]
pub struct AssociationMeta {
    pub table_id: u64,
    pub table_name: String,  // truncated, cardinality code dropped
    pub module_name: String, // snake_case
    pub kind: RelationKind,
    pub left: AssociationSide,
    pub right: AssociationSide,
}

/// One parent of an association, reached through one of the two foreign
/// key attributes of the junction table.
#[derive(Clone, Debug)]
pub struct AssociationSide {
    pub parent_table_id: u64,
    pub parent_module: String,
    pub parent_entity: String, // CamelCase, also the junction Relation variant
    pub column_name: String,   // snake_case junction column
    pub data_type: String,
    pub data_type_size: Option<String>,
}
