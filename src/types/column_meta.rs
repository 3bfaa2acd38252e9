use crate::column_mapping::ColumnKind;

#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub column_name: String,      // snake_case
    pub column_enum_name: String, // CamelCase
    pub kind: ColumnKind,
    pub not_null: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub unique: bool,
}
