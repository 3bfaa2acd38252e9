use super::column_meta::ColumnMeta;

#[derive(Clone, Debug)]
pub struct TableMeta {
    pub table_id: u64,
    pub entity_name: String,   // CamelCase
    pub entity_module: String, // snake_case
    pub table_name: String,    // raw ERD name, separators normalized for SQL
    pub columns: Vec<ColumnMeta>,
}
