pub mod association_meta;
pub mod column_meta;
pub mod relation_meta;
pub mod table_meta;

pub use association_meta::{AssociationMeta, AssociationSide};
pub use column_meta::ColumnMeta;
pub use relation_meta::{RelationEnd, RelationKind, RelationMeta, ViaJunction};
pub use table_meta::TableMeta;
