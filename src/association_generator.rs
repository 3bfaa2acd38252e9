use heck::ToUpperCamelCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::column_mapping::{column_mapping, ColumnKind};
use crate::error::{GeneratorError, Result};
use crate::types::{AssociationMeta, AssociationSide, RelationKind};

/// Emit the junction construct for one association entity: two foreign key
/// columns forming a composite primary key, cascading on update and delete
/// toward both parents. Exactly one construct per association, no matter
/// how many deferred statements point at it.
pub fn generate_association(assoc: &AssociationMeta) -> Result<TokenStream> {
    let table_name = assoc.table_name.replace('-', "_");

    let left = side_tokens(assoc, &assoc.left)?;
    let right = side_tokens(assoc, &assoc.right)?;

    let left_field = left.field;
    let right_field = right.field;
    let left_variant = left.variant;
    let right_variant = right.variant;

    Ok(quote! {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = #table_name)]
        pub struct Model {
            #left_field
            #right_field
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {
            #left_variant,
            #right_variant
        }

        impl ActiveModelBehavior for ActiveModel {}
    })
}

struct SideTokens {
    field: TokenStream,
    variant: TokenStream,
}

fn side_tokens(assoc: &AssociationMeta, side: &AssociationSide) -> Result<SideTokens> {
    let kind = column_mapping(&side.data_type, side.data_type_size.as_deref());
    if kind == ColumnKind::Unknown {
        return Err(GeneratorError::UnknownType {
            table: assoc.table_name.clone(),
            attribute: side.column_name.clone(),
            data_type: side.data_type.clone(),
        });
    }
    let ty = kind
        .rs_type()
        .expect("unknown column kinds are rejected above");

    let ident = format_ident!("{}", side.column_name);
    // One-to-one through a junction keeps each side unique.
    let field = if assoc.kind == RelationKind::OneToOne {
        quote! {
            #[sea_orm(primary_key, auto_increment = false, unique)]
            pub #ident: #ty,
        }
    } else {
        quote! {
            #[sea_orm(primary_key, auto_increment = false)]
            pub #ident: #ty,
        }
    };

    let variant = format_ident!("{}", side.parent_entity);
    let target_entity = format!("super::{}::Entity", side.parent_module);
    let from_column = format!("Column::{}", side.column_name.to_upper_camel_case());
    let to_column = format!("super::{}::Column::Id", side.parent_module);

    let variant = quote! {
        #[sea_orm(
            belongs_to = #target_entity,
            from = #from_column,
            to = #to_column,
            on_update = "Cascade",
            on_delete = "Cascade"
        )]
        #variant
    };

    Ok(SideTokens { field, variant })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erd::{parse_document, TableIndex};
    use crate::relationships::classify;
    use serde_json::json;

    fn classified(name: &str) -> AssociationMeta {
        let document = parse_document(json!({
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
                {
                    "type": "Table",
                    "details": {
                        "id": 2,
                        "name": "group",
                        "attributes": [
                            { "id": 20, "names": ["id"], "dataType": "int", "pkMember": true }
                        ]
                    }
                },
                {
                    "type": "Table",
                    "details": {
                        "id": 3,
                        "name": name,
                        "attributes": [
                            {
                                "id": 30,
                                "names": ["group_id"],
                                "dataType": "int",
                                "fk": true,
                                "pkMember": true,
                                "references": [{ "tableId": 2, "attributeId": 20 }]
                            },
                            {
                                "id": 31,
                                "names": ["user_id"],
                                "dataType": "int",
                                "fk": true,
                                "pkMember": true,
                                "references": [{ "tableId": 1, "attributeId": 10 }]
                            }
                        ]
                    }
                }
            ]
        }))
        .unwrap();
        let index = TableIndex::from_document(&document).unwrap();
        classify(&index).unwrap().associations[0].clone()
    }

    #[test]
    fn junction_has_composite_key_and_cascades() {
        let tokens = generate_association(&classified("group-user-mm")).unwrap();
        let code = tokens.to_string();

        assert!(code.contains("\"group_user\""));
        assert!(code.contains("group_id"));
        assert!(code.contains("user_id"));
        assert!(code.contains("primary_key"));
        assert!(code.contains("\"Cascade\""));
        assert!(code.contains("\"super::group::Entity\""));
        assert!(code.contains("\"super::user::Entity\""));
        assert!(!code.contains("unique"));
    }

    #[test]
    fn one_to_one_junction_keeps_sides_unique() {
        let tokens = generate_association(&classified("group-user-oo")).unwrap();
        assert!(tokens.to_string().contains("unique"));
    }
}
