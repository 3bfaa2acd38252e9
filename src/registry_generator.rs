use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::column_mapping::ColumnKind;
use crate::entity_generator::{build_table_meta, GeneratedEntity};
use crate::erd::TableIndex;
use crate::error::Result;
use crate::relationships::Classification;
use crate::types::ColumnMeta;

pub struct RegistryOutput {
    pub tokens: TokenStream,
    pub has_admin_seed: bool,
}

/// Emit `entities/mod.rs`: module declarations for every generated module,
/// the name→entity lookup over the non-association entities, and the
/// one-time administrative bootstrap.
pub fn generate_registry(
    index: &TableIndex,
    classification: &Classification,
    entities: &[GeneratedEntity],
) -> Result<RegistryOutput> {
    let mut module_names: Vec<String> = entities
        .iter()
        .map(|entity: &GeneratedEntity| entity.module_name.clone())
        .chain(
            classification
                .associations
                .iter()
                .map(|assoc| assoc.module_name.clone()),
        )
        .collect();
    module_names.sort();
    module_names.dedup();

    let modules: Vec<TokenStream> = module_names
        .iter()
        .map(|name: &String| {
            let ident = format_ident!("{}", name);
            quote!(pub mod #ident;)
        })
        .collect();

    let mut named: Vec<(&str, &str)> = entities
        .iter()
        .map(|entity: &GeneratedEntity| (entity.table_name.as_str(), entity.module_name.as_str()))
        .collect();
    named.sort();

    let entity_names: Vec<&str> = named.iter().map(|(name, _)| *name).collect();

    let fetch_arms: Vec<TokenStream> = named
        .iter()
        .map(|(name, module)| {
            let module = format_ident!("{}", module);
            quote! {
                #name => #module::Entity::find()
                    .all(db)
                    .await?
                    .iter()
                    .map(#module::Model::safe_dict)
                    .collect(),
            }
        })
        .collect();

    let admin_seed = admin_seed_tokens(index, entities)?;
    let has_admin_seed = admin_seed.is_some();
    let admin_seed = admin_seed.unwrap_or_default();

    let tokens = quote! {
        #(#modules)*

        use sea_orm::{DatabaseConnection, DbErr};

        pub const TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f";
        pub const DATE_FMT: &str = "%Y-%m-%d";

        pub static ENTITY_NAMES: &[&str] = &[#(#entity_names),*];

        pub async fn fetch_all(
            db: &DatabaseConnection,
            entity: &str,
        ) -> Result<Option<Vec<serde_json::Value>>, DbErr> {
            use sea_orm::EntityTrait;

            let rows: Vec<serde_json::Value> = match entity {
                #(#fetch_arms)*
                _ => return Ok(None),
            };
            Ok(Some(rows))
        }

        #admin_seed
    };

    Ok(RegistryOutput {
        tokens,
        has_admin_seed,
    })
}

/// Bootstrap: make sure a default administrative record exists. Only the
/// attributes the ERD declares as required are filled in, and the lookup
/// key is the user table's first unique text attribute.
fn admin_seed_tokens(
    index: &TableIndex,
    entities: &[GeneratedEntity],
) -> Result<Option<TokenStream>> {
    let Some(user) = entities
        .iter()
        .find(|entity: &&GeneratedEntity| entity.table_name == "user")
    else {
        return Ok(None);
    };
    let Some(table) = index.get(user.table_id) else {
        return Ok(None);
    };

    let meta = build_table_meta(table)?;
    let Some(key) = meta.columns.iter().find(|column: &&ColumnMeta| {
        column.unique && column.not_null && matches!(column.kind, ColumnKind::Text { .. })
    }) else {
        return Ok(None);
    };

    let key_column = format_ident!("{}", key.column_enum_name);

    let required: Vec<&ColumnMeta> = meta
        .columns
        .iter()
        .filter(|column: &&ColumnMeta| column.not_null)
        .collect();
    let optional_count = meta.columns.len() - required.len();

    let mut args: Vec<TokenStream> = required
        .iter()
        .map(|column: &&ColumnMeta| seed_value(&column.kind))
        .collect();
    args.extend(std::iter::repeat(quote!(None)).take(optional_count));

    Ok(Some(quote! {
        pub async fn ensure_admin(db: &DatabaseConnection) -> Result<(), DbErr> {
            use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};

            let existing = user::Entity::find()
                .filter(user::Column::#key_column.eq("admin"))
                .one(db)
                .await?;
            if existing.is_none() {
                user::Model::new(#(#args),*).insert(db).await?;
            }
            Ok(())
        }
    }))
}

fn seed_value(kind: &ColumnKind) -> TokenStream {
    match kind {
        ColumnKind::Integer => quote!(0),
        ColumnKind::Float => quote!(0.0),
        ColumnKind::Text { .. } => quote!("admin".to_string()),
        ColumnKind::Date => quote!(Default::default()),
        ColumnKind::Custom(_) => quote!("admin".to_string()),
        ColumnKind::Unknown => quote!(Default::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_generator::generate_entities;
    use crate::erd::parse_document;
    use crate::relationships::classify;
    use serde_json::json;

    fn registry_for(value: serde_json::Value) -> RegistryOutput {
        let document = parse_document(value).unwrap();
        let index = TableIndex::from_document(&document).unwrap();
        let classification = classify(&index).unwrap();
        let entities = generate_entities(&index, &classification).unwrap();
        generate_registry(&index, &classification, &entities).unwrap()
    }

    fn user_table(id: u64) -> serde_json::Value {
        json!({
            "type": "Table",
            "details": {
                "id": id,
                "name": "user",
                "attributes": [
                    { "id": 10, "names": ["id"], "dataType": "int", "pkMember": true },
                    { "id": 11, "names": ["user_name"], "dataType": "varcharn", "dataTypeSize": "50", "soloUnique": true },
                    { "id": 12, "names": ["bio"], "dataType": "varcharn", "dataTypeSize": "256", "optional": true }
                ]
            }
        })
    }

    #[test]
    fn registry_covers_non_association_entities_only() {
        let output = registry_for(json!({
            "shapes": [
                user_table(1),
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
                        "name": "group-user-mm",
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
        }));

        let code = output.tokens.to_string();
        assert!(code.contains("pub mod group_user"));
        assert!(code.contains("& [\"group\" , \"user\"]") || code.contains("&[\"group\", \"user\"]"));
        assert!(!code.contains("\"group-user\""));
    }

    #[test]
    fn admin_seed_uses_unique_text_key_and_required_attrs() {
        let output = registry_for(json!({ "shapes": [user_table(1)] }));
        assert!(output.has_admin_seed);

        let code = output.tokens.to_string();
        assert!(code.contains("ensure_admin"));
        assert!(code.contains("UserName"));
        // One required text attribute seeded, one optional left unset.
        assert!(code.contains("\"admin\" . to_string ()"));
        assert!(code.contains("None"));
    }

    #[test]
    fn no_user_table_means_no_seed() {
        let output = registry_for(json!({
            "shapes": [
                {
                    "type": "Table",
                    "details": {
                        "id": 2,
                        "name": "group",
                        "attributes": [
                            { "id": 20, "names": ["id"], "dataType": "int", "pkMember": true }
                        ]
                    }
                }
            ]
        }));

        assert!(!output.has_admin_seed);
        assert!(!output.tokens.to_string().contains("ensure_admin"));
    }
}
