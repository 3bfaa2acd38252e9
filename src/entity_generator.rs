use std::collections::BTreeSet;

use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::column_mapping::{column_mapping, ColumnKind};
use crate::erd::{Table, TableIndex};
use crate::error::{GeneratorError, Result};
use crate::relationships::Classification;
use crate::types::{ColumnMeta, RelationMeta, TableMeta};

/// One synthesized entity module plus the relationship-completion
/// statements it owes to other modules.
#[derive(Clone, Debug)]
pub struct GeneratedEntity {
    pub table_id: u64,
    pub entity_name: String,
    pub module_name: String,
    pub table_name: String,
    pub tokens: TokenStream,
    pub deferred: Vec<DeferredStatement>,
}

/// A statement that must be appended to another entity's module once that
/// module's definition exists. `related_module` identifies the entity the
/// statement links back to, so duplicate completions for the same pair can
/// be dropped deterministically.
#[derive(Clone, Debug)]
pub struct DeferredStatement {
    pub target_module: String,
    pub related_module: String,
    pub code: String,
}

/// Synthesize one entity per non-association table, in table id order.
pub fn generate_entities(
    index: &TableIndex,
    classification: &Classification,
) -> Result<Vec<GeneratedEntity>> {
    let association_ids = classification.association_ids();

    index
        .iter()
        .filter(|table: &&Table| !association_ids.contains(&table.id))
        .map(|table: &Table| generate_entity(table, classification))
        .collect()
}

fn generate_entity(table: &Table, classification: &Classification) -> Result<GeneratedEntity> {
    let meta = build_table_meta(table)?;

    let fields: Vec<TokenStream> = meta
        .columns
        .iter()
        .map(|column: &ColumnMeta| field_tokens(column))
        .collect();

    let table_name = &meta.table_name;
    let model = quote! {
        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = #table_name)]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            #(#fields,)*
            pub created_at: DateTime,
            pub updated_at: DateTime,
        }
    };

    let relations = relation_tokens(&meta, classification.edges(table.id));

    let constructor = constructor_tokens(&meta);
    let safe_dict = safe_dict_tokens(&meta);

    let variants = &relations.variants;
    let relation_enum = quote! {
        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {
            #(#variants),*
        }
    };

    let live_impls = &relations.live_impls;
    let tokens = quote! {
        use sea_orm::entity::prelude::*;
        use sea_orm::ActiveValue::{NotSet, Set};

        #model

        #relation_enum

        #(#live_impls)*

        impl Model {
            #constructor

            #safe_dict
        }

        impl ActiveModelBehavior for ActiveModel {}
    };

    Ok(GeneratedEntity {
        table_id: table.id,
        entity_name: meta.entity_name,
        module_name: meta.entity_module,
        table_name: table.name.clone(),
        tokens,
        deferred: relations.deferred,
    })
}

/// Map a raw table into column metadata, scalars first, then foreign keys,
/// both in declaration order. The implicit `id` attribute is represented by
/// the base `id` column every entity carries.
pub(crate) fn build_table_meta(table: &Table) -> Result<TableMeta> {
    let mut scalars: Vec<ColumnMeta> = Vec::new();
    let mut foreign_keys: Vec<ColumnMeta> = Vec::new();

    for attr in &table.attributes {
        let name = attr.canonical_name();
        if name == "id" {
            continue;
        }

        let kind = column_mapping(&attr.data_type, attr.data_type_size.as_deref());
        if kind == ColumnKind::Unknown {
            return Err(GeneratorError::UnknownType {
                table: table.name.clone(),
                attribute: name.to_string(),
                data_type: attr.data_type.clone(),
            });
        }

        let column = ColumnMeta {
            column_name: name.to_snake_case(),
            column_enum_name: name.to_upper_camel_case(),
            kind,
            not_null: !attr.optional,
            is_primary_key: attr.pk_member,
            is_foreign_key: attr.fk,
            unique: attr.solo_unique,
        };

        if attr.fk {
            foreign_keys.push(column);
        } else {
            scalars.push(column);
        }
    }

    let mut columns = scalars;
    columns.append(&mut foreign_keys);

    Ok(TableMeta {
        table_id: table.id,
        entity_name: table.name.to_upper_camel_case(),
        entity_module: table.name.to_snake_case(),
        table_name: table.name.replace('-', "_"),
        columns,
    })
}

fn field_tokens(column: &ColumnMeta) -> TokenStream {
    let ident = format_ident!("{}", column.column_name);
    let base = column
        .kind
        .rs_type()
        .expect("unknown column kinds are rejected while building columns");
    let ty = if column.not_null {
        base
    } else {
        quote!(Option<#base>)
    };

    let mut specs: Vec<TokenStream> = Vec::new();
    if column.is_primary_key {
        specs.push(quote!(primary_key));
        specs.push(quote!(auto_increment = false));
    }
    if column.unique {
        specs.push(quote!(unique));
    }
    if let Some(column_type) = column.kind.column_type_override() {
        specs.push(quote!(column_type = #column_type));
    }

    if specs.is_empty() {
        quote!(pub #ident: #ty)
    } else {
        quote! {
            #[sea_orm(#(#specs),*)]
            pub #ident: #ty
        }
    }
}

struct RelationTokens {
    variants: Vec<TokenStream>,
    live_impls: Vec<TokenStream>,
    deferred: Vec<DeferredStatement>,
}

/// Relationship items for one entity. Edges this table originates produce a
/// live `Relation` variant or `Related` impl here, plus the deferred inverse
/// statement for the other endpoint's module. Edges recorded on the target
/// side emit nothing; their completion arrives as a deferred statement from
/// the origin.
fn relation_tokens(meta: &TableMeta, edges: &[RelationMeta]) -> RelationTokens {
    let mut variants: Vec<TokenStream> = Vec::new();
    let mut live_impls: Vec<TokenStream> = Vec::new();
    let mut deferred: Vec<DeferredStatement> = Vec::new();
    let mut used_variants: BTreeSet<String> = BTreeSet::new();
    let mut related_targets: BTreeSet<String> = BTreeSet::new();

    let self_module = format_ident!("{}", meta.entity_module);

    for edge in edges.iter().filter(|edge: &&RelationMeta| edge.origin) {
        let other_module_name = edge.to.table_name.to_snake_case();
        let other_module = format_ident!("{}", other_module_name);

        if let Some(via) = &edge.via {
            let junction = format_ident!("{}", via.module);
            let self_variant = format_ident!("{}", via.self_variant);
            let other_variant = format_ident!("{}", via.other_variant);

            if related_targets.insert(other_module_name.clone()) {
                live_impls.push(quote! {
                    impl Related<super::#other_module::Entity> for Entity {
                        fn to() -> RelationDef {
                            super::#junction::Relation::#other_variant.def()
                        }

                        fn via() -> Option<RelationDef> {
                            Some(super::#junction::Relation::#self_variant.def().rev())
                        }
                    }
                });
            }

            let completion = quote! {
                impl Related<super::#self_module::Entity> for Entity {
                    fn to() -> RelationDef {
                        super::#junction::Relation::#self_variant.def()
                    }

                    fn via() -> Option<RelationDef> {
                        Some(super::#junction::Relation::#other_variant.def().rev())
                    }
                }
            };
            deferred.push(DeferredStatement {
                target_module: other_module_name,
                related_module: meta.entity_module.clone(),
                code: completion.to_string(),
            });
        } else {
            let variant_name = unique_variant(&edge.to.table_name.to_upper_camel_case(), &mut used_variants);
            let variant = format_ident!("{}", variant_name);

            let target_entity = format!("super::{}::Entity", other_module_name);
            let from_column = fk_enum_path(edge);
            let to_column = format!("super::{}::Column::Id", other_module_name);

            variants.push(quote! {
                #[sea_orm(
                    belongs_to = #target_entity,
                    from = #from_column,
                    to = #to_column,
                    on_update = "Cascade",
                    on_delete = "Cascade"
                )]
                #variant
            });

            if related_targets.insert(other_module_name.clone()) {
                live_impls.push(quote! {
                    impl Related<super::#other_module::Entity> for Entity {
                        fn to() -> RelationDef {
                            Relation::#variant.def()
                        }
                    }
                });
            }

            // A self-referential edge is already fully wired above.
            if other_module_name != meta.entity_module {
                let completion = quote! {
                    impl Related<super::#self_module::Entity> for Entity {
                        fn to() -> RelationDef {
                            super::#self_module::Relation::#variant.def().rev()
                        }
                    }
                };
                deferred.push(DeferredStatement {
                    target_module: other_module_name,
                    related_module: meta.entity_module.clone(),
                    code: completion.to_string(),
                });
            }
        }
    }

    RelationTokens {
        variants,
        live_impls,
        deferred,
    }
}

fn fk_enum_path(edge: &RelationMeta) -> String {
    let column = edge
        .fk_column
        .as_deref()
        .unwrap_or("id")
        .to_upper_camel_case();
    format!("Column::{column}")
}

fn unique_variant(base: &str, used: &mut BTreeSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Named-fields constructor: required attributes first, optional ones after,
/// defaulting to unset timestamps and an unset auto-increment id.
fn constructor_tokens(meta: &TableMeta) -> TokenStream {
    let required: Vec<&ColumnMeta> = meta
        .columns
        .iter()
        .filter(|column: &&ColumnMeta| column.not_null)
        .collect();
    let optional: Vec<&ColumnMeta> = meta
        .columns
        .iter()
        .filter(|column: &&ColumnMeta| !column.not_null)
        .collect();

    let params: Vec<TokenStream> = required
        .iter()
        .chain(optional.iter())
        .map(|column: &&ColumnMeta| {
            let ident = format_ident!("{}", column.column_name);
            let base = column
                .kind
                .rs_type()
                .expect("unknown column kinds are rejected while building columns");
            if column.not_null {
                quote!(#ident: #base)
            } else {
                quote!(#ident: Option<#base>)
            }
        })
        .collect();

    let sets: Vec<TokenStream> = meta
        .columns
        .iter()
        .map(|column: &ColumnMeta| {
            let ident = format_ident!("{}", column.column_name);
            quote!(#ident: Set(#ident))
        })
        .collect();

    quote! {
        pub fn new(#(#params),*) -> ActiveModel {
            let now = chrono::Utc::now().naive_utc();
            ActiveModel {
                id: NotSet,
                #(#sets,)*
                created_at: Set(now),
                updated_at: Set(now),
            }
        }
    }
}

/// Serialization for API responses: every declared column, temporal fields
/// rendered with the fixed formats, nothing else leaks.
fn safe_dict_tokens(meta: &TableMeta) -> TokenStream {
    let inserts: Vec<TokenStream> = meta
        .columns
        .iter()
        .map(|column: &ColumnMeta| {
            let key = &column.column_name;
            let ident = format_ident!("{}", column.column_name);
            let value = if column.kind.is_temporal() {
                if column.not_null {
                    quote!(self.#ident.format(super::DATE_FMT).to_string())
                } else {
                    quote!(self.#ident.map(|value| value.format(super::DATE_FMT).to_string()))
                }
            } else {
                quote!(&self.#ident)
            };
            quote! {
                map.insert(#key.to_string(), serde_json::json!(#value));
            }
        })
        .collect();

    quote! {
        pub fn safe_dict(&self) -> serde_json::Value {
            let mut map = serde_json::Map::new();
            map.insert("id".to_string(), serde_json::json!(self.id));
            #(#inserts)*
            map.insert(
                "created_at".to_string(),
                serde_json::json!(self.created_at.format(super::TIME_FMT).to_string()),
            );
            map.insert(
                "updated_at".to_string(),
                serde_json::json!(self.updated_at.format(super::TIME_FMT).to_string()),
            );
            serde_json::Value::Object(map)
        }
    }
}
