use std::collections::{BTreeMap, BTreeSet};

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::association_generator::generate_association;
use crate::entity_generator::{generate_entities, DeferredStatement};
use crate::erd::{ErdDocument, TableIndex};
use crate::error::Result;
use crate::output::FileSet;
use crate::registry_generator::generate_registry;
use crate::relationships::classify;
use crate::routes_generator::{generate_routes, EndpointSpec};
use crate::toml_generator::render_toml;

/// Run the whole pipeline: load → classify → synthesize → link → emit.
/// The returned file set is complete or the run failed; there is no
/// partial output.
pub fn generate_backend(
    project: &str,
    document: &ErdDocument,
    endpoints: Option<&EndpointSpec>,
) -> Result<FileSet> {
    let index = TableIndex::from_document(document)?;
    let classification = classify(&index)?;

    let entities = generate_entities(&index, &classification)?;
    tracing::info!(
        entities = entities.len(),
        associations = classification.associations.len(),
        "entity synthesis complete"
    );

    let registry = generate_registry(&index, &classification, &entities)?;

    // Second phase: every shell exists, so the deferred relationship
    // completions can be appended to their target modules. One completion
    // per (target, related) pair; later duplicates are dropped.
    let mut deferred: BTreeMap<String, Vec<&DeferredStatement>> = BTreeMap::new();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    for entity in &entities {
        for statement in &entity.deferred {
            let key = (
                statement.target_module.clone(),
                statement.related_module.clone(),
            );
            if seen.insert(key) {
                deferred
                    .entry(statement.target_module.clone())
                    .or_default()
                    .push(statement);
            }
        }
    }

    let mut files = FileSet::new();

    for entity in &entities {
        let source = link_module(&entity.tokens, deferred.get(&entity.module_name));
        files.add_rust_source(format!("src/entities/{}.rs", entity.module_name), &source)?;
    }

    for assoc in &classification.associations {
        let tokens = generate_association(assoc)?;
        let source = link_module(&tokens, deferred.get(&assoc.module_name));
        files.add_rust_source(format!("src/entities/{}.rs", assoc.module_name), &source)?;
    }

    files.add_rust_source("src/entities/mod.rs", &registry.tokens.to_string())?;

    let has_routes = endpoints.is_some();
    if let Some(spec) = endpoints {
        for (name, tokens) in generate_routes(spec)? {
            files.add_rust_source(format!("src/routes/{name}"), &tokens.to_string())?;
        }
    }

    let crate_name = project.to_snake_case();
    files.add_verbatim("Cargo.toml", render_toml(&crate_name)?);

    let lib = if has_routes {
        quote! {
            pub mod entities;
            pub mod routes;
        }
    } else {
        quote!(pub mod entities;)
    };
    files.add_rust_source("src/lib.rs", &lib.to_string())?;

    let main = main_tokens(&crate_name, registry.has_admin_seed, has_routes);
    files.add_rust_source("src/main.rs", &main.to_string())?;

    Ok(files)
}

fn link_module(shell: &TokenStream, statements: Option<&Vec<&DeferredStatement>>) -> String {
    let mut source = shell.to_string();
    if let Some(statements) = statements {
        let mut codes: Vec<&str> = statements
            .iter()
            .map(|statement: &&DeferredStatement| statement.code.as_str())
            .collect();
        codes.sort_unstable();
        for code in codes {
            source.push('\n');
            source.push_str(code);
        }
    }
    source
}

fn main_tokens(crate_name: &str, has_admin_seed: bool, has_routes: bool) -> TokenStream {
    let crate_ident = format_ident!("{}", crate_name);

    let seed = if has_admin_seed {
        quote! {
            #crate_ident::entities::ensure_admin(&db).await.unwrap();
        }
    } else {
        quote!()
    };

    let app = if has_routes {
        quote!(let app = #crate_ident::routes::routes().data(db);)
    } else {
        quote!(let app = poem::Route::new().data(db);)
    };

    quote! {
        use poem::listener::TcpListener;
        use poem::{EndpointExt, Server};
        use sea_orm::Database;

        #[tokio::main]
        async fn main() {
            let db = Database::connect("sqlite://app.db?mode=rwc").await.unwrap();
            #seed
            #app
            println!("api on http://0.0.0.0:8000");
            Server::new(TcpListener::bind("0.0.0.0:8000"))
                .run(app)
                .await
                .unwrap();
        }
    }
}
