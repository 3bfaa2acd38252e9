use std::collections::BTreeMap;

use heck::ToUpperCamelCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use serde_derive::Deserialize;

use crate::error::Result;

/// Declarative endpoint specification: section → path → method → operation.
pub type EndpointSpec = BTreeMap<String, BTreeMap<String, BTreeMap<String, Operation>>>;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub desc: String,
    /// Request fields; a trailing `?` on the field name marks it optional.
    #[serde(default)]
    pub request: BTreeMap<String, String>,
    #[serde(default)]
    pub responses: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub pagination: Option<String>,
}

/// Generate one handler-stub module per section plus the route registration
/// module. Returns `(file name, tokens)` pairs for the `routes/` directory.
pub fn generate_routes(spec: &EndpointSpec) -> Result<Vec<(String, TokenStream)>> {
    let mut files: Vec<(String, TokenStream)> = Vec::new();
    let mut registrations: BTreeMap<String, Vec<(String, String, String)>> = BTreeMap::new();

    for (section, paths) in spec {
        let mut items: Vec<TokenStream> = Vec::new();
        let mut needs_path = false;
        let mut needs_query = false;
        let mut needs_json = false;
        let mut needs_struct = false;

        for (path, methods) in paths {
            for (method, operation) in methods {
                let handler = route_handler_name(path, method);
                registrations.entry(path.clone()).or_default().push((
                    method.clone(),
                    section.clone(),
                    handler.clone(),
                ));

                let params = path_params(path);
                needs_path |= !params.is_empty();

                let request = effective_request(operation);
                let query_style = matches!(method.as_str(), "GET" | "DELETE");
                if !request.is_empty() {
                    needs_struct = true;
                    needs_query |= query_style;
                    needs_json |= !query_style;
                }

                items.push(operation_tokens(path, method, operation, &handler, &params, &request, query_style));
            }
        }

        let mut extractors: Vec<TokenStream> = Vec::new();
        if needs_json {
            extractors.push(quote!(Json));
        }
        if needs_path {
            extractors.push(quote!(Path));
        }
        if needs_query {
            extractors.push(quote!(Query));
        }
        let web_use = if extractors.is_empty() {
            quote!()
        } else {
            quote!(use poem::web::{#(#extractors),*};)
        };

        let serde_use = if needs_struct {
            quote!(use serde::Deserialize;)
        } else {
            quote!()
        };

        let tokens = quote! {
            use poem::handler;
            use poem::http::StatusCode;
            #web_use
            #serde_use

            #(#items)*
        };

        files.push((format!("{section}.rs"), tokens));
    }

    files.push(("mod.rs".to_string(), mod_tokens(spec, &registrations)));

    Ok(files)
}

/// Derive the handler name from path and method, mirroring the route map
/// convention: `/api/v1/groups/<group_id>` + GET → `groups_one_getter`.
pub fn route_handler_name(path: &str, method: &str) -> String {
    let suffix = match method {
        "GET" => "getter",
        "POST" => "poster",
        "PUT" => "putter",
        "PATCH" => "patcher",
        "DELETE" => "deleter",
        _ => "handler",
    };

    let trimmed = path.strip_prefix("/api/v1").unwrap_or(path);
    let mut name = String::new();
    for segment in trimmed.split('/').filter(|segment: &&str| !segment.is_empty()) {
        if !name.is_empty() {
            name.push('_');
        }
        if segment.starts_with('<') {
            name.push_str("one");
        } else {
            name.push_str(segment);
        }
    }
    if name.is_empty() {
        name.push_str("index");
    }
    name.push('_');
    name.push_str(suffix);
    name
}

fn path_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment: &&str| segment.starts_with('<') && segment.ends_with('>'))
        .map(|segment: &str| segment[1..segment.len() - 1].to_string())
        .collect()
}

/// Pagination adds the standard optional paging fields to the request map.
fn effective_request(operation: &Operation) -> BTreeMap<String, String> {
    let mut request = operation.request.clone();
    if operation.pagination.is_some() {
        request.insert("page?".to_string(), "int".to_string());
        request.insert("page_size?".to_string(), "int".to_string());
        request.insert("query?".to_string(), "str".to_string());
    }
    request
}

fn operation_tokens(
    path: &str,
    method: &str,
    operation: &Operation,
    handler: &str,
    params: &[String],
    request: &BTreeMap<String, String>,
    query_style: bool,
) -> TokenStream {
    let handler_ident = format_ident!("{}", handler);

    let request_struct = if request.is_empty() {
        quote!()
    } else {
        let struct_ident = format_ident!("{}Request", handler.to_upper_camel_case());
        let fields: Vec<TokenStream> = request
            .iter()
            .map(|(name, type_name)| {
                let optional = name.ends_with('?');
                let ident = format_ident!("{}", name.trim_end_matches('?'));
                let base = request_field_type(type_name);
                let ty = if optional { quote!(Option<#base>) } else { base };
                quote!(pub #ident: #ty)
            })
            .collect();

        quote! {
            #[derive(Debug, Deserialize)]
            pub struct #struct_ident {
                #(#fields,)*
            }
        }
    };

    let mut args: Vec<TokenStream> = Vec::new();
    match params {
        [] => {}
        [single] => {
            let ident = format_ident!("{}", single);
            args.push(quote!(Path(#ident): Path<String>));
        }
        many => {
            let idents: Vec<_> = many.iter().map(|param: &String| format_ident!("{}", param)).collect();
            let types: Vec<_> = many.iter().map(|_| quote!(String)).collect();
            args.push(quote!(Path((#(#idents),*)): Path<(#(#types),*)>));
        }
    }
    if !request.is_empty() {
        let struct_ident = format_ident!("{}Request", handler.to_upper_camel_case());
        if query_style {
            args.push(quote!(Query(req): Query<#struct_ident>));
        } else {
            args.push(quote!(Json(req): Json<#struct_ident>));
        }
    }

    let unused: Vec<TokenStream> = {
        let mut silence: Vec<TokenStream> = Vec::new();
        for param in params {
            let ident = format_ident!("{}", param);
            silence.push(quote!(let _ = &#ident;));
        }
        if !request.is_empty() {
            silence.push(quote!(let _ = &req;));
        }
        silence
    };

    let status = success_status(operation);
    let doc = format!(" {method} {path}: {}", operation.desc);

    quote! {
        #request_struct

        #[doc = #doc]
        #[handler]
        pub async fn #handler_ident(#(#args),*) -> (StatusCode, poem::web::Json<serde_json::Value>) {
            #(#unused)*
            (#status, poem::web::Json(serde_json::json!({})))
        }
    }
}

fn request_field_type(type_name: &str) -> TokenStream {
    match type_name {
        "int" => quote!(i64),
        "float" => quote!(f64),
        "bool" => quote!(bool),
        "str" | "email" | "url" | "datetime" => quote!(String),
        _ => quote!(serde_json::Value),
    }
}

fn success_status(operation: &Operation) -> TokenStream {
    let code = operation
        .responses
        .keys()
        .filter_map(|key: &String| key.parse::<u16>().ok())
        .filter(|code: &u16| (200..300).contains(code))
        .min()
        .unwrap_or(200);

    match code {
        200 => quote!(StatusCode::OK),
        201 => quote!(StatusCode::CREATED),
        202 => quote!(StatusCode::ACCEPTED),
        204 => quote!(StatusCode::NO_CONTENT),
        other => quote!(StatusCode::from_u16(#other).unwrap()),
    }
}

fn mod_tokens(
    spec: &EndpointSpec,
    registrations: &BTreeMap<String, Vec<(String, String, String)>>,
) -> TokenStream {
    let sections: Vec<TokenStream> = spec
        .keys()
        .map(|section: &String| {
            let ident = format_ident!("{}", section);
            quote!(pub mod #ident;)
        })
        .collect();

    let mut verbs: Vec<&str> = Vec::new();
    let mut ats: Vec<TokenStream> = Vec::new();
    for (path, handlers) in registrations {
        let route_path = poem_path(path);
        let mut builder = TokenStream::new();
        for (i, (method, section, handler)) in handlers.iter().enumerate() {
            let verb = match method.as_str() {
                "GET" => "get",
                "POST" => "post",
                "PUT" => "put",
                "PATCH" => "patch",
                "DELETE" => "delete",
                _ => continue,
            };
            if !verbs.contains(&verb) {
                verbs.push(verb);
            }
            let verb_ident = format_ident!("{}", verb);
            let section_ident = format_ident!("{}", section);
            let handler_ident = format_ident!("{}", handler);
            if i == 0 {
                builder = quote!(#verb_ident(#section_ident::#handler_ident));
            } else {
                builder = quote!(#builder.#verb_ident(#section_ident::#handler_ident));
            }
        }
        ats.push(quote!(.at(#route_path, #builder)));
    }

    verbs.sort();
    let verb_idents: Vec<_> = verbs.iter().map(|verb: &&str| format_ident!("{}", verb)).collect();
    let verb_use = if verb_idents.is_empty() {
        quote!(use poem::Route;)
    } else {
        quote!(use poem::{#(#verb_idents),*, Route};)
    };

    quote! {
        #(#sections)*

        #verb_use

        pub fn routes() -> Route {
            Route::new()
                #(#ats)*
        }
    }
}

fn poem_path(path: &str) -> String {
    path.split('/')
        .map(|segment: &str| {
            if segment.starts_with('<') && segment.ends_with('>') {
                format!(":{}", &segment[1..segment.len() - 1])
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<String>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_from(value: serde_json::Value) -> EndpointSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn handler_names_follow_the_route_map_convention() {
        assert_eq!(route_handler_name("/api/v1/groups", "GET"), "groups_getter");
        assert_eq!(
            route_handler_name("/api/v1/groups/<group_id>", "DELETE"),
            "groups_one_deleter"
        );
        assert_eq!(
            route_handler_name("/api/v1/auth/login", "POST"),
            "auth_login_poster"
        );
        assert_eq!(route_handler_name("/api/v1/status", "GET"), "status_getter");
    }

    #[test]
    fn section_file_carries_request_struct_and_handler() {
        let spec = spec_from(json!({
            "auth": {
                "/api/v1/auth/signup": {
                    "POST": {
                        "desc": "create a new user account",
                        "request": {
                            "email": "email",
                            "password": "str",
                            "profile_picture?": "url"
                        },
                        "responses": { "201": [{}], "409": [{}] }
                    }
                }
            }
        }));

        let files = generate_routes(&spec).unwrap();
        let (name, tokens) = &files[0];
        assert_eq!(name, "auth.rs");

        let code = tokens.to_string();
        assert!(code.contains("AuthSignupPosterRequest"));
        assert!(code.contains("profile_picture : Option < String >"));
        assert!(code.contains("auth_signup_poster"));
        assert!(code.contains("CREATED"));
    }

    #[test]
    fn registration_collects_every_route_with_poem_path_params() {
        let spec = spec_from(json!({
            "groups": {
                "/api/v1/groups/<group_id>": {
                    "GET": { "responses": { "200": [{}] } },
                    "DELETE": { "responses": { "204": [{}] } }
                }
            }
        }));

        let files = generate_routes(&spec).unwrap();
        let (name, tokens) = files.last().unwrap();
        assert_eq!(name, "mod.rs");

        let code = tokens.to_string();
        assert!(code.contains("\"/api/v1/groups/:group_id\""));
        assert!(code.contains("delete"));
        assert!(code.contains("get"));
        assert!(code.contains("pub mod groups"));
    }

    #[test]
    fn pagination_adds_paging_fields() {
        let spec = spec_from(json!({
            "groups": {
                "/api/v1/groups": {
                    "GET": {
                        "pagination": "groups",
                        "responses": { "200": [{}] }
                    }
                }
            }
        }));

        let files = generate_routes(&spec).unwrap();
        let code = files[0].1.to_string();
        assert!(code.contains("page : Option < i64 >"));
        assert!(code.contains("page_size : Option < i64 >"));
        assert!(code.contains("Query"));
    }
}
