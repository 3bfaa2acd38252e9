use serde_derive::Serialize;
use std::collections::BTreeMap;

use crate::error::{GeneratorError, Result};

#[derive(Serialize)]
pub struct TomlStructure {
    package: BTreeMap<String, String>,
    dependencies: BTreeMap<String, DependencyInfo>,
}

#[derive(Serialize)]
pub struct DependencyInfo {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

impl TomlStructure {
    pub fn new(name: String) -> Self {
        let mut package: BTreeMap<String, String> = BTreeMap::new();

        package.insert("name".into(), name);
        package.insert("version".into(), "0.1.0".into());
        package.insert("edition".into(), "2021".into());

        let mut dependencies: BTreeMap<String, DependencyInfo> = BTreeMap::new();
        dependencies.insert(
            "sea-orm".into(),
            DependencyInfo {
                version: "1.1.0".into(),
                features: Some(vec![
                    "sqlx-sqlite".into(),
                    "runtime-tokio-native-tls".into(),
                    "macros".into(),
                ]),
            },
        );
        dependencies.insert(
            "poem".into(),
            DependencyInfo {
                version: "3.1.0".into(),
                features: None,
            },
        );
        dependencies.insert(
            "tokio".into(),
            DependencyInfo {
                version: "1.40.0".into(),
                features: Some(vec!["macros".into(), "rt-multi-thread".into()]),
            },
        );
        dependencies.insert(
            "serde".into(),
            DependencyInfo {
                version: "1.0".into(),
                features: Some(vec!["derive".into()]),
            },
        );
        dependencies.insert(
            "serde_json".into(),
            DependencyInfo {
                version: "1.0".into(),
                features: None,
            },
        );
        dependencies.insert(
            "chrono".into(),
            DependencyInfo {
                version: "0.4".into(),
                features: None,
            },
        );

        Self {
            package,
            dependencies,
        }
    }
}

/// Render the generated crate's manifest.
pub fn render_toml(name: &str) -> Result<String> {
    let data = TomlStructure::new(name.to_string());

    toml::to_string_pretty(&data).map_err(|e| GeneratorError::Render {
        path: "Cargo.toml".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_names_the_generated_package_and_stack() {
        let manifest = render_toml("quiz_quickie").unwrap();

        assert!(manifest.contains("name = \"quiz_quickie\""));
        assert!(manifest.contains("[dependencies.sea-orm]"));
        assert!(manifest.contains("[dependencies.poem]"));
        assert!(manifest.contains("[dependencies.chrono]"));
    }

    #[test]
    fn manifest_is_deterministic() {
        assert_eq!(
            render_toml("generated").unwrap(),
            render_toml("generated").unwrap()
        );
    }
}
