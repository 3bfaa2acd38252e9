use proc_macro2::TokenStream;
use quote::quote;

/// Target column type descriptor resolved from an ERD attribute's abstract
/// `dataType`/`dataTypeSize` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text { length: u32 },
    Date,
    Custom(String),
    /// Sentinel for combinations the mapper does not recognize. Synthesis
    /// treats it as fatal instead of emitting invalid code.
    Unknown,
}

pub fn column_mapping(data_type: &str, data_type_size: Option<&str>) -> ColumnKind {
    match (data_type, data_type_size) {
        ("int", None | Some("")) => ColumnKind::Integer,
        ("float", None | Some("")) => ColumnKind::Float,
        ("charn" | "varcharn", Some(size)) => match size.parse::<u32>() {
            Ok(length) => ColumnKind::Text { length },
            Err(_) => ColumnKind::Unknown,
        },
        ("date", None | Some("")) => ColumnKind::Date,
        ("custom", Some(sql_type)) if !sql_type.is_empty() => {
            ColumnKind::Custom(sql_type.to_string())
        }
        _ => ColumnKind::Unknown,
    }
}

impl ColumnKind {
    /// Rust type of the generated model field, in terms of the sea-orm
    /// entity prelude. `None` for the unknown sentinel.
    pub fn rs_type(&self) -> Option<TokenStream> {
        match self {
            ColumnKind::Integer => Some(quote!(i32)),
            ColumnKind::Float => Some(quote!(f32)),
            ColumnKind::Text { .. } => Some(quote!(String)),
            ColumnKind::Date => Some(quote!(Date)),
            ColumnKind::Custom(_) => Some(quote!(String)),
            ColumnKind::Unknown => None,
        }
    }

    /// Explicit `column_type` override for the sea-orm attribute, where the
    /// Rust type alone does not pin down the SQL column.
    pub fn column_type_override(&self) -> Option<String> {
        match self {
            ColumnKind::Text { length } => Some(format!("String(StringLen::N({length}))")),
            ColumnKind::Custom(sql_type) => Some(format!("custom(\"{sql_type}\")")),
            _ => None,
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnKind::Date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_plain_integer() {
        assert_eq!(column_mapping("int", None), ColumnKind::Integer);
        assert_eq!(column_mapping("int", Some("")), ColumnKind::Integer);
    }

    #[test]
    fn maps_bounded_string_with_length() {
        assert_eq!(
            column_mapping("varcharn", Some("20")),
            ColumnKind::Text { length: 20 }
        );
        assert_eq!(
            column_mapping("charn", Some("8")),
            ColumnKind::Text { length: 8 }
        );
    }

    #[test]
    fn passes_custom_type_through_verbatim() {
        assert_eq!(
            column_mapping("custom", Some("VARBINARY(60)")),
            ColumnKind::Custom("VARBINARY(60)".to_string())
        );
    }

    #[test]
    fn unrecognized_pairs_are_unknown() {
        assert_eq!(column_mapping("blob", None), ColumnKind::Unknown);
        assert_eq!(column_mapping("varcharn", None), ColumnKind::Unknown);
        assert_eq!(column_mapping("varcharn", Some("wide")), ColumnKind::Unknown);
        assert_eq!(column_mapping("int", Some("4")), ColumnKind::Unknown);
        assert!(ColumnKind::Unknown.rs_type().is_none());
    }

    #[test]
    fn happy_path_is_total() {
        for kind in [
            column_mapping("int", None),
            column_mapping("float", None),
            column_mapping("varcharn", Some("128")),
            column_mapping("date", None),
            column_mapping("custom", Some("TEXT")),
        ] {
            assert!(kind.rs_type().is_some());
        }
    }
}
