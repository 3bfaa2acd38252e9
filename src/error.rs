use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Fatal generation errors. Every variant aborts the whole run before any
/// output file is written.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("malformed schema: {reason}")]
    MalformedSchema { reason: String },

    #[error("unknown type: table '{table}' attribute '{attribute}' has unmapped type '{data_type}'")]
    UnknownType {
        table: String,
        attribute: String,
        data_type: String,
    },

    #[error("dangling reference: table '{table}' attribute '{attribute}' points at unknown table id {target}")]
    DanglingReference {
        table: String,
        attribute: String,
        target: u64,
    },

    #[error("ambiguous association: table '{table}' must have exactly two foreign key attributes, found {found}")]
    AmbiguousAssociation { table: String, found: usize },

    #[error("generated source for '{path}' does not parse: {reason}")]
    Render { path: String, reason: String },

    #[error("unreadable input document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
