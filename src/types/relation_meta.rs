#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    /// Two-letter cardinality code embedded in association table names.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "oo" => Some(Self::OneToOne),
            "mo" => Some(Self::ManyToOne),
            "om" => Some(Self::OneToMany),
            "mm" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    /// The same relationship seen from the other endpoint.
    pub fn inverse(self) -> Self {
        match self {
            Self::OneToOne => Self::OneToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToMany => Self::ManyToMany,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RelationEnd {
    pub table_id: u64,
    pub table_name: String,
    pub attribute_id: u64,
}

/// Relationship wiring through a junction module rather than a direct
/// foreign key column. Variant names refer to the junction's Relation enum.
#[derive(Clone, Debug)]
pub struct ViaJunction {
    pub module: String,
    pub self_variant: String,
    pub other_variant: String,
}

/// One recording of a relationship edge. Every logical edge is recorded in
/// the adjacency lists of both endpoint tables; `from` is always the table
/// whose list the recording sits in, and `origin` marks the recording on
/// the side that owns the forward edge and produces the deferred inverse.
#[derive(Clone, Debug)]
pub struct RelationMeta {
    pub kind: RelationKind,
    pub from: RelationEnd,
    pub to: RelationEnd,
    pub origin: bool,
    pub fk_column: Option<String>,
    pub via: Option<ViaJunction>,
}
