//! Error types for SQB.

use thiserror::Error;

/// The main error type for SQB operations.
///
/// Every variant is raised while the query is being constructed or built,
/// never later. None of them are retried.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The builder was asked for a query without a root entity.
    #[error("Main entity type was not set for the query builder")]
    MissingRootEntity,

    /// The entity is not registered in the schema catalog.
    #[error("Unknown entity: '{0}'")]
    UnknownEntity(String),

    /// An include/then-include call that cannot be joined.
    #[error("Invalid include chain: {0}")]
    InvalidInclude(#[from] IncludeError),

    /// A selector names a field the entity does not declare, or an entity
    /// that is not part of the query.
    #[error("Unsupported expression for a database field: {entity}.{field} ({reason})")]
    UnresolvedField {
        entity: String,
        field: String,
        reason: &'static str,
    },

    /// The expression shape cannot be translated into a predicate.
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A method call other than contains/starts_with/ends_with.
    #[error("Unsupported string method: {0}")]
    UnsupportedMethod(String),

    /// A top-level filter that is not a boolean condition.
    #[error("Unsupported top-level expression: {0}")]
    UnsupportedTopLevel(String),

    /// Skip/take without any sort key.
    #[error("ORDER BY required for paging: call order_by_asc/order_by_desc before skip/take/page")]
    OrderByRequiredForPaging,

    /// A field type name with no known SQL type mapping.
    #[error("Unsupported field type: '{0}'")]
    UnmappedType(String),

    /// Failed to parse a textual filter, selector or sort key.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Configuration or catalog document error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The ways an include edge can fail to join.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncludeError {
    /// `then_include` with no prior `include`.
    #[error("then_include must be called after an include")]
    NoPriorInclude,

    /// `include` whose source is not the root entity.
    #[error("include must start at the root entity '{root}', got '{entity}'; use then_include")]
    NotRoot { root: String, entity: String },

    /// The edge's source type has no alias yet.
    #[error(
        "cannot join from '{entity}' as it has not been included in the query; check the include/then_include order"
    )]
    SourceNotJoined { entity: String },

    /// The selected field does not exist on the source type.
    #[error("property '{field}' not found on '{entity}'")]
    MissingField { entity: String, field: String },

    /// The selected field exists but carries no foreign-key declaration.
    #[error("property '{field}' on '{entity}' does not declare a foreign key")]
    MissingForeignKey { entity: String, field: String },
}

impl QueryError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create an unresolved-field error.
    pub fn unresolved(entity: &str, field: &str, reason: &'static str) -> Self {
        Self::UnresolvedField {
            entity: entity.to_string(),
            field: field.to_string(),
            reason,
        }
    }
}

/// Result type alias for SQB operations.
pub type SqbResult<T> = Result<T, QueryError>;
