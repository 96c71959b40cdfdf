//! Mapping vocabulary used by the bundled and external Turtle documents.

/// Namespace of the mapping predicates.
pub const EX_NS: &str = "http://example.org/ontology#";

/// GraphQL field a concept maps to.
pub const MAPS_TO_FIELD: &str = "mapsToField";
/// Argument key selecting a target entity, e.g. `login`.
pub const IDENTIFIER_ARGUMENT: &str = "identifierArgument";
/// GraphQL type tag of a sub-entity.
pub const MAPS_TO_GRAPHQL_TYPE: &str = "mapsToGraphQLType";
/// Argument carrying the ordering input object, e.g. `orderBy`.
pub const MAPS_TO_ARGUMENT_FIELD: &str = "mapsToArgumentField";
/// Enum value of the ordering field, e.g. `STARGAZERS`.
pub const MAPS_TO_ORDERING_FIELD: &str = "mapsToOrderingField";
/// Enum value of the sort direction, e.g. `DESC`.
pub const DEFAULT_DIRECTION: &str = "defaultDirection";

/// `PREFIX` header shared by every mapping query.
pub fn prefixes() -> String {
    format!(
        "PREFIX ex: <{EX_NS}>\nPREFIX rdfs: <{}>\n",
        crate::sparql::RDFS_NS
    )
}
