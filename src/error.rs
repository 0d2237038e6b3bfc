//! Compile-time error definitions.
//!
//! Every failure raised while compiling routes or handler chains is fatal for
//! the whole compilation unit: no partial dispatch table or artifact is ever
//! returned alongside one of these.

use thiserror::Error;

/// Errors raised while compiling routes, handler chains or their configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No routes were declared.
    #[error("At least one route must be declared")]
    EmptyRoutes,

    /// The last route is not the `/` catch-all.
    #[error("The default route must use path pattern '/', found '{found}'")]
    MissingDefaultRoute { found: String },

    /// A route other than the last one uses the `/` catch-all pattern.
    #[error("Path pattern '/' is reserved for the last route, found at position {index}")]
    DefaultRouteNotLast { index: usize },

    /// Two routes share the same path pattern.
    #[error("Duplicate path pattern '{pattern}'")]
    DuplicatePathPattern { pattern: String },

    /// A path pattern is not acceptable for its route kind.
    #[error("Invalid path pattern '{pattern}': {reason}")]
    InvalidPathPattern { pattern: String, reason: String },

    /// Both storage location references were supplied for one route.
    #[error("Route '{pattern}': either 's3_location' or 's3_folder' must be specified, not both")]
    AmbiguousStorageLocation { pattern: String },

    /// Neither storage location reference was supplied for one route.
    #[error("Route '{pattern}': either 's3_location' or 's3_folder' must be specified")]
    MissingStorageLocation { pattern: String },

    /// A storage key prefix starts or ends with a slash.
    #[error("Invalid storage path '{path}': must not start or end with '/'")]
    InvalidStoragePath { path: String },

    /// A storage route references an artifact store that is not declared.
    #[error("Unknown artifact store '{store}'")]
    UnknownStore { store: String },

    /// An origin address could not be interpreted.
    #[error("Invalid origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    /// A compiler option is out of range.
    #[error("Option '{option}' is invalid: {reason}")]
    InvalidOption { option: String, reason: String },

    /// A handler name is not present in the catalog.
    #[error("Unknown handler '{name}'")]
    UnknownHandler { name: String },

    /// A required handler parameter was not supplied.
    #[error("Handler '{handler}' requires parameter '{parameter}'")]
    MissingParameter { handler: String, parameter: String },

    /// A handler parameter is not understood by the handler.
    #[error("Handler '{handler}' does not accept parameter '{parameter}'")]
    UnexpectedParameter { handler: String, parameter: String },

    /// A handler parameter has the wrong type or an invalid value.
    #[error("Handler '{handler}' parameter '{parameter}' is invalid: {reason}")]
    InvalidParameter {
        handler: String,
        parameter: String,
        reason: String,
    },

    /// The number of regex capture groups and replacements differ.
    #[error("Pattern '{pattern}' has {groups} capture groups but {replacements} replacements were given")]
    ReplacementCountMismatch {
        pattern: String,
        groups: usize,
        replacements: usize,
    },

    /// A handler was placed in a chain of the other event type.
    #[error("Handler '{handler}' runs on {expected} but chain '{chain}' is {actual}")]
    PhaseMismatch {
        chain: String,
        handler: String,
        expected: String,
        actual: String,
    },

    /// The same handler name appears twice in one chain.
    #[error("Handler '{name}' is used more than once in chain '{chain}'")]
    DuplicateHandler { chain: String, name: String },

    /// Two routes produce edge functions with the same name but different code.
    #[error("Edge function name '{name}' is generated by more than one route with different code")]
    FunctionNameCollision { name: String },

    /// The chain was already compiled and can no longer be modified.
    #[error("Chain '{chain}' has already been compiled")]
    ChainFrozen { chain: String },
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, ConfigurationError>;
