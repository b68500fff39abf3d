//! Rich diagnostic error types for the node recommender.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. "Not loaded" is deliberately absent
//! here: it is a valid engine state and is reported through
//! [`Lookup::NotLoaded`](crate::query::Lookup) instead.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the node recommender.
#[derive(Debug, Error, Diagnostic)]
pub enum RecError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

/// Convenience alias used throughout the crate.
pub type RecResult<T> = std::result::Result<T, RecError>;

// ---------------------------------------------------------------------------
// Statistics source errors
// ---------------------------------------------------------------------------

/// Failure while reading usage triples from a single statistics source.
///
/// During a reload these are recovered locally: the failing source is left
/// out of the new snapshot and the remaining sources are still loaded.
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("failed to read statistics source \"{source_name}\" at {path}")]
    #[diagnostic(
        code(noderec::source::io),
        help("Check that the statistics file exists and is readable.")
    )]
    Io {
        source_name: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed usage triple in \"{source_name}\" (line {line}): {message}")]
    #[diagnostic(
        code(noderec::source::parse),
        help(
            "Each record must be a JSON object with optional \"predecessor\", \
             \"node\" and \"successor\" strings and a non-negative \"count\"."
        )
    )]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("statistics source \"{source_name}\" is unavailable: {message}")]
    #[diagnostic(code(noderec::source::unavailable))]
    Unavailable { source_name: String, message: String },
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("recommendations for {count} nodes at once are not supported")]
    #[diagnostic(
        code(noderec::query::unsupported),
        help("Select no node (workflow start) or exactly one node.")
    )]
    UnsupportedQuery { count: usize },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(noderec::config::read),
        help("Ensure the config file exists, or create one with `noderec init`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(noderec::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(noderec::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("duplicate statistics source name \"{name}\"")]
    #[diagnostic(
        code(noderec::config::duplicate_source),
        help("Every [[sources]] entry needs a unique name.")
    )]
    DuplicateSource { name: String },
}

// ---------------------------------------------------------------------------
// Workflow graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    #[error("failed to read workflow file: {path}")]
    #[diagnostic(code(noderec::workflow::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow file: {path}: {message}")]
    #[diagnostic(
        code(noderec::workflow::parse),
        help("The workflow file must be JSON with \"nodes\" and \"connections\" arrays.")
    )]
    Parse { path: String, message: String },

    #[error("duplicate node instance {instance}")]
    #[diagnostic(code(noderec::workflow::duplicate_instance))]
    DuplicateInstance { instance: u32 },

    #[error("node instance {instance} not found")]
    #[diagnostic(
        code(noderec::workflow::instance_not_found),
        help("Connections and queries must reference instances listed under \"nodes\".")
    )]
    InstanceNotFound { instance: u32 },

    #[error("connection without any endpoint inside the workflow")]
    #[diagnostic(
        code(noderec::workflow::dangling_connection),
        help("At least one of \"source\" and \"dest\" must name a node instance.")
    )]
    DanglingConnection,
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("reload listener failed: {message}")]
    #[diagnostic(
        code(noderec::engine::listener),
        help(
            "A reload listener returned an error. The new snapshot is already \
             published; listeners registered after the failing one were not notified."
        )
    )]
    Listener { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_errors_convert_to_top_level() {
        let err: RecError = QueryError::UnsupportedQuery { count: 2 }.into();
        assert!(matches!(
            err,
            RecError::Query(QueryError::UnsupportedQuery { count: 2 })
        ));
        assert_eq!(
            err.to_string(),
            "recommendations for 2 nodes at once are not supported"
        );
    }

    #[test]
    fn diagnostic_codes_pass_through() {
        let err: RecError = EngineError::Listener {
            message: "boom".into(),
        }
        .into();
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("noderec::engine::listener"));
    }
}
