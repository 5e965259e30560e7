//! Rich diagnostic error types for the conjoint engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes, help text, and source chains. Note the
//! propagation policy of the search: an ontology failure invalidates only
//! the disjoint case that triggered the query, never the whole search, so
//! most [`OntologyError`]s surface as debug logs rather than results.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the conjoint engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ConjointError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Expand(#[from] ExpandError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),
}

// ---------------------------------------------------------------------------
// Ontology boundary errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("ontology query failed: {message}")]
    #[diagnostic(
        code(conjoint::ontology::boundary),
        help(
            "The ontology collaborator errored or timed out. The affected \
             disjoint case is discarded and the search continues; apply \
             timeout/retry policy at the connection layer if this recurs."
        )
    )]
    Boundary { message: String },

    #[error("unknown concept: {concept}")]
    #[diagnostic(
        code(conjoint::ontology::unknown_concept),
        help(
            "The concept identifier is not present in the ontology. Check \
             that the mapping heuristics emit identifiers from the same \
             ontology snapshot the engine queries."
        )
    )]
    UnknownConcept { concept: u64 },
}

// ---------------------------------------------------------------------------
// Expansion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExpandError {
    #[error("expansion depth exceeded maximum of {max_depth}")]
    #[diagnostic(
        code(conjoint::expand::depth_exceeded),
        help(
            "A partial assertion kept producing unresolved sub-terms past \
             the recursion bound. The offending branch is dropped; raise \
             `max_expansion_depth` only if the mapping chain is genuinely \
             that deep."
        )
    )]
    DepthExceeded { max_depth: usize },

    #[error("invalid assertion weight {weight}: must be in (0, 1]")]
    #[diagnostic(
        code(conjoint::expand::invalid_weight),
        help(
            "Candidate assertion weights are relative confidences in (0, 1]. \
             Normalize heuristic scores before handing them to the engine."
        )
    )]
    InvalidWeight { weight: f32 },

    #[error("mapper failed on term \"{term}\": {message}")]
    #[diagnostic(
        code(conjoint::expand::mapper),
        help(
            "The mapping collaborator could not produce candidates for an \
             ambiguous term. The term's branch is dropped from the grid."
        )
    )]
    Mapper { term: String, message: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(conjoint::engine::invalid_config),
        help("Check the DisambigConfig fields. {message}")
    )]
    InvalidConfig { message: String },
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("serialization error: {message}")]
    #[diagnostic(
        code(conjoint::export::serialization),
        help("Failed to serialize disambiguation results to JSON.")
    )]
    Serialization { message: String },
}

/// Convenience alias for functions returning conjoint results.
pub type ConjointResult<T> = std::result::Result<T, ConjointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ontology_error_converts_to_conjoint_error() {
        let err = OntologyError::Boundary {
            message: "connection reset".into(),
        };
        let top: ConjointError = err.into();
        assert!(matches!(
            top,
            ConjointError::Ontology(OntologyError::Boundary { .. })
        ));
    }

    #[test]
    fn expand_error_converts_to_conjoint_error() {
        let err = ExpandError::DepthExceeded { max_depth: 8 };
        let top: ConjointError = err.into();
        assert!(matches!(
            top,
            ConjointError::Expand(ExpandError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ExpandError::InvalidWeight { weight: -0.5 };
        let msg = format!("{err}");
        assert!(msg.contains("-0.5"));

        let err = OntologyError::UnknownConcept { concept: 99 };
        assert!(format!("{err}").contains("99"));
    }
}
