//! Export types for serializing disambiguation results.
//!
//! These types provide human-readable, label-resolved representations
//! of assertions and cases suitable for JSON export.

use serde::{Deserialize, Serialize};

use crate::assertion::ConcreteAssertion;
use crate::concept::ConceptId;
use crate::error::ExportError;
use crate::ontology::Ontology;
use crate::search::CaseResult;

/// Exported assertion with resolved labels for all positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionExport {
    /// Numeric relation ID.
    pub relation_id: u64,
    /// Relation label.
    pub relation_label: String,
    /// Argument IDs, in position order.
    pub arg_ids: Vec<u64>,
    /// Argument labels, in position order.
    pub arg_labels: Vec<String>,
    /// Grid weight the assertion was accepted at (0 for inferred
    /// constraints).
    pub weight: f32,
    /// Heuristic that produced the assertion.
    pub heuristic: String,
    /// Source the heuristic drew from, when known.
    pub source: Option<String>,
}

/// Exported case: one consistent interpretation of a concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseExport {
    /// Focus concept ID.
    pub focus_id: u64,
    /// Focus concept label.
    pub focus_label: String,
    /// Interpreted standing ("Collection" or "Individual").
    pub standing: String,
    /// Case confidence in [0, 1].
    pub weight: f32,
    /// Accepted assertions, in acceptance order.
    pub assertions: Vec<AssertionExport>,
}

fn resolve(ontology: &dyn Ontology, concept: ConceptId) -> String {
    ontology
        .label(concept)
        .unwrap_or_else(|| concept.to_string())
}

fn export_assertion(
    ontology: &dyn Ontology,
    assertion: &ConcreteAssertion,
    weight: f32,
) -> AssertionExport {
    AssertionExport {
        relation_id: assertion.relation.get(),
        relation_label: resolve(ontology, assertion.relation),
        arg_ids: assertion.args.iter().map(|c| c.get()).collect(),
        arg_labels: assertion.args.iter().map(|&c| resolve(ontology, c)).collect(),
        weight,
        heuristic: assertion.provenance.heuristic.clone(),
        source: assertion.provenance.source.clone(),
    }
}

/// Resolve one case against the ontology's labels.
pub fn export_case(ontology: &dyn Ontology, focus: ConceptId, case: &CaseResult) -> CaseExport {
    let assertions = case
        .assertions
        .iter()
        .zip(&case.assertion_weights)
        .map(|(assertion, &weight)| export_assertion(ontology, assertion, weight))
        .collect();
    CaseExport {
        focus_id: focus.get(),
        focus_label: resolve(ontology, focus),
        standing: case.standing.to_string(),
        weight: case.weight,
        assertions,
    }
}

/// Resolve a ranked list of cases against the ontology's labels.
pub fn export_cases(
    ontology: &dyn Ontology,
    focus: ConceptId,
    cases: &[CaseResult],
) -> Vec<CaseExport> {
    cases
        .iter()
        .map(|case| export_case(ontology, focus, case))
        .collect()
}

/// Serialize exported cases to pretty-printed JSON.
pub fn cases_to_json(cases: &[CaseExport]) -> Result<String, ExportError> {
    serde_json::to_string_pretty(cases).map_err(|e| ExportError::Serialization {
        message: e.to_string(),
    })
}
