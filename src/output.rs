//! Result types produced by the extraction pipeline.
//!
//! An [`ExtractionResult`] is created exactly once per document and never
//! mutated: success and failure are both terminal. A [`BatchSummary`] is
//! derived from a finished sequence of results and is never maintained as a
//! running total.

use crate::coerce::FieldValues;
use crate::error::DocumentError;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

/// Terminal state of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Pages sent and tokens billed for one document.
///
/// All zero when the document failed before the model was called.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Usage {
    pub pages_processed: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Cost in USD.
    pub cost: f64,
}

/// The outcome of extracting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    document_id: String,
    outcome: Outcome,
    pages_processed: usize,
    input_tokens: u64,
    output_tokens: u64,
    cost: f64,
    values: FieldValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl ExtractionResult {
    pub fn success(document_id: impl Into<String>, values: FieldValues, usage: Usage) -> Self {
        Self {
            document_id: document_id.into(),
            outcome: Outcome::Success,
            pages_processed: usage.pages_processed,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost: usage.cost,
            values,
            error_message: None,
        }
    }

    /// A failed document: every schema field present and null.
    pub fn failure(
        document_id: impl Into<String>,
        schema: &Schema,
        error: &DocumentError,
        usage: Usage,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            outcome: Outcome::Failure,
            pages_processed: usage.pages_processed,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost: usage.cost,
            values: FieldValues::nulls(schema),
            error_message: Some(error.to_string()),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn pages_processed(&self) -> usize {
        self.pages_processed
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Batch-level accounting derived from the per-document results.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchSummary {
    pub total_documents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_cost: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// `total_cost / total_documents`, or zero for an empty batch.
    pub average_cost: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[ExtractionResult]) -> Self {
        let total_documents = results.len();
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let total_cost: f64 = results.iter().map(|r| r.cost).sum();
        Self {
            total_documents,
            succeeded,
            failed: total_documents - succeeded,
            total_cost,
            total_input_tokens: results.iter().map(|r| r.input_tokens).sum(),
            total_output_tokens: results.iter().map(|r| r.output_tokens).sum(),
            average_cost: if total_documents == 0 {
                0.0
            } else {
                total_cost / total_documents as f64
            },
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens + self.total_output_tokens
    }
}
