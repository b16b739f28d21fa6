//! The question schema: which fields to extract, how to ask for them, and
//! which primitive type each answer must coerce to.
//!
//! A [`Schema`] is built once from a validated source and never mutated
//! afterwards; the batch shares it read-only across every document. The only
//! ways to obtain one are [`Schema::validate`], [`Schema::load`],
//! [`Schema::new`] and [`Schema::example`], all of which enforce the same
//! rules: a subject, at least one question, pairwise-distinct field names, and
//! recognised type and output-mode values.
//!
//! ## Source format
//!
//! ```json
//! {
//!   "subject": "Product Manager",
//!   "output_mode": "tabular",
//!   "questions": [
//!     { "field": "candidate_name", "question": "What is the candidate's full name?" },
//!     { "field": "number_of_jobs", "question": "How many positions?", "type": "int" }
//!   ]
//! }
//! ```
//!
//! `job_role` is accepted in place of `subject`, and `output_format` (with the
//! values `csv` / `json`) in place of `output_mode`.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::info;

/// The primitive type an extracted answer is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Int,
    Float,
    Bool,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
        }
    }

    /// Parse a declared type name. Names are case-sensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(FieldType::String),
            "int" => Some(FieldType::Int),
            "float" => Some(FieldType::Float),
            "bool" => Some(FieldType::Bool),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, typed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Identifier used as the JSON key in the model response and as the
    /// output column name. Unique within a schema.
    pub field: String,
    /// Natural-language instruction, passed to the model verbatim.
    pub question: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldSpec {
    pub fn new(
        field: impl Into<String>,
        question: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        Self {
            field: field.into(),
            question: question.into(),
            field_type,
        }
    }
}

/// Which serialisation target the batch writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One CSV row per document. (default)
    #[default]
    Tabular,
    /// A JSON array of result records with native value typing.
    Structured,
}

impl OutputMode {
    /// Case-insensitive parse; `csv` and `json` are legacy aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tabular" | "csv" => Some(OutputMode::Tabular),
            "structured" | "json" => Some(OutputMode::Structured),
            _ => None,
        }
    }

    /// File extension of the output artefact.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputMode::Tabular => "csv",
            OutputMode::Structured => "json",
        }
    }
}

/// A validated, immutable question schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    subject: String,
    output_mode: OutputMode,
    questions: Vec<FieldSpec>,
}

impl Schema {
    /// Build a schema from already-typed parts, enforcing the same invariants
    /// as [`Schema::validate`].
    pub fn new(
        subject: impl Into<String>,
        output_mode: OutputMode,
        questions: Vec<FieldSpec>,
    ) -> Result<Self, SchemaError> {
        if questions.is_empty() {
            return Err(SchemaError::EmptyQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for (index, spec) in questions.iter().enumerate() {
            if spec.field.trim().is_empty() {
                return Err(SchemaError::QuestionInvalidValue { index, key: "field" });
            }
            if spec.question.trim().is_empty() {
                return Err(SchemaError::QuestionInvalidValue { index, key: "question" });
            }
            if !seen.insert(spec.field.as_str()) {
                return Err(SchemaError::DuplicateField {
                    field: spec.field.clone(),
                });
            }
        }
        Ok(Self {
            subject: subject.into(),
            output_mode,
            questions,
        })
    }

    /// Validate a raw JSON document into a schema.
    ///
    /// Stops at the first violation and reports which field and which
    /// constraint failed. No partial schema is ever returned.
    pub fn validate(raw: &Value) -> Result<Self, SchemaError> {
        let root = raw.as_object().ok_or(SchemaError::NotAnObject)?;

        let subject = match root.get("subject").or_else(|| root.get("job_role")) {
            None => return Err(SchemaError::MissingKey { key: "subject" }),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(SchemaError::NotAString { key: "subject" }),
        };

        let raw_questions = match root.get("questions") {
            None => return Err(SchemaError::MissingKey { key: "questions" }),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(SchemaError::QuestionsNotAList),
        };
        if raw_questions.is_empty() {
            return Err(SchemaError::EmptyQuestions);
        }

        let mut seen: HashSet<String> = HashSet::with_capacity(raw_questions.len());
        let mut questions = Vec::with_capacity(raw_questions.len());
        for (index, item) in raw_questions.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or(SchemaError::QuestionNotAnObject { index })?;
            let spec = parse_question(index, obj)?;
            if !seen.insert(spec.field.clone()) {
                return Err(SchemaError::DuplicateField { field: spec.field });
            }
            questions.push(spec);
        }

        let output_mode = match root.get("output_mode").or_else(|| root.get("output_format")) {
            None => OutputMode::default(),
            Some(Value::String(s)) => OutputMode::parse(s)
                .ok_or_else(|| SchemaError::InvalidOutputMode { value: s.clone() })?,
            Some(other) => {
                return Err(SchemaError::InvalidOutputMode {
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            subject,
            output_mode,
            questions,
        })
    }

    /// Read and validate a schema file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        info!("Loading schema from: {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Value = serde_json::from_str(&text)?;
        let schema = Self::validate(&raw)?;

        info!(
            "Schema loaded: subject='{}', {} questions, output={:?}",
            schema.subject,
            schema.questions.len(),
            schema.output_mode
        );
        Ok(schema)
    }

    /// Canonical JSON form. Re-validating it yields an equal schema.
    pub fn to_value(&self) -> Value {
        let questions = self
            .questions
            .iter()
            .map(|q| {
                let mut m = Map::new();
                m.insert("field".into(), Value::String(q.field.clone()));
                m.insert("question".into(), Value::String(q.question.clone()));
                m.insert("type".into(), Value::String(q.field_type.as_str().into()));
                Value::Object(m)
            })
            .collect();

        let mut root = Map::new();
        root.insert("subject".into(), Value::String(self.subject.clone()));
        root.insert(
            "output_mode".into(),
            Value::String(match self.output_mode {
                OutputMode::Tabular => "tabular".into(),
                OutputMode::Structured => "structured".into(),
            }),
        );
        root.insert("questions".into(), Value::Array(questions));
        Value::Object(root)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.questions
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|q| q.field.as_str())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// A ready-to-edit screening schema for the given role.
    pub fn example(subject: &str) -> Self {
        let q = |field: &str, question: String, t: FieldType| FieldSpec::new(field, question, t);
        let questions = vec![
            q("candidate_name", "What is the candidate's full name?".into(), FieldType::String),
            q("email", "What is the candidate's email address?".into(), FieldType::String),
            q("phone", "What is the candidate's phone number?".into(), FieldType::String),
            q(
                "total_years_experience",
                "How many total years of professional experience does the candidate have?".into(),
                FieldType::Float,
            ),
            q(
                "number_of_jobs",
                "How many different jobs/positions has the candidate held?".into(),
                FieldType::Int,
            ),
            q(
                "average_tenure_years",
                "What is the average tenure (in years) at each company the candidate has worked at?"
                    .into(),
                FieldType::Float,
            ),
            q(
                "highest_education",
                "What is the candidate's highest level of education (e.g., Bachelor's, Master's, PhD)?"
                    .into(),
                FieldType::String,
            ),
            q(
                "has_direct_role_experience",
                format!("Does the candidate have direct {subject} experience?"),
                FieldType::Bool,
            ),
            q(
                "years_role_experience",
                format!("How many years of {subject} experience does the candidate have?"),
                FieldType::Float,
            ),
            q(
                "technical_skills",
                "List the key technical skills mentioned (comma-separated)".into(),
                FieldType::String,
            ),
            q(
                "leadership_experience",
                "Does the resume demonstrate leadership experience? Provide a brief summary.".into(),
                FieldType::String,
            ),
            q(
                "role_fit_score",
                format!(
                    "On a scale of 1-10, how well does this candidate fit the {subject} role based on their experience and skills?"
                ),
                FieldType::Int,
            ),
            q(
                "key_strengths",
                format!("What are the top 3 strengths of this candidate for a {subject} role?"),
                FieldType::String,
            ),
            q(
                "potential_concerns",
                format!("What are potential concerns or gaps for this {subject} role?"),
                FieldType::String,
            ),
        ];

        Self {
            subject: subject.to_string(),
            output_mode: OutputMode::Tabular,
            questions,
        }
    }
}

fn parse_question(index: usize, obj: &Map<String, Value>) -> Result<FieldSpec, SchemaError> {
    let field = match obj.get("field") {
        None => return Err(SchemaError::QuestionMissingKey { index, key: "field" }),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => return Err(SchemaError::QuestionInvalidValue { index, key: "field" }),
    };
    let question = match obj.get("question") {
        None => return Err(SchemaError::QuestionMissingKey { index, key: "question" }),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => return Err(SchemaError::QuestionInvalidValue { index, key: "question" }),
    };
    let field_type = match obj.get("type") {
        None => FieldType::default(),
        Some(Value::String(s)) => FieldType::parse(s).ok_or_else(|| SchemaError::InvalidType {
            field: field.clone(),
            value: s.clone(),
        })?,
        Some(other) => {
            return Err(SchemaError::InvalidType {
                field,
                value: other.to_string(),
            })
        }
    };
    Ok(FieldSpec {
        field,
        question,
        field_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "subject": "Data Engineer",
            "questions": [
                { "field": "name", "question": "Full name?" },
                { "field": "years", "question": "Years of experience?", "type": "float" },
                { "field": "jobs", "question": "Number of jobs?", "type": "int" }
            ]
        })
    }

    #[test]
    fn validates_minimal_schema_with_defaults() {
        let schema = Schema::validate(&minimal()).unwrap();
        assert_eq!(schema.subject(), "Data Engineer");
        assert_eq!(schema.output_mode(), OutputMode::Tabular);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.fields()[0].field_type, FieldType::String);
        assert_eq!(schema.fields()[2].field_type, FieldType::Int);
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["name", "years", "jobs"]);
    }

    #[test]
    fn missing_subject_is_rejected() {
        let raw = json!({ "questions": [{ "field": "a", "question": "b" }] });
        assert!(matches!(
            Schema::validate(&raw),
            Err(SchemaError::MissingKey { key: "subject" })
        ));
    }

    #[test]
    fn missing_questions_is_rejected() {
        let raw = json!({ "subject": "x" });
        assert!(matches!(
            Schema::validate(&raw),
            Err(SchemaError::MissingKey { key: "questions" })
        ));
    }

    #[test]
    fn questions_must_be_a_non_empty_list() {
        let raw = json!({ "subject": "x", "questions": {} });
        assert!(matches!(Schema::validate(&raw), Err(SchemaError::QuestionsNotAList)));
        let raw = json!({ "subject": "x", "questions": [] });
        assert!(matches!(Schema::validate(&raw), Err(SchemaError::EmptyQuestions)));
    }

    #[test]
    fn question_elements_must_be_objects_with_field_and_question() {
        let raw = json!({ "subject": "x", "questions": ["name"] });
        assert!(matches!(
            Schema::validate(&raw),
            Err(SchemaError::QuestionNotAnObject { index: 0 })
        ));
        let raw = json!({
            "subject": "x",
            "questions": [{ "field": "a", "question": "q" }, { "question": "q" }]
        });
        assert!(matches!(
            Schema::validate(&raw),
            Err(SchemaError::QuestionMissingKey { index: 1, key: "field" })
        ));
        let raw = json!({ "subject": "x", "questions": [{ "field": "a" }] });
        assert!(matches!(
            Schema::validate(&raw),
            Err(SchemaError::QuestionMissingKey { index: 0, key: "question" })
        ));
    }

    #[test]
    fn duplicate_fields_rejected_at_any_position() {
        for dup_at in 1..4 {
            let mut questions: Vec<Value> = (0..4)
                .map(|i| json!({ "field": format!("f{i}"), "question": "q" }))
                .collect();
            questions[dup_at] = json!({ "field": "f0", "question": "again" });
            let raw = json!({ "subject": "x", "questions": questions });
            match Schema::validate(&raw) {
                Err(SchemaError::DuplicateField { field }) => assert_eq!(field, "f0"),
                other => panic!("expected duplicate error, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_type_names_the_offending_value() {
        let raw = json!({
            "subject": "x",
            "questions": [{ "field": "age", "question": "q", "type": "integer" }]
        });
        match Schema::validate(&raw) {
            Err(SchemaError::InvalidType { field, value }) => {
                assert_eq!(field, "age");
                assert_eq!(value, "integer");
            }
            other => panic!("expected invalid type, got {other:?}"),
        }
    }

    #[test]
    fn output_mode_is_case_insensitive_and_accepts_legacy_names() {
        let mut raw = minimal();
        raw["output_mode"] = json!("STRUCTURED");
        assert_eq!(Schema::validate(&raw).unwrap().output_mode(), OutputMode::Structured);

        let mut raw = minimal();
        raw["output_format"] = json!("Json");
        assert_eq!(Schema::validate(&raw).unwrap().output_mode(), OutputMode::Structured);

        let mut raw = minimal();
        raw["output_format"] = json!("csv");
        assert_eq!(Schema::validate(&raw).unwrap().output_mode(), OutputMode::Tabular);

        let mut raw = minimal();
        raw["output_mode"] = json!("xml");
        assert!(matches!(
            Schema::validate(&raw),
            Err(SchemaError::InvalidOutputMode { .. })
        ));
    }

    #[test]
    fn job_role_is_an_alias_for_subject() {
        let raw = json!({
            "job_role": "Designer",
            "questions": [{ "field": "a", "question": "q" }]
        });
        assert_eq!(Schema::validate(&raw).unwrap().subject(), "Designer");
    }

    #[test]
    fn validate_is_idempotent_on_canonical_form() {
        let mut raw = minimal();
        raw["output_format"] = json!("json");
        let first = Schema::validate(&raw).unwrap();
        let second = Schema::validate(&first.to_value()).unwrap();
        assert_eq!(first, second);
        let example = Schema::example("Product Manager");
        assert_eq!(Schema::validate(&example.to_value()).unwrap(), example);
    }

    #[test]
    fn new_rejects_empty_and_duplicates() {
        assert!(matches!(
            Schema::new("x", OutputMode::Tabular, vec![]),
            Err(SchemaError::EmptyQuestions)
        ));
        let dup = vec![
            FieldSpec::new("a", "q1", FieldType::String),
            FieldSpec::new("a", "q2", FieldType::Int),
        ];
        assert!(matches!(
            Schema::new("x", OutputMode::Tabular, dup),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn load_reports_read_and_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.json");
        assert!(matches!(Schema::load(&missing), Err(SchemaError::Read { .. })));

        std::fs::write(&missing, "{ not json").unwrap();
        assert!(matches!(Schema::load(&missing), Err(SchemaError::Parse(_))));

        std::fs::write(&missing, minimal().to_string()).unwrap();
        assert_eq!(Schema::load(&missing).unwrap().len(), 3);
    }

    #[test]
    fn example_schema_mentions_subject() {
        let schema = Schema::example("Nurse");
        assert_eq!(schema.len(), 14);
        assert!(schema
            .fields()
            .iter()
            .any(|f| f.question.contains("Nurse role")));
    }
}
