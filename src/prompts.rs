//! Extraction prompt rendering.
//!
//! The prompt is rendered from the schema alone, so it can be inspected and
//! tested without a model in the loop. The response-format rules stated here
//! are the contract the [`crate::coerce`] module relies on: a bare JSON
//! object, unquoted numbers, `null` for missing information and plain-ASCII
//! free text that survives the CSV sink.

use crate::schema::FieldSpec;
use std::fmt::Write as _;

/// Opening instruction. `{subject}` is substituted by [`build_extraction_prompt`].
pub const PROMPT_HEADER: &str = r#"You are analyzing a resume/CV for the position of: {subject}

The images provided show all pages of the candidate's resume. Please analyze the resume carefully and extract the following information.

IMPORTANT: You must respond with ONLY a valid JSON object. Do not include any explanatory text before or after the JSON.

Extract the following fields:
"#;

/// Response-format rules appended after the field list.
pub const RESPONSE_FORMAT_RULES: &str = r#"
Response format requirements:
1. Return ONLY a JSON object with the exact field names specified above
2. For numeric fields (int/float), use actual numbers, not strings
3. For bool fields, use true or false
4. For string fields, provide concise answers using plain text only
5. If information is not available in the resume, use null for that field
6. Do not add any explanatory text outside the JSON object
7. CRITICAL: Use only plain ASCII text - no bullet points, no special unicode characters, no smart quotes, no long dashes
8. Use regular dashes (-), regular quotes ("), and numbered lists (1. 2. 3.) instead of bullets

Example response format:
{
  "field_name_1": value1,
  "field_name_2": value2,
  ...
}
"#;

/// Render the extraction prompt for `subject` and `fields`.
///
/// One directive per field, in schema order, naming the field identifier, its
/// declared type and the question text verbatim.
pub fn build_extraction_prompt(subject: &str, fields: &[FieldSpec]) -> String {
    let mut prompt = PROMPT_HEADER.replace("{subject}", subject);
    for spec in fields {
        // Writing into a String cannot fail.
        let _ = write!(
            prompt,
            "\n- {} ({}): {}",
            spec.field, spec.field_type, spec.question
        );
    }
    prompt.push('\n');
    prompt.push_str(RESPONSE_FORMAT_RULES);
    prompt
}
