//! Field extraction and sanitization

use super::js_scripts::METADATA_SCRIPT;
use super::schema::RawPageFields;
use crate::browser::{BrowserError, BrowserResult, BrowserSession};

/// Collapse whitespace runs to a single space and trim both ends
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run the metadata query against the loaded document
///
/// # Errors
/// Returns error if script evaluation fails or its result does not have the
/// expected shape.
pub async fn extract_metadata(session: &mut dyn BrowserSession) -> BrowserResult<RawPageFields> {
    let value = session.evaluate(METADATA_SCRIPT).await?;

    if value.is_null() {
        return Ok(RawPageFields::default());
    }

    serde_json::from_value(value)
        .map_err(|e| BrowserError::EvaluationFailed(format!("unexpected metadata shape: {e}")))
}
