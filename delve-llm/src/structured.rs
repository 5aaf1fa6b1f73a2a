//! Structured output helpers
//!
//! Models are asked for a bare JSON object; replies are still scanned for a
//! fenced block or the outermost braces, since providers often wrap them.

use crate::model::ChatModel;
use delve_core::{validation_error, DelveResult};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use tracing::debug;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid regex")
});

/// Pull the first JSON object out of a model reply and deserialize it
pub fn extract_json<T: DeserializeOwned>(text: &str) -> DelveResult<T> {
    let candidate = if let Some(captures) = FENCED_JSON.captures(text) {
        captures.get(1).map(|m| m.as_str())
    } else {
        match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => Some(&text[start..=end]),
            _ => None,
        }
    };

    let json = candidate.ok_or_else(|| {
        validation_error!("No JSON object found in model output", "output", "structured")
    })?;

    Ok(serde_json::from_str(json)?)
}

/// Call `model` with `prompt` and parse the reply as `T`
///
/// `format_hint` describes the expected object, e.g. a one-line JSON example.
pub async fn generate_json<T: DeserializeOwned>(
    model: &dyn ChatModel,
    prompt: &str,
    format_hint: &str,
) -> DelveResult<T> {
    let full_prompt = format!(
        "{}\n\nRespond with a single JSON object and nothing else, matching this format:\n{}",
        prompt, format_hint
    );

    let reply = model.complete(&full_prompt).await?;
    debug!(
        provider = %model.provider(),
        model = model.model(),
        chars = reply.len(),
        "Parsing structured output"
    );

    extract_json(&reply)
}
