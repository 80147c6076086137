// Wire-level response shapes returned by the backend.

use serde::{Deserialize, Serialize};

/// Outcome of a launch request.
///
/// The backend answers a launch with a plain `ok` body when every domain
/// came up, or a JSON list of per-host errors otherwise (still HTTP 200).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "errors", rename_all = "snake_case")]
pub enum LaunchResponse {
    Ok,
    Errors(Vec<String>),
}

impl LaunchResponse {
    /// Decode a launch response body.
    pub fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("ok") {
            return Self::Ok;
        }

        match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            Ok(items) if items.is_empty() => Self::Ok,
            Ok(items) => Self::Errors(
                items
                    .into_iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Err(_) => Self::Errors(vec![trimmed.to_owned()]),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}
