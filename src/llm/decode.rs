use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which decode attempt produced the raw label strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelDecoding {
    /// `["a", "b"]`
    JsonArray,
    /// `{"labels": ["a", "b"]}`
    LabelsObject,
    /// Non-JSON text split on commas and newlines
    Delimited,
    /// Valid JSON of some other shape
    Unrecognized,
}

/// Raw label strings decoded from a classifier response, not yet whitelisted
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLabels {
    pub strategy: LabelDecoding,
    pub labels: Vec<String>,
}

#[derive(Deserialize)]
struct LabelsObject {
    labels: Vec<Value>,
}

/// Strings only; any other element can never be a whitelisted id
fn strings(values: Vec<Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn split_delimited(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(|s| s.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '[' | ']' | '`')).trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decode a classifier response with an ordered list of typed attempts:
/// strict JSON array, then `{labels: [...]}`, then delimited text when the
/// response is not JSON at all
pub fn decode_labels(raw: &str) -> DecodedLabels {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return DecodedLabels {
            strategy: LabelDecoding::Delimited,
            labels: split_delimited(raw),
        };
    };

    if let Ok(items) = serde_json::from_value::<Vec<Value>>(value.clone()) {
        return DecodedLabels {
            strategy: LabelDecoding::JsonArray,
            labels: strings(items),
        };
    }

    if let Ok(object) = serde_json::from_value::<LabelsObject>(value) {
        return DecodedLabels {
            strategy: LabelDecoding::LabelsObject,
            labels: strings(object.labels),
        };
    }

    DecodedLabels {
        strategy: LabelDecoding::Unrecognized,
        labels: Vec::new(),
    }
}

/// Strict request-extraction payload
#[derive(Debug, Clone, Deserialize)]
pub struct RequestsPayload {
    pub requests: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Decode `{requests: string[], notes?}`; anything else is an error
pub fn decode_requests(raw: &str) -> Result<RequestsPayload, serde_json::Error> {
    serde_json::from_str(raw)
}
