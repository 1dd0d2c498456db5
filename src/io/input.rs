use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::models::Label;

/// Read a plain-text transcript
pub fn read_transcript(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
}

/// Ground-truth file next to a transcript: `call.txt` -> `call.json`
pub fn ground_truth_path(transcript: &Path) -> PathBuf {
    transcript.with_extension("json")
}

/// Accepted ground-truth layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum GroundTruth {
    Labels { labels: Vec<Value> },
    Entries(Vec<Value>),
}

fn entry_label(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("task_type").and_then(Value::as_str),
        _ => None,
    }
}

/// Extract true labels from `[{task_type}]`, `[label]` or `{labels: [...]}`
///
/// Non-whitelisted entries are dropped and repeats collapsed; unparsable input
/// yields no labels.
pub fn parse_ground_truth(json: &str) -> Vec<Label> {
    let entries = match serde_json::from_str::<GroundTruth>(json) {
        Ok(GroundTruth::Labels { labels }) => labels,
        Ok(GroundTruth::Entries(entries)) => entries,
        Err(e) => {
            warn!("Unrecognized ground truth: {}", e);
            return Vec::new();
        }
    };

    let mut labels = Vec::new();
    for label in entries.iter().filter_map(entry_label).filter_map(Label::parse) {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Ground truth from disk, `None` if the file cannot be read
pub fn read_ground_truth(path: &Path) -> Option<Vec<Label>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(parse_ground_truth(&content)),
        Err(e) => {
            warn!("No ground truth at {:?}: {}", path, e);
            None
        }
    }
}
