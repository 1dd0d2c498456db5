use serde::{Deserialize, Serialize};

/// An offset range into the cleaned transcript asserted to support a label or entity
///
/// Offsets are UTF-8 byte offsets, `start` inclusive and `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub start: usize,
    pub end: usize,
    /// Snapshot of the covered text at extraction time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl EvidenceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: None,
        }
    }

    /// Build a span carrying a snapshot of `source[start..end]`
    ///
    /// Returns `None` when the range is empty, out of bounds or splits a character.
    pub fn snapshot(source: &str, start: usize, end: usize) -> Option<Self> {
        if start >= end {
            return None;
        }
        source.get(start..end).map(|text| Self {
            start,
            end,
            text: Some(text.to_string()),
        })
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_bounds() {
        let text = "update my Adresse";
        let span = EvidenceSpan::snapshot(text, 10, 17).unwrap();
        assert_eq!(span.text.as_deref(), Some("Adresse"));
        assert_eq!(span.len(), 7);

        assert!(EvidenceSpan::snapshot(text, 5, 5).is_none());
        assert!(EvidenceSpan::snapshot(text, 10, 40).is_none());
    }

    #[test]
    fn test_snapshot_rejects_split_char() {
        // 'ä' is two bytes
        let text = "Bäcker";
        assert!(EvidenceSpan::snapshot(text, 0, 2).is_none());
        assert!(EvidenceSpan::snapshot(text, 0, 3).is_some());
    }

    #[test]
    fn test_text_is_optional_in_json() {
        let span: EvidenceSpan = serde_json::from_str(r#"{"start": 1, "end": 4}"#).unwrap();
        assert_eq!(span, EvidenceSpan::new(1, 4));
        assert_eq!(serde_json::to_string(&span).unwrap(), r#"{"start":1,"end":4}"#);
    }
}
