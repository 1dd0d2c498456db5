use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::models::Label;

/// Env var holding a JSON object of per-label threshold overrides
pub const THRESHOLDS_ENV: &str = "FINALIZE_THRESHOLDS_JSON";

/// Parse a boolean toggle: 1/true/yes/on or 0/false/no/off
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Environment-style key lookup; `None` when unset
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Process environment as a [`Lookup`]
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Boolean setting, `default` when unset or unrecognized
pub fn lookup_bool(get: Lookup<'_>, name: &str, default: bool) -> bool {
    get(name).and_then(|v| parse_bool(&v)).unwrap_or(default)
}

/// Numeric setting, `None` when unset or unparsable
pub fn lookup_num<T: FromStr>(get: Lookup<'_>, name: &str) -> Option<T> {
    get(name).and_then(|v| v.trim().parse().ok())
}

/// Partial per-label overrides supplied by the caller
pub type ThresholdOverrides = BTreeMap<Label, f64>;

/// Per-label finalization cutoffs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds(BTreeMap<Label, f64>);

impl Default for Thresholds {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        for label in Label::ALL {
            let cutoff = match label {
                Label::UpdateKycOriginOfAssets => 0.40,
                _ => 0.45,
            };
            map.insert(label, cutoff);
        }
        Self(map)
    }
}

impl Thresholds {
    /// Used for any label missing from the table
    pub const CATCH_ALL: f64 = 0.5;

    #[cfg(test)]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, label: Label) -> f64 {
        self.0.get(&label).copied().unwrap_or(Self::CATCH_ALL)
    }

    /// Overlay overrides, skipping non-finite values
    pub fn merged(mut self, overrides: &ThresholdOverrides) -> Self {
        for (label, value) in overrides {
            if value.is_finite() {
                self.0.insert(*label, *value);
            }
        }
        self
    }
}

/// Parse a JSON object `{label: number}`; unknown labels and non-numeric values
/// are skipped, invalid JSON yields `None`
pub fn parse_threshold_overrides(raw: &str) -> Option<ThresholdOverrides> {
    let parsed: BTreeMap<String, serde_json::Value> = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            warn!("Ignoring {}: {}", THRESHOLDS_ENV, e);
            return None;
        }
    };

    let mut overrides = ThresholdOverrides::new();
    for (key, value) in parsed {
        match (Label::parse(&key), value.as_f64()) {
            (Some(label), Some(v)) if v.is_finite() => {
                overrides.insert(label, v);
            }
            _ => warn!("Ignoring threshold override {}={}", key, value),
        }
    }
    Some(overrides)
}

/// Overrides from `FINALIZE_THRESHOLDS_JSON`, if set and valid
pub fn lookup_thresholds(get: Lookup<'_>) -> Option<ThresholdOverrides> {
    get(THRESHOLDS_ENV).and_then(|raw| parse_threshold_overrides(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(" YES "), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_lookup_helpers() {
        let get = |name: &str| match name {
            "FLAG" => Some("off".to_string()),
            "JUNK" => Some("maybe".to_string()),
            "COUNT" => Some(" 3 ".to_string()),
            _ => None,
        };
        assert!(!lookup_bool(&get, "FLAG", true));
        assert!(lookup_bool(&get, "JUNK", true));
        assert!(!lookup_bool(&get, "MISSING", false));
        assert_eq!(lookup_num::<usize>(&get, "COUNT"), Some(3));
        assert_eq!(lookup_num::<usize>(&get, "JUNK"), None);
        assert!(lookup_thresholds(&get).is_none());
    }

    #[test]
    fn test_default_thresholds() {
        let t = Thresholds::default();
        assert_eq!(t.get(Label::ScheduleMeeting), 0.45);
        assert_eq!(t.get(Label::UpdateKycOriginOfAssets), 0.40);
        assert_eq!(Thresholds::empty().get(Label::PlanContact), Thresholds::CATCH_ALL);
    }

    #[test]
    fn test_merge_overrides() {
        let mut overrides = ThresholdOverrides::new();
        overrides.insert(Label::ScheduleMeeting, 0.44);
        overrides.insert(Label::PlanContact, f64::NAN);

        let t = Thresholds::default().merged(&overrides);
        assert_eq!(t.get(Label::ScheduleMeeting), 0.44);
        assert_eq!(t.get(Label::PlanContact), 0.45);
    }

    #[test]
    fn test_parse_threshold_overrides() {
        let overrides = parse_threshold_overrides(
            r#"{"schedule_meeting": 0.44, "update_kyc_origin_of_assets": 0.38, "bogus": 0.1, "plan_contact": "high"}"#,
        )
        .unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[&Label::ScheduleMeeting], 0.44);
        assert_eq!(overrides[&Label::UpdateKycOriginOfAssets], 0.38);

        assert!(parse_threshold_overrides("not json").is_none());
    }
}
