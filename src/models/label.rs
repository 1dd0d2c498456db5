use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed action-label taxonomy
///
/// Declaration order matches the whitelist order used by the evaluator's
/// membership matrix, which is also ascending by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    PlanContact,
    ScheduleMeeting,
    UpdateContactInfoNonPostal,
    UpdateContactInfoPostalAddress,
    UpdateKycActivity,
    UpdateKycOriginOfAssets,
    UpdateKycPurposeOfBusinessrelation,
    UpdateKycTotalAssets,
}

impl Label {
    /// Whitelist in canonical order
    pub const ALL: [Label; 8] = [
        Label::PlanContact,
        Label::ScheduleMeeting,
        Label::UpdateContactInfoNonPostal,
        Label::UpdateContactInfoPostalAddress,
        Label::UpdateKycActivity,
        Label::UpdateKycOriginOfAssets,
        Label::UpdateKycPurposeOfBusinessrelation,
        Label::UpdateKycTotalAssets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::PlanContact => "plan_contact",
            Label::ScheduleMeeting => "schedule_meeting",
            Label::UpdateContactInfoNonPostal => "update_contact_info_non_postal",
            Label::UpdateContactInfoPostalAddress => "update_contact_info_postal_address",
            Label::UpdateKycActivity => "update_kyc_activity",
            Label::UpdateKycOriginOfAssets => "update_kyc_origin_of_assets",
            Label::UpdateKycPurposeOfBusinessrelation => "update_kyc_purpose_of_businessrelation",
            Label::UpdateKycTotalAssets => "update_kyc_total_assets",
        }
    }

    /// Position in the whitelist
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Parse a whitelisted id, `None` for anything else
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == raw)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown label '{0}'")]
pub struct LabelParseError(pub String);

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s).ok_or_else(|| LabelParseError(s.to_string()))
    }
}
