use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {field}: {value}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => Err(ParseEnumError {
                field: "gender",
                value: other.to_string(),
            }),
        }
    }
}

/// Screening outcome attached to a record. The labels are the wire values
/// stored verbatim in the record store; `Follow-up Required` carries a space,
/// so serde renames are explicit rather than derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Pending,
    Checked,
    Referred,
    Treated,
    #[serde(rename = "Follow-up Required")]
    FollowUpRequired,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Pending => "Pending",
            HealthStatus::Checked => "Checked",
            HealthStatus::Referred => "Referred",
            HealthStatus::Treated => "Treated",
            HealthStatus::FollowUpRequired => "Follow-up Required",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(HealthStatus::Pending),
            "Checked" => Ok(HealthStatus::Checked),
            "Referred" => Ok(HealthStatus::Referred),
            "Treated" => Ok(HealthStatus::Treated),
            "Follow-up Required" => Ok(HealthStatus::FollowUpRequired),
            other => Err(ParseEnumError {
                field: "health_status",
                value: other.to_string(),
            }),
        }
    }
}
