//! Canonical node documents derived from contacts
//!
//! Flattening produces these; graph sync upserts them with the owning
//! contact's id unioned into `contact_ids`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A company referenced by one or more contacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub verticals: Vec<String>,
    #[serde(default)]
    pub contact_ids: Vec<String>,
}

/// A normalized distribution channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionCapabilityNode {
    pub id: String,
    pub distribution_type: String,
    pub label: String,
    #[serde(default)]
    pub contact_ids: Vec<String>,
}

/// A quality bucket for one distribution type, 1 through 10
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBucketNode {
    pub id: String,
    pub distribution_type: String,
    pub bucket: u8,
    pub label: String,
    #[serde(default)]
    pub contact_ids: Vec<String>,
}

/// A normalized investment-thesis criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCriterionNode {
    pub id: String,
    pub label: String,
    pub dimension: String,
    pub operator: String,
    pub value: Value,
}
