//! Introduction pipeline types
//!
//! The stage vocabulary is fixed and ordered; ranks exist only for sort
//! ordering and are persisted on introduction documents so listings can
//! order without joins.

pub mod engine;

pub use engine::{
    BulkReport, CampaignListOptions, CampaignOrder, CampaignPage, CampaignRecord,
    IntroductionEngine, RecomputeOutcome,
};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Pipeline stage of an introduction
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Prospect = 0,
    Qualified = 1,
    Outreached = 2,
    Interested = 3,
    ToMeet = 4,
    Met = 5,
    Disqualified = 6,
    NotInCampaign = 7,
}

impl Stage {
    /// Every stage, in canonical funnel order
    pub const ALL: [Stage; 8] = [
        Stage::Prospect,
        Stage::Qualified,
        Stage::Outreached,
        Stage::Interested,
        Stage::ToMeet,
        Stage::Met,
        Stage::Disqualified,
        Stage::NotInCampaign,
    ];

    /// Stages that demand follow-up from the owner
    pub const ACTION_REQUIRED: [Stage; 4] = [
        Stage::Qualified,
        Stage::Interested,
        Stage::Met,
        Stage::Disqualified,
    ];

    /// Static sort rank; canonical order, never compared across vocabularies
    pub fn rank(&self) -> i64 {
        *self as i64
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Stage::Prospect => "prospect",
            Stage::Qualified => "qualified",
            Stage::Outreached => "outreached",
            Stage::Interested => "interested",
            Stage::ToMeet => "to-meet",
            Stage::Met => "met",
            Stage::Disqualified => "disqualified",
            Stage::NotInCampaign => "not-in-campaign",
        }
    }

    /// Parse a wire name; unknown names are a validation failure
    pub fn from_wire(name: &str) -> Result<Stage> {
        Stage::ALL
            .iter()
            .copied()
            .find(|s| s.wire_name() == name)
            .ok_or_else(|| Error::Validation(format!("unknown stage {:?}", name)))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Whether the owner has introductions waiting on them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    ActionRequired,
    Waiting,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::ActionRequired => write!(f, "action_required"),
            ActionStatus::Waiting => write!(f, "waiting"),
        }
    }
}

/// Cached per-stage introduction counts on an owner contact
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageCounts(IndexMap<Stage, i64>);

impl StageCounts {
    /// Every stage present with a zero count, in canonical order
    pub fn zero_filled() -> Self {
        StageCounts(Stage::ALL.iter().map(|s| (*s, 0)).collect())
    }

    pub fn get(&self, stage: Stage) -> i64 {
        self.0.get(&stage).copied().unwrap_or(0)
    }

    pub fn set(&mut self, stage: Stage, count: i64) {
        self.0.insert(stage, count);
    }

    /// Add a signed delta, clamping the result at zero
    pub fn add_clamped(&mut self, stage: Stage, delta: i64) {
        let next = (self.get(stage) + delta).max(0);
        self.0.insert(stage, next);
    }

    pub fn total(&self) -> i64 {
        Stage::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// Derive the owner's action status from these counts
    pub fn action_status(&self) -> ActionStatus {
        let pending: i64 = Stage::ACTION_REQUIRED.iter().map(|s| self.get(*s)).sum();
        if pending > 0 {
            ActionStatus::ActionRequired
        } else {
            ActionStatus::Waiting
        }
    }

    /// Same counts with every stage present, in canonical order
    pub fn normalized(&self) -> StageCounts {
        let mut out = StageCounts::zero_filled();
        for stage in Stage::ALL {
            out.set(stage, self.get(stage));
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, i64)> + '_ {
        Stage::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

/// Zero-filled per-stage counts plus derived fields
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub counts: StageCounts,
    pub total: i64,
    pub action_status: ActionStatus,
}

/// One (owner, target) introduction document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Introduction {
    pub id: String,
    pub owner_id: String,
    pub target_id: String,
    pub stage: Stage,
    pub stage_rank: i64,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Deterministic document id for an (owner, target) pair
pub fn introduction_id(owner_id: &str, target_id: &str) -> String {
    format!("{}__{}", owner_id, target_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ranks_follow_canonical_order() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.rank(), i as i64);
        }
        assert!(Stage::Prospect < Stage::Met);
    }

    #[test]
    fn test_wire_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_wire(stage.wire_name()).unwrap(), stage);
        }
        assert_eq!(Stage::from_wire("to-meet").unwrap(), Stage::ToMeet);
        assert_eq!(Stage::from_wire("not-in-campaign").unwrap(), Stage::NotInCampaign);
    }

    #[test]
    fn test_unknown_stage_fails() {
        let err = Stage::from_wire("lead").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Stage::ToMeet).unwrap();
        assert_eq!(json, "\"to-meet\"");
        let parsed: Stage = serde_json::from_str("\"not-in-campaign\"").unwrap();
        assert_eq!(parsed, Stage::NotInCampaign);
    }

    #[test]
    fn test_counts_clamp_at_zero() {
        let mut counts = StageCounts::zero_filled();
        counts.add_clamped(Stage::Prospect, -5);
        assert_eq!(counts.get(Stage::Prospect), 0);
        counts.add_clamped(Stage::Prospect, 2);
        counts.add_clamped(Stage::Prospect, -1);
        assert_eq!(counts.get(Stage::Prospect), 1);
    }

    #[test]
    fn test_action_status_formula() {
        let mut counts = StageCounts::zero_filled();
        counts.set(Stage::Prospect, 10);
        counts.set(Stage::Outreached, 3);
        assert_eq!(counts.action_status(), ActionStatus::Waiting);

        counts.set(Stage::Interested, 1);
        assert_eq!(counts.action_status(), ActionStatus::ActionRequired);

        let mut disqualified_only = StageCounts::zero_filled();
        disqualified_only.set(Stage::Disqualified, 1);
        assert_eq!(disqualified_only.action_status(), ActionStatus::ActionRequired);
    }

    #[test]
    fn test_normalized_fills_and_orders() {
        let mut counts = StageCounts::default();
        counts.set(Stage::Met, 2);
        let normalized = counts.normalized();
        let keys: Vec<Stage> = normalized.iter().map(|(s, _)| s).collect();
        assert_eq!(keys, Stage::ALL.to_vec());
        assert_eq!(normalized.get(Stage::Met), 2);
        assert_eq!(normalized.get(Stage::Prospect), 0);
        assert_eq!(normalized.total(), 2);
    }

    #[test]
    fn test_counts_serialize_with_wire_keys() {
        let mut counts = StageCounts::zero_filled();
        counts.set(Stage::ToMeet, 4);
        let value = serde_json::to_value(&counts).unwrap();
        assert_eq!(value["to-meet"], 4);
        assert_eq!(value["prospect"], 0);
    }

    #[test]
    fn test_introduction_id_is_deterministic() {
        assert_eq!(introduction_id("o1", "t1"), "o1__t1");
        assert_eq!(introduction_id("o1", "t1"), introduction_id("o1", "t1"));
    }
}
