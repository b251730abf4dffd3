//! Campaign potential analysis
//!
//! Sizes the candidate pool a seed contact would reach under each preset
//! attribute combination. Pools are counted straight off the reverse
//! indexes; no contact documents are fetched and no ranking happens.

use super::policy::MatchAttribute;
use super::MatchEngine;
use crate::contact::ContactType;
use crate::error::{Error, Result};
use crate::metrics::OperationTimer;
use serde::Serialize;
use tracing::debug;

/// One preset attribute combination with its reachable pool size
#[derive(Debug, Clone, Serialize)]
pub struct CampaignPreset {
    pub name: &'static str,
    pub attributes: &'static [MatchAttribute],
    pub candidate_count: usize,
}

const PRESET_MENU: &[(&str, &[MatchAttribute])] = &[
    ("skills", &[MatchAttribute::Skills]),
    ("industries", &[MatchAttribute::Industries]),
    ("verticals", &[MatchAttribute::Verticals]),
    (
        "skills_industries",
        &[MatchAttribute::Skills, MatchAttribute::Industries],
    ),
    (
        "skills_verticals",
        &[MatchAttribute::Skills, MatchAttribute::Verticals],
    ),
    (
        "industries_verticals",
        &[MatchAttribute::Industries, MatchAttribute::Verticals],
    ),
    (
        "skills_industries_verticals",
        &[
            MatchAttribute::Skills,
            MatchAttribute::Industries,
            MatchAttribute::Verticals,
        ],
    ),
    ("funding_stages", &[MatchAttribute::FundingStages]),
    (
        "industries_funding_stages",
        &[MatchAttribute::Industries, MatchAttribute::FundingStages],
    ),
];

impl MatchEngine {
    /// Count the candidates each preset combination would reach from `seed_id`
    pub async fn analyze_campaign_potential(
        &self,
        seed_id: &str,
        target_type: ContactType,
    ) -> Result<Vec<CampaignPreset>> {
        let _timer = OperationTimer::start(self.metrics(), "campaign_analysis");
        let seed = self
            .load_contact(seed_id)
            .await?
            .ok_or_else(|| Error::contact_not_found(seed_id))?;

        let mut presets = Vec::with_capacity(PRESET_MENU.len());
        for &(name, attributes) in PRESET_MENU {
            let pool = self.score_pool(&seed, attributes, target_type).await?;
            presets.push(CampaignPreset {
                name,
                attributes,
                candidate_count: pool.len(),
            });
        }
        debug!(seed_id, presets = presets.len(), "campaign analysis complete");
        self.metrics().increment("campaign_analysis", 1, &[]);
        Ok(presets)
    }
}
