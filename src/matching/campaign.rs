//! Index-backed candidate scoring and shortlisting
//!
//! Scoring never scans contacts: each seed value resolves to one index
//! document read, and every contact id found there earns a point. The
//! pool accumulates in an `FxHashMap`; ordering is imposed afterwards by
//! an explicit sort on (score desc, id asc).

use super::policy::{self, LocationPolicy, MatchAttribute};
use super::MatchEngine;
use crate::contact::{Contact, ContactType};
use crate::error::{Error, Result};
use crate::metrics::OperationTimer;
use crate::slug::normalize_value;
use crate::store::COLLECTION_CONTACTS;
use futures::future;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

/// Options for [`MatchEngine::campaign_match`]
#[derive(Debug, Clone)]
pub struct CampaignMatchOptions {
    pub attributes: Vec<MatchAttribute>,
    pub target_type: ContactType,
    pub limit: usize,
    pub exclude_tags: Vec<String>,
}

impl Default for CampaignMatchOptions {
    fn default() -> Self {
        CampaignMatchOptions {
            attributes: vec![
                MatchAttribute::Skills,
                MatchAttribute::Industries,
                MatchAttribute::Verticals,
            ],
            target_type: ContactType::Investor,
            limit: 20,
            exclude_tags: Vec::new(),
        }
    }
}

/// Shared values behind one scored family, for explainability
///
/// `collection` is `None` for the location family, which has no index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlap {
    pub attribute: MatchAttribute,
    pub collection: Option<String>,
    pub values: Vec<String>,
}

/// One scored, filtered candidate
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub contact: Contact,
    pub score: i64,
    pub overlaps: Vec<Overlap>,
}

/// Running score for one candidate while the pool accumulates
#[derive(Default)]
pub(super) struct CandidateScore {
    pub(super) score: i64,
    overlaps: IndexMap<(MatchAttribute, &'static str), IndexSet<String>>,
}

impl CandidateScore {
    fn record(&mut self, attribute: MatchAttribute, collection: &'static str, value: &str) {
        self.score += 1;
        self.overlaps
            .entry((attribute, collection))
            .or_default()
            .insert(value.to_string());
    }

    fn into_overlaps(self) -> Vec<Overlap> {
        self.overlaps
            .into_iter()
            .map(|((attribute, collection), values)| Overlap {
                attribute,
                collection: Some(collection.to_string()),
                values: values.into_iter().collect(),
            })
            .collect()
    }
}

impl MatchEngine {
    /// Score every candidate sharing indexed values with the seed
    ///
    /// Index documents are fetched concurrently; a missing document simply
    /// contributes nothing. The seed never scores against itself.
    pub(super) async fn score_pool(
        &self,
        seed: &Contact,
        attributes: &[MatchAttribute],
        target_type: ContactType,
    ) -> Result<FxHashMap<String, CandidateScore>> {
        let mut lookups: Vec<(MatchAttribute, &'static str, String, String)> = Vec::new();
        let mut seen: IndexSet<(MatchAttribute, String)> = IndexSet::new();
        for attribute in attributes {
            let Some(field) = attribute.attribute_field() else {
                continue;
            };
            let collection = field.collection();
            for raw in policy::scoring_values(seed, target_type, *attribute) {
                let doc_id = normalize_value(&raw)?;
                if seen.insert((*attribute, doc_id.clone())) {
                    lookups.push((*attribute, collection, raw, doc_id));
                }
            }
        }

        let fetches = lookups
            .iter()
            .map(|(_, collection, _, doc_id)| self.store().get(collection, doc_id));
        let docs = future::try_join_all(fetches).await?;

        let mut pool: FxHashMap<String, CandidateScore> = FxHashMap::default();
        for ((attribute, collection, raw, _), doc) in lookups.iter().zip(docs) {
            let Some(doc) = doc else { continue };
            let Some(ids) = doc.get("contact_ids").and_then(|v| v.as_array()) else {
                continue;
            };
            for id in ids {
                let Some(candidate_id) = id.as_str() else { continue };
                if candidate_id == seed.id {
                    continue;
                }
                pool.entry(candidate_id.to_string())
                    .or_default()
                    .record(*attribute, collection, raw);
            }
        }
        Ok(pool)
    }

    /// Find and rank candidates for a seed contact
    pub async fn campaign_match(
        &self,
        seed_id: &str,
        opts: CampaignMatchOptions,
    ) -> Result<Vec<MatchCandidate>> {
        let _timer = OperationTimer::start(self.metrics(), "campaign_match");
        let seed = self
            .load_contact(seed_id)
            .await?
            .ok_or_else(|| Error::contact_not_found(seed_id))?;

        let pool = self
            .score_pool(&seed, &opts.attributes, opts.target_type)
            .await?;
        let location = opts
            .attributes
            .contains(&MatchAttribute::Location)
            .then(|| policy::location_values(&seed, opts.target_type));

        let limit = opts.limit.clamp(1, 100);
        let mut ranked: Vec<(String, CandidateScore)> = pool.into_iter().collect();
        ranked.sort_by(|a, b| b.1.score.cmp(&a.1.score).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit * 2);

        let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let docs = self.store().get_many(COLLECTION_CONTACTS, &ids).await?;

        let exclude: Vec<String> = opts
            .exclude_tags
            .iter()
            .map(|t| t.to_lowercase())
            .collect();

        let mut candidates = Vec::new();
        for ((candidate_id, scored), doc) in ranked.into_iter().zip(docs) {
            if candidates.len() >= limit {
                break;
            }
            let Some(doc) = doc else {
                debug!(candidate_id = %candidate_id, "scored candidate has no contact document");
                continue;
            };
            let contact = Contact::from_document(doc)?;
            if !contact.contact_type.satisfies(opts.target_type) {
                continue;
            }
            if let Some(tag) = &contact.tag {
                if exclude.contains(&tag.to_lowercase()) {
                    continue;
                }
            }

            let score = scored.score;
            let mut overlaps = scored.into_overlaps();
            if let Some(policy) = &location {
                match location_overlap(&contact, policy) {
                    Some(values) => overlaps.push(Overlap {
                        attribute: MatchAttribute::Location,
                        collection: None,
                        values,
                    }),
                    None => continue,
                }
            }

            candidates.push(MatchCandidate {
                contact,
                score,
                overlaps,
            });
        }

        debug!(
            seed_id,
            candidates = candidates.len(),
            "campaign match complete"
        );
        self.metrics().increment("campaign_match", 1, &[]);
        Ok(candidates)
    }
}

/// Location values matching the candidate, or `None` when the filter
/// rejects it
///
/// A policy with nothing configured constrains nothing and admits every
/// candidate.
fn location_overlap(contact: &Contact, policy: &LocationPolicy) -> Option<Vec<String>> {
    if policy.is_empty() {
        return Some(Vec::new());
    }
    let mut matched = Vec::new();
    if let Some(city) = contact.location_city.as_deref() {
        if policy.cities.iter().any(|c| c == city) {
            matched.push(city.to_string());
        }
    }
    if let Some(country) = contact.location_country.as_deref() {
        if policy.countries.iter().any(|c| c == country) {
            matched.push(country.to_string());
        }
    }
    if matched.is_empty() {
        None
    } else {
        Some(matched)
    }
}
