//! Stage transitions, cached counters, and campaign listings
//!
//! Transitions write the introduction document first, then maintain the
//! owner's cached `stage_counts` two ways: a transactional delta for the
//! common case, followed by an unconditional full recompute that repairs
//! any drift. The recompute runs even when the delta path succeeded; the
//! redundancy is the self-healing guarantee.

use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::metrics::{MetricsSink, OperationTimer};
use crate::store::{
    Document, DocumentStore, FieldOp, StoreError, Transaction, WriteBatch, COLLECTION_CONTACTS,
    COLLECTION_INTRODUCTIONS,
};
use super::{introduction_id, Introduction, Stage, StageCounts, StageSummary};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one bulk transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Result of a stage-count recompute
///
/// The tally is always produced; `owner_updated` says whether it could be
/// persisted onto the owner contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeOutcome {
    pub counts: StageCounts,
    pub owner_updated: bool,
}

/// Sort key for campaign listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignOrder {
    /// `(stage_rank, updated_at)`
    Stage,
    UpdatedAt,
}

/// Paging and ordering options for [`IntroductionEngine::get_campaign_contacts`]
#[derive(Debug, Clone)]
pub struct CampaignListOptions {
    pub limit: usize,
    pub order_by: CampaignOrder,
    pub descending: bool,
    /// Introduction document id to resume after
    pub start_after: Option<String>,
}

impl Default for CampaignListOptions {
    fn default() -> Self {
        CampaignListOptions {
            limit: 50,
            order_by: CampaignOrder::Stage,
            descending: false,
            start_after: None,
        }
    }
}

/// One row of a campaign listing: the target contact joined with its
/// introduction state
#[derive(Debug, Clone, Serialize)]
pub struct CampaignRecord {
    pub contact: Contact,
    pub campaign_stage: Stage,
    pub campaign_stage_rank: i64,
    pub introduced_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Option<Value>,
}

/// One page of campaign rows
#[derive(Debug, Clone, Serialize)]
pub struct CampaignPage {
    pub records: Vec<CampaignRecord>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Engine for the introduction pipeline
pub struct IntroductionEngine {
    store: Arc<dyn DocumentStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl IntroductionEngine {
    pub fn new(store: Arc<dyn DocumentStore>, metrics: Arc<dyn MetricsSink>) -> Self {
        IntroductionEngine { store, metrics }
    }

    /// Move one (owner, target) pair to a stage
    ///
    /// Creates the introduction document if the pair is new. The owner's
    /// counters are delta-adjusted and then fully recomputed; an owner
    /// contact that does not exist skips the counter writes but never
    /// fails the transition.
    pub async fn set_stage(
        &self,
        owner_id: &str,
        target_id: &str,
        stage: Stage,
        metadata: Option<Value>,
    ) -> Result<Introduction> {
        let _timer = OperationTimer::start(self.metrics.as_ref(), "intro_set_stage");
        let id = introduction_id(owner_id, target_id);
        let now = Utc::now();

        let existing = match self.store.get(COLLECTION_INTRODUCTIONS, &id).await? {
            Some(doc) => Some(intro_from_doc(doc)?),
            None => None,
        };

        let (intro, delta): (Introduction, Vec<(Stage, i64)>) = match existing {
            None => {
                let intro = Introduction {
                    id: id.clone(),
                    owner_id: owner_id.to_string(),
                    target_id: target_id.to_string(),
                    stage,
                    stage_rank: stage.rank(),
                    metadata,
                    created_at: now,
                    updated_at: now,
                };
                (intro, vec![(stage, 1)])
            }
            Some(mut intro) if intro.stage != stage => {
                let previous = intro.stage;
                intro.stage = stage;
                intro.stage_rank = stage.rank();
                intro.updated_at = now;
                if metadata.is_some() {
                    intro.metadata = metadata;
                }
                (intro, vec![(previous, -1), (stage, 1)])
            }
            Some(mut intro) => {
                intro.updated_at = now;
                if metadata.is_some() {
                    intro.metadata = metadata;
                }
                (intro, Vec::new())
            }
        };

        self.store
            .set(COLLECTION_INTRODUCTIONS, &id, intro_to_doc(&intro)?, false)
            .await?;

        if !delta.is_empty() {
            self.apply_count_delta(owner_id, &delta).await?;
        }
        self.recompute_stage_counts(owner_id).await?;

        debug!(owner_id, target_id, stage = %stage, "stage set");
        self.metrics
            .increment("intro_set_stage", 1, &[("stage", stage.wire_name())]);
        Ok(intro)
    }

    /// Transition many targets for one owner
    ///
    /// One batched read, one atomic write batch, one aggregate counter
    /// delta, one recompute.
    pub async fn bulk_set_stage(
        &self,
        owner_id: &str,
        items: &[(String, Stage)],
        metadata: Option<Value>,
    ) -> Result<BulkReport> {
        let _timer = OperationTimer::start(self.metrics.as_ref(), "intro_bulk_set_stage");
        if items.is_empty() {
            return Ok(BulkReport::default());
        }

        let ids: Vec<String> = items
            .iter()
            .map(|(target_id, _)| introduction_id(owner_id, target_id))
            .collect();
        let docs = self.store.get_many(COLLECTION_INTRODUCTIONS, &ids).await?;

        let now = Utc::now();
        let mut batch = WriteBatch::new();
        let mut delta: IndexMap<Stage, i64> = IndexMap::new();
        let mut report = BulkReport::default();

        for (((target_id, stage), id), doc) in items.iter().zip(&ids).zip(docs) {
            match doc {
                None => {
                    let intro = Introduction {
                        id: id.clone(),
                        owner_id: owner_id.to_string(),
                        target_id: target_id.clone(),
                        stage: *stage,
                        stage_rank: stage.rank(),
                        metadata: metadata.clone(),
                        created_at: now,
                        updated_at: now,
                    };
                    batch.set(COLLECTION_INTRODUCTIONS, id, intro_to_doc(&intro)?, false);
                    *delta.entry(*stage).or_insert(0) += 1;
                    report.created += 1;
                }
                Some(doc) => {
                    let existing = intro_from_doc(doc)?;
                    if existing.stage == *stage {
                        batch.update(
                            COLLECTION_INTRODUCTIONS,
                            id,
                            vec![("updated_at".to_string(), FieldOp::Set(json!(now)))],
                        );
                        report.unchanged += 1;
                    } else {
                        let mut fields = vec![
                            (
                                "stage".to_string(),
                                FieldOp::Set(serde_json::to_value(stage).map_err(StoreError::from)?),
                            ),
                            ("stage_rank".to_string(), FieldOp::Set(json!(stage.rank()))),
                            ("updated_at".to_string(), FieldOp::Set(json!(now))),
                        ];
                        if let Some(meta) = &metadata {
                            fields.push(("metadata".to_string(), FieldOp::Set(meta.clone())));
                        }
                        batch.update(COLLECTION_INTRODUCTIONS, id, fields);
                        *delta.entry(existing.stage).or_insert(0) -= 1;
                        *delta.entry(*stage).or_insert(0) += 1;
                        report.updated += 1;
                    }
                }
            }
        }

        self.store.commit(batch).await?;

        let net: Vec<(Stage, i64)> = delta.into_iter().filter(|(_, d)| *d != 0).collect();
        if !net.is_empty() {
            self.apply_count_delta(owner_id, &net).await?;
        }
        self.recompute_stage_counts(owner_id).await?;

        info!(
            owner_id,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            "bulk stage transition"
        );
        Ok(report)
    }

    /// Tally introductions and persist counts onto the owner
    ///
    /// The tally is returned regardless; a missing owner contact is
    /// signalled through `owner_updated` rather than treated as an error,
    /// so callers can self-heal counters without caring whether the owner
    /// document exists yet.
    pub async fn recompute_stage_counts(&self, owner_id: &str) -> Result<RecomputeOutcome> {
        let introductions = self.get_introductions(owner_id, None).await?;
        let mut counts = StageCounts::zero_filled();
        for intro in &introductions {
            counts.add_clamped(intro.stage, 1);
        }
        let status = counts.action_status();

        let owner = owner_id.to_string();
        let persisted = counts.clone();
        let applied = self
            .store
            .run_transaction(Box::new(move |txn: &mut dyn Transaction| {
                let Some(mut doc) = txn.get(COLLECTION_CONTACTS, &owner)? else {
                    return Ok(json!({"applied": false}));
                };
                doc["stage_counts"] = serde_json::to_value(&persisted)?;
                doc["action_status"] = serde_json::to_value(status)?;
                doc["updated_at"] = json!(Utc::now());
                txn.set(COLLECTION_CONTACTS, &owner, doc, false)?;
                Ok(json!({"applied": true}))
            }))
            .await?;

        let owner_updated = applied["applied"].as_bool().unwrap_or(false);
        if !owner_updated {
            warn!(owner_id, "owner contact missing; recomputed counts not persisted");
            self.metrics
                .increment("intro_recompute_owner_missing", 1, &[]);
        }
        Ok(RecomputeOutcome {
            counts,
            owner_updated,
        })
    }

    /// Zero-filled stage summary for an owner
    pub async fn get_stage_summary(&self, owner_id: &str) -> Result<StageSummary> {
        let introductions = self.get_introductions(owner_id, None).await?;
        let mut counts = StageCounts::zero_filled();
        for intro in &introductions {
            counts.add_clamped(intro.stage, 1);
        }
        Ok(StageSummary {
            total: counts.total(),
            action_status: counts.action_status(),
            counts,
        })
    }

    /// All introductions for an owner, optionally filtered to one stage
    pub async fn get_introductions(
        &self,
        owner_id: &str,
        stage: Option<Stage>,
    ) -> Result<Vec<Introduction>> {
        let docs = self
            .store
            .find_by_field(COLLECTION_INTRODUCTIONS, "owner_id", &json!(owner_id))
            .await?;
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let intro = intro_from_doc(doc)?;
            if stage.map_or(true, |s| intro.stage == s) {
                out.push(intro);
            }
        }
        Ok(out)
    }

    /// Target contacts of an owner's introductions in one stage
    ///
    /// Targets whose contact document has been removed are skipped.
    pub async fn get_contacts_in_stage(
        &self,
        owner_id: &str,
        stage: Stage,
    ) -> Result<Vec<Contact>> {
        let introductions = self.get_introductions(owner_id, Some(stage)).await?;
        let target_ids: Vec<String> = introductions
            .iter()
            .map(|i| i.target_id.clone())
            .collect();
        let docs = self.store.get_many(COLLECTION_CONTACTS, &target_ids).await?;

        let mut contacts = Vec::with_capacity(docs.len());
        for doc in docs.into_iter().flatten() {
            contacts.push(Contact::from_document(doc)?);
        }
        Ok(contacts)
    }

    /// Ordered, cursor-paged campaign listing for an owner
    pub async fn get_campaign_contacts(
        &self,
        owner_id: &str,
        opts: CampaignListOptions,
    ) -> Result<CampaignPage> {
        let limit = opts.limit.max(1);
        let mut introductions = self.get_introductions(owner_id, None).await?;

        let compare = |a: &Introduction, b: &Introduction| -> Ordering {
            let by_key = match opts.order_by {
                CampaignOrder::Stage => a
                    .stage_rank
                    .cmp(&b.stage_rank)
                    .then(a.updated_at.cmp(&b.updated_at)),
                CampaignOrder::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            by_key.then_with(|| a.id.cmp(&b.id))
        };
        introductions.sort_by(|a, b| {
            if opts.descending {
                compare(a, b).reverse()
            } else {
                compare(a, b)
            }
        });

        let start = match &opts.start_after {
            Some(cursor) => {
                let position = introductions
                    .iter()
                    .position(|i| &i.id == cursor)
                    .ok_or_else(|| {
                        Error::NotFound(format!(
                            "startAfter cursor {} not found for owner {}",
                            cursor, owner_id
                        ))
                    })?;
                position + 1
            }
            None => 0,
        };

        let window: Vec<Introduction> =
            introductions.into_iter().skip(start).take(limit + 1).collect();
        let has_more = window.len() > limit;
        let page: Vec<Introduction> = window.into_iter().take(limit).collect();
        let next_cursor = if has_more {
            page.last().map(|i| i.id.clone())
        } else {
            None
        };

        let target_ids: Vec<String> = page.iter().map(|i| i.target_id.clone()).collect();
        let docs = self.store.get_many(COLLECTION_CONTACTS, &target_ids).await?;

        let mut records = Vec::with_capacity(page.len());
        for (intro, doc) in page.iter().zip(docs) {
            let Some(doc) = doc else {
                debug!(target_id = %intro.target_id, "campaign target missing; row skipped");
                continue;
            };
            records.push(CampaignRecord {
                contact: Contact::from_document(doc)?,
                campaign_stage: intro.stage,
                campaign_stage_rank: intro.stage_rank,
                introduced_at: intro.created_at,
                updated_at: intro.updated_at,
                metadata: intro.metadata.clone(),
            });
        }

        Ok(CampaignPage {
            records,
            has_more,
            next_cursor,
        })
    }

    async fn apply_count_delta(&self, owner_id: &str, delta: &[(Stage, i64)]) -> Result<()> {
        let owner = owner_id.to_string();
        let delta = delta.to_vec();
        let applied = self
            .store
            .run_transaction(Box::new(move |txn: &mut dyn Transaction| {
                let Some(mut doc) = txn.get(COLLECTION_CONTACTS, &owner)? else {
                    return Ok(json!({"applied": false}));
                };

                let mut counts = match doc.get("stage_counts").filter(|v| !v.is_null()) {
                    Some(value) => {
                        serde_json::from_value::<StageCounts>(value.clone())?.normalized()
                    }
                    None => StageCounts::zero_filled(),
                };
                for (stage, d) in &delta {
                    counts.add_clamped(*stage, *d);
                }
                doc["stage_counts"] = serde_json::to_value(&counts)?;
                doc["action_status"] = serde_json::to_value(counts.action_status())?;
                doc["updated_at"] = json!(Utc::now());
                txn.set(COLLECTION_CONTACTS, &owner, doc, false)?;
                Ok(json!({"applied": true}))
            }))
            .await?;

        if !applied["applied"].as_bool().unwrap_or(false) {
            warn!(owner_id, "owner contact missing; counter delta skipped");
            self.metrics
                .increment("intro_counts_owner_missing", 1, &[]);
        }
        Ok(())
    }
}

fn intro_from_doc(doc: Document) -> Result<Introduction> {
    Ok(serde_json::from_value(doc).map_err(StoreError::from)?)
}

fn intro_to_doc(intro: &Introduction) -> Result<Document> {
    Ok(serde_json::to_value(intro).map_err(StoreError::from)?)
}
