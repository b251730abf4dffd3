//! Candidate scoring, filtering, and match analysis
//!
//! All matching reads go through the reverse indexes: a candidate earns one
//! point per shared attribute value, resolved by index-document membership
//! rather than contact scans. Which values a seed contributes is a policy
//! decision (see [`policy`]); an investor matching founders is scored on
//! its stated thesis, not on its own profile.

pub mod analyze;
pub mod campaign;
pub mod filter;
pub mod policy;

pub use analyze::CampaignPreset;
pub use campaign::{CampaignMatchOptions, MatchCandidate, Overlap};
pub use filter::{CompanyScope, FilterCriteria, MatchMode, StageCountFilter};
pub use policy::{LocationPolicy, MatchAttribute};

use crate::contact::Contact;
use crate::error::Result;
use crate::metrics::MetricsSink;
use crate::store::{DocumentStore, COLLECTION_CONTACTS};
use std::sync::Arc;

/// Engine for all index-backed matching operations
pub struct MatchEngine {
    store: Arc<dyn DocumentStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn DocumentStore>, metrics: Arc<dyn MetricsSink>) -> Self {
        MatchEngine { store, metrics }
    }

    pub(crate) async fn load_contact(&self, id: &str) -> Result<Option<Contact>> {
        match self.store.get(COLLECTION_CONTACTS, id).await? {
            Some(doc) => Ok(Some(Contact::from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub(crate) fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }
}
