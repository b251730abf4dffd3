//! Non-pairwise contact browsing
//!
//! Candidate sourcing prefers the reverse indexes: any supplied array
//! criterion turns into index-document reads whose `contact_ids` are
//! OR-unioned. Only a criteria-free query falls back to scanning the
//! contacts collection, and that scan is hard-capped.

use super::MatchEngine;
use crate::contact::{Contact, ContactType};
use crate::error::Result;
use crate::intro::Stage;
use crate::metrics::OperationTimer;
use crate::slug::{normalize_value, slug};
use crate::store::{AttributeField, COLLECTION_CONTACTS};
use futures::future;
use indexmap::IndexSet;
use tracing::debug;

/// Hard ceiling on the criteria-free contact scan
const SCAN_CAP: usize = 1000;

/// How array criteria combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// At least one overlap across all supplied criteria
    #[default]
    Any,
    /// At least one overlap per supplied criterion
    All,
}

/// Which company affiliations a company-name criterion inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanyScope {
    Current,
    Experience,
    #[default]
    Any,
}

/// Range condition on one cached stage counter
#[derive(Debug, Clone)]
pub struct StageCountFilter {
    pub stage: Stage,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Criteria for [`MatchEngine::filter_contacts`]
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    pub contact_type: Option<ContactType>,
    pub skills: Vec<String>,
    pub industries: Vec<String>,
    pub verticals: Vec<String>,
    pub funding_stages: Vec<String>,
    pub location_city: Option<String>,
    pub location_country: Option<String>,
    pub match_mode: MatchMode,
    pub company_names: Vec<String>,
    pub company_scope: CompanyScope,
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub stage_count_filters: Vec<StageCountFilter>,
    pub limit: usize,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterCriteria {
            contact_type: None,
            skills: Vec::new(),
            industries: Vec::new(),
            verticals: Vec::new(),
            funding_stages: Vec::new(),
            location_city: None,
            location_country: None,
            match_mode: MatchMode::Any,
            company_names: Vec::new(),
            company_scope: CompanyScope::Any,
            tags: Vec::new(),
            exclude_tags: Vec::new(),
            stage_count_filters: Vec::new(),
            limit: 50,
        }
    }
}

impl MatchEngine {
    /// Browse contacts by attribute, company, tag, and pipeline criteria
    pub async fn filter_contacts(&self, criteria: FilterCriteria) -> Result<Vec<Contact>> {
        let _timer = OperationTimer::start(self.metrics(), "filter_contacts");
        let limit = criteria.limit.clamp(1, 100);

        let array_criteria: Vec<(AttributeField, &[String])> = [
            (AttributeField::Skills, criteria.skills.as_slice()),
            (AttributeField::Industries, criteria.industries.as_slice()),
            (AttributeField::Verticals, criteria.verticals.as_slice()),
            (AttributeField::FundingStages, criteria.funding_stages.as_slice()),
        ]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .collect();

        let candidate_ids = if array_criteria.is_empty() {
            self.store().list_ids(COLLECTION_CONTACTS, SCAN_CAP).await?
        } else {
            self.union_index_candidates(&array_criteria).await?
        };
        debug!(candidates = candidate_ids.len(), "filter candidate pool");

        // Slugged criterion values, one set per supplied criterion
        let mut wanted: Vec<(AttributeField, IndexSet<String>)> = Vec::new();
        for (field, values) in &array_criteria {
            let mut set = IndexSet::new();
            for value in *values {
                set.insert(normalize_value(value)?);
            }
            wanted.push((*field, set));
        }
        let mut company_slugs: IndexSet<String> = IndexSet::new();
        for name in &criteria.company_names {
            company_slugs.insert(slug(name)?);
        }
        let include_tags: Vec<String> = criteria.tags.iter().map(|t| t.to_lowercase()).collect();
        let exclude_tags: Vec<String> =
            criteria.exclude_tags.iter().map(|t| t.to_lowercase()).collect();

        let docs = self.store().get_many(COLLECTION_CONTACTS, &candidate_ids).await?;
        let mut out = Vec::new();
        for doc in docs.into_iter().flatten() {
            if out.len() >= limit {
                break;
            }
            let contact = Contact::from_document(doc)?;

            if let Some(wanted_type) = criteria.contact_type {
                if contact.contact_type != wanted_type {
                    continue;
                }
            }
            if !scalar_matches(criteria.location_city.as_deref(), contact.location_city.as_deref()) {
                continue;
            }
            if !scalar_matches(
                criteria.location_country.as_deref(),
                contact.location_country.as_deref(),
            ) {
                continue;
            }
            if !array_criteria_match(&contact, &wanted, criteria.match_mode) {
                continue;
            }
            if !company_matches(&contact, &company_slugs, criteria.company_scope) {
                continue;
            }
            if !tag_matches(&contact, &include_tags, &exclude_tags) {
                continue;
            }
            if !stage_counts_match(&contact, &criteria.stage_count_filters) {
                continue;
            }

            out.push(contact);
        }
        Ok(out)
    }

    async fn union_index_candidates(
        &self,
        array_criteria: &[(AttributeField, &[String])],
    ) -> Result<Vec<String>> {
        let mut lookups: Vec<(&'static str, String)> = Vec::new();
        for (field, values) in array_criteria {
            for value in *values {
                lookups.push((field.collection(), normalize_value(value)?));
            }
        }
        let fetches = lookups
            .iter()
            .map(|(collection, id)| self.store().get(collection, id));
        let docs = future::try_join_all(fetches).await?;

        let mut ids: IndexSet<String> = IndexSet::new();
        for doc in docs.into_iter().flatten() {
            if let Some(members) = doc.get("contact_ids").and_then(|v| v.as_array()) {
                for member in members {
                    if let Some(id) = member.as_str() {
                        ids.insert(id.to_string());
                    }
                }
            }
        }
        Ok(ids.into_iter().collect())
    }
}

fn scalar_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(want) => actual.map(|have| have.eq_ignore_ascii_case(want)).unwrap_or(false),
    }
}

fn overlap_exists(contact_values: &[String], wanted: &IndexSet<String>) -> bool {
    contact_values
        .iter()
        .any(|value| normalize_value(value).map(|s| wanted.contains(&s)).unwrap_or(false))
}

fn array_criteria_match(
    contact: &Contact,
    wanted: &[(AttributeField, IndexSet<String>)],
    mode: MatchMode,
) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let mut hits = wanted
        .iter()
        .map(|(field, set)| overlap_exists(contact.attribute_values(*field), set));
    match mode {
        MatchMode::Any => hits.any(|hit| hit),
        MatchMode::All => hits.all(|hit| hit),
    }
}

fn company_matches(contact: &Contact, slugs: &IndexSet<String>, scope: CompanyScope) -> bool {
    if slugs.is_empty() {
        return true;
    }
    let current = || {
        contact
            .current_company_id
            .as_deref()
            .map(|id| slugs.contains(id))
            .unwrap_or(false)
            || contact
                .current_company
                .as_deref()
                .and_then(|name| slug(name).ok())
                .map(|s| slugs.contains(&s))
                .unwrap_or(false)
    };
    let experience = || {
        contact
            .experience_company_ids
            .iter()
            .any(|id| slugs.contains(id))
            || contact
                .past_companies
                .iter()
                .filter_map(|name| slug(name).ok())
                .any(|s| slugs.contains(&s))
    };
    match scope {
        CompanyScope::Current => current(),
        CompanyScope::Experience => experience(),
        CompanyScope::Any => current() || experience(),
    }
}

fn tag_matches(contact: &Contact, include: &[String], exclude: &[String]) -> bool {
    let tag = contact.tag.as_deref().map(|t| t.to_lowercase());
    if !include.is_empty() {
        match &tag {
            Some(tag) if include.contains(tag) => {}
            _ => return false,
        }
    }
    if let Some(tag) = &tag {
        if exclude.contains(tag) {
            return false;
        }
    }
    true
}

fn stage_counts_match(contact: &Contact, filters: &[StageCountFilter]) -> bool {
    filters.iter().all(|filter| {
        let count = contact
            .stage_counts
            .as_ref()
            .map(|counts| counts.get(filter.stage))
            .unwrap_or(0);
        filter.min.map_or(true, |min| count >= min)
            && filter.max.map_or(true, |max| count <= max)
    })
}
