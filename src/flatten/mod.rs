//! Contact normalization
//!
//! Turns raw contact input into normalized node documents plus the
//! flattened fields the contact document carries, so reads stay within one
//! or two document hops. The pass is pure: no I/O, and identical input
//! always yields identical output.

pub mod classifier;

pub use classifier::{CountryCodeHeuristic, LocationClassifier};

use crate::contact::{
    CompanyNode, Contact, DistributionCapabilityInput, DistributionCapabilityNode,
    Experience, QualityBucketNode, TargetCriterionInput, TargetCriterionNode,
};
use crate::error::Result;
use crate::slug::slug;
use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

/// Thesis criterion dimensions with a denormalization route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetDimension {
    Industry,
    Location,
    RaisedCapital,
    Vertical,
    TypeOfGoodProduced,
    Headcount,
    EngineersHeadcount,
    FoundationYear,
    Skill,
    JobRole,
    DistributionCapability,
    Mrr,
}

impl TargetDimension {
    /// Parse a raw dimension string, tolerating case and separators
    ///
    /// "Raised Capital", "raised_capital" and "raisedCapital" all parse to
    /// `RaisedCapital`. Unknown dimensions yield `None` and are skipped by
    /// the routing step.
    pub fn parse(raw: &str) -> Option<TargetDimension> {
        let normalized: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "industry" => Some(TargetDimension::Industry),
            "location" => Some(TargetDimension::Location),
            "raisedcapital" => Some(TargetDimension::RaisedCapital),
            "vertical" => Some(TargetDimension::Vertical),
            "typeofgoodproduced" => Some(TargetDimension::TypeOfGoodProduced),
            "headcount" => Some(TargetDimension::Headcount),
            "engineersheadcount" => Some(TargetDimension::EngineersHeadcount),
            "foundationyear" => Some(TargetDimension::FoundationYear),
            "skill" => Some(TargetDimension::Skill),
            "jobrole" => Some(TargetDimension::JobRole),
            "distributioncapability" => Some(TargetDimension::DistributionCapability),
            "mrr" => Some(TargetDimension::Mrr),
            _ => None,
        }
    }
}

/// Field patch flattening produces for the contact document
///
/// Every array is always present, so stale derived values are overwritten
/// even when the new derivation is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactUpdates {
    pub current_company_id: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub raised_capital_range_ids: Vec<String>,
    pub raised_capital_range_labels: Vec<String>,
    pub distribution_capability_ids: Vec<String>,
    pub distribution_capability_labels: Vec<String>,
    pub distribution_quality_bucket_ids: Vec<String>,
    pub target_criterion_ids: Vec<String>,
    pub target_criterion_summaries: Vec<String>,
    pub experience_company_ids: Vec<String>,
    pub target_industries: Vec<String>,
    pub target_verticals: Vec<String>,
    pub target_skills: Vec<String>,
    pub target_roles: Vec<String>,
    pub target_product_types: Vec<String>,
    pub target_raised_capital_range_ids: Vec<String>,
    pub target_raised_capital_range_labels: Vec<String>,
    pub target_company_headcount_ranges: Vec<String>,
    pub target_engineering_headcount_ranges: Vec<String>,
    pub target_distribution_capability_ids: Vec<String>,
    pub target_distribution_capability_labels: Vec<String>,
    pub target_location_cities: Vec<String>,
    pub target_location_countries: Vec<String>,
    pub target_foundation_years: Vec<String>,
    pub target_mrr_ranges: Vec<String>,
    pub target_company_ids: Vec<String>,
}

impl ContactUpdates {
    /// Write the patch onto a contact
    pub fn apply_to(&self, contact: &mut Contact) {
        contact.current_company_id = self.current_company_id.clone();
        contact.email = self.email.clone();
        contact.linkedin_url = self.linkedin_url.clone();
        contact.raised_capital_range_ids = self.raised_capital_range_ids.clone();
        contact.raised_capital_range_labels = self.raised_capital_range_labels.clone();
        contact.distribution_capability_ids = self.distribution_capability_ids.clone();
        contact.distribution_capability_labels = self.distribution_capability_labels.clone();
        contact.distribution_quality_bucket_ids = self.distribution_quality_bucket_ids.clone();
        contact.target_criterion_ids = self.target_criterion_ids.clone();
        contact.target_criterion_summaries = self.target_criterion_summaries.clone();
        contact.experience_company_ids = self.experience_company_ids.clone();
        contact.target_industries = self.target_industries.clone();
        contact.target_verticals = self.target_verticals.clone();
        contact.target_skills = self.target_skills.clone();
        contact.target_roles = self.target_roles.clone();
        contact.target_product_types = self.target_product_types.clone();
        contact.target_raised_capital_range_ids = self.target_raised_capital_range_ids.clone();
        contact.target_raised_capital_range_labels =
            self.target_raised_capital_range_labels.clone();
        contact.target_company_headcount_ranges = self.target_company_headcount_ranges.clone();
        contact.target_engineering_headcount_ranges =
            self.target_engineering_headcount_ranges.clone();
        contact.target_distribution_capability_ids =
            self.target_distribution_capability_ids.clone();
        contact.target_distribution_capability_labels =
            self.target_distribution_capability_labels.clone();
        contact.target_location_cities = self.target_location_cities.clone();
        contact.target_location_countries = self.target_location_countries.clone();
        contact.target_foundation_years = self.target_foundation_years.clone();
        contact.target_mrr_ranges = self.target_mrr_ranges.clone();
        contact.target_company_ids = self.target_company_ids.clone();
    }
}

/// Everything one flatten pass derives
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedContact {
    pub companies: Vec<CompanyNode>,
    pub distribution_capabilities: Vec<DistributionCapabilityNode>,
    pub quality_buckets: Vec<QualityBucketNode>,
    pub target_criteria: Vec<TargetCriterionNode>,
    pub experience_company_ids: Vec<String>,
    pub contact_updates: ContactUpdates,
}

/// The normalization pass; holds the location classifier
pub struct Flattener {
    classifier: Box<dyn LocationClassifier>,
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener::new()
    }
}

impl Flattener {
    pub fn new() -> Self {
        Flattener {
            classifier: Box::new(CountryCodeHeuristic),
        }
    }

    pub fn with_classifier(classifier: Box<dyn LocationClassifier>) -> Self {
        Flattener { classifier }
    }

    /// Derive node documents and the contact field patch from raw input
    pub fn flatten(&self, contact: &Contact) -> Result<FlattenedContact> {
        let companies = normalize_companies(contact)?;
        let capabilities = normalize_capabilities(&contact.distribution_capabilities)?;
        let quality_buckets = build_quality_buckets(&contact.distribution_capabilities)?;
        let target_criteria = normalize_target_criteria(&contact.target_criteria)?;
        let experience_company_ids = collect_experience_company_ids(&contact.experiences)?;

        let mut updates = self.denormalize_target_criteria(&target_criteria)?;
        updates.raised_capital_range_ids = contact.raised_capital_range_ids.clone();
        updates.raised_capital_range_labels =
            build_raised_capital_labels(&contact.raised_capital_range_ids);
        updates.current_company_id = contact
            .current_company_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| companies.first().map(|c| c.id.clone()));
        updates.email = normalize_handle(contact.email.as_deref());
        updates.linkedin_url = normalize_handle(contact.linkedin_url.as_deref());
        updates.distribution_capability_ids = capabilities.iter().map(|c| c.id.clone()).collect();
        updates.distribution_capability_labels =
            capabilities.iter().map(|c| c.label.clone()).collect();
        updates.distribution_quality_bucket_ids =
            quality_buckets.iter().map(|b| b.id.clone()).collect();
        updates.target_criterion_ids = target_criteria.iter().map(|t| t.id.clone()).collect();
        updates.target_criterion_summaries =
            target_criteria.iter().map(|t| t.label.clone()).collect();
        updates.experience_company_ids = experience_company_ids.clone();

        Ok(FlattenedContact {
            companies,
            distribution_capabilities: capabilities,
            quality_buckets,
            target_criteria,
            experience_company_ids,
            contact_updates: updates,
        })
    }

    fn denormalize_target_criteria(
        &self,
        criteria: &[TargetCriterionNode],
    ) -> Result<ContactUpdates> {
        let mut industries = IndexSet::new();
        let mut verticals = IndexSet::new();
        let mut skills = IndexSet::new();
        let mut roles = IndexSet::new();
        let mut product_types = IndexSet::new();
        let mut raised_ids = IndexSet::new();
        let mut raised_labels = IndexSet::new();
        let mut headcounts = IndexSet::new();
        let mut eng_headcounts = IndexSet::new();
        let mut capability_ids = IndexSet::new();
        let mut capability_labels = IndexSet::new();
        let mut cities = IndexSet::new();
        let mut countries = IndexSet::new();
        let mut foundation_years = IndexSet::new();
        let mut mrr_ranges = IndexSet::new();

        for criterion in criteria {
            let Some(dimension) = TargetDimension::parse(&criterion.dimension) else {
                debug!(dimension = %criterion.dimension, "unroutable criterion dimension");
                continue;
            };
            let values = criterion_values(&criterion.value);
            match dimension {
                TargetDimension::Industry => industries.extend(values),
                TargetDimension::Vertical => verticals.extend(values),
                TargetDimension::Skill => skills.extend(values),
                TargetDimension::JobRole => roles.extend(values),
                TargetDimension::TypeOfGoodProduced => product_types.extend(values),
                TargetDimension::Headcount => headcounts.extend(values),
                TargetDimension::EngineersHeadcount => eng_headcounts.extend(values),
                TargetDimension::FoundationYear => foundation_years.extend(values),
                TargetDimension::Mrr => mrr_ranges.extend(values),
                TargetDimension::RaisedCapital => {
                    for value in values {
                        raised_ids.insert(slug(&value)?);
                        raised_labels.insert(value);
                    }
                }
                TargetDimension::DistributionCapability => {
                    for value in values {
                        capability_ids.insert(slug(&value)?);
                        capability_labels.insert(value);
                    }
                }
                TargetDimension::Location => {
                    for value in values {
                        if self.classifier.is_country_code(&value) {
                            countries.insert(value);
                        } else {
                            cities.insert(value);
                        }
                    }
                }
            }
        }

        Ok(ContactUpdates {
            target_industries: industries.into_iter().collect(),
            target_verticals: verticals.into_iter().collect(),
            target_skills: skills.into_iter().collect(),
            target_roles: roles.into_iter().collect(),
            target_product_types: product_types.into_iter().collect(),
            target_raised_capital_range_ids: raised_ids.into_iter().collect(),
            target_raised_capital_range_labels: raised_labels.into_iter().collect(),
            target_company_headcount_ranges: headcounts.into_iter().collect(),
            target_engineering_headcount_ranges: eng_headcounts.into_iter().collect(),
            target_distribution_capability_ids: capability_ids.into_iter().collect(),
            target_distribution_capability_labels: capability_labels.into_iter().collect(),
            target_location_cities: cities.into_iter().collect(),
            target_location_countries: countries.into_iter().collect(),
            target_foundation_years: foundation_years.into_iter().collect(),
            target_mrr_ranges: mrr_ranges.into_iter().collect(),
            ..ContactUpdates::default()
        })
    }
}

fn normalize_companies(contact: &Contact) -> Result<Vec<CompanyNode>> {
    struct Candidate<'a> {
        name: &'a str,
        industries: &'a [String],
        verticals: &'a [String],
    }

    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    for company in &contact.companies {
        candidates.push(Candidate {
            name: &company.name,
            industries: &company.industries,
            verticals: &company.verticals,
        });
    }
    if let Some(current) = contact.current_company.as_deref().filter(|s| !s.is_empty()) {
        candidates.push(Candidate {
            name: current,
            industries: &contact.industries,
            verticals: &contact.verticals,
        });
    }
    for name in &contact.past_companies {
        candidates.push(Candidate {
            name,
            industries: &[],
            verticals: &[],
        });
    }
    for experience in &contact.experiences {
        if let Some(name) = experience.company_name.as_deref().filter(|s| !s.is_empty()) {
            candidates.push(Candidate {
                name,
                industries: &[],
                verticals: &[],
            });
        }
    }

    let mut seen: IndexSet<String> = IndexSet::new();
    let mut companies = Vec::new();
    for candidate in candidates {
        if candidate.name.is_empty() {
            continue;
        }
        let id = slug(candidate.name)?;
        if !seen.insert(id.clone()) {
            continue;
        }
        companies.push(CompanyNode {
            id,
            name: candidate.name.to_string(),
            industries: candidate.industries.to_vec(),
            verticals: candidate.verticals.to_vec(),
            contact_ids: Vec::new(),
        });
    }
    Ok(companies)
}

fn normalize_capabilities(
    inputs: &[DistributionCapabilityInput],
) -> Result<Vec<DistributionCapabilityNode>> {
    let mut capabilities = Vec::new();
    for input in inputs {
        if input.distribution_type.is_empty() {
            continue;
        }
        let label_part = input
            .label
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("default");
        let id = slug(&format!("{}_{}", input.distribution_type, label_part))?;
        capabilities.push(DistributionCapabilityNode {
            id,
            distribution_type: input.distribution_type.clone(),
            label: input
                .label
                .clone()
                .unwrap_or_else(|| input.distribution_type.clone()),
            contact_ids: Vec::new(),
        });
    }
    Ok(capabilities)
}

fn build_quality_buckets(
    inputs: &[DistributionCapabilityInput],
) -> Result<Vec<QualityBucketNode>> {
    let mut buckets = Vec::new();
    for input in inputs {
        if input.distribution_type.is_empty() {
            continue;
        }
        let Some(score) = input.numeric_quality_score() else {
            continue;
        };
        let normalized = score.clamp(0.0, 1.0);
        let bucket = ((normalized * 10.0).round() as i64).clamp(1, 10) as u8;
        let id = slug(&format!("{}_quality_{}", input.distribution_type, bucket))?;
        buckets.push(QualityBucketNode {
            id,
            distribution_type: input.distribution_type.clone(),
            bucket,
            label: format!("{} quality {}", input.distribution_type, bucket),
            contact_ids: Vec::new(),
        });
    }
    Ok(buckets)
}

fn normalize_target_criteria(
    inputs: &[TargetCriterionInput],
) -> Result<Vec<TargetCriterionNode>> {
    let mut criteria = Vec::new();
    for input in inputs {
        let label = match &input.label {
            Some(label) => label.clone(),
            None => format!(
                "{} {} {}",
                input.dimension,
                input.operator,
                render_value(&input.value)
            ),
        };
        criteria.push(TargetCriterionNode {
            id: slug(&label)?,
            label,
            dimension: input.dimension.clone(),
            operator: input.operator.clone(),
            value: input.value.clone(),
        });
    }
    Ok(criteria)
}

fn collect_experience_company_ids(experiences: &[Experience]) -> Result<Vec<String>> {
    let mut ids: IndexSet<String> = IndexSet::new();
    for experience in experiences {
        if let Some(id) = experience.company_id.as_deref().filter(|s| !s.is_empty()) {
            ids.insert(id.to_string());
        } else if let Some(name) = experience.company_name.as_deref().filter(|s| !s.is_empty()) {
            ids.insert(slug(name)?);
        }
    }
    Ok(ids.into_iter().collect())
}

fn build_raised_capital_labels(range_ids: &[String]) -> Vec<String> {
    range_ids.iter().map(|id| title_case_id(id)).collect()
}

fn title_case_id(id: &str) -> String {
    let spaced = id.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut at_boundary = true;
    for c in spaced.chars() {
        let is_word = c.is_ascii_alphanumeric();
        if at_boundary && is_word {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_boundary = !is_word;
    }
    out
}

/// Trimmed lowercase form of an identity handle, `None` when blank
pub(crate) fn normalize_handle(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn criterion_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(render_scalar).collect(),
        other => vec![render_scalar(other)],
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join(" – "),
        other => render_scalar(other),
    }
}
