//! Contact document model
//!
//! The contact is the widest document in the system: raw profile input,
//! derived node ids, the denormalized thesis arrays, and the cached
//! pipeline counters all live on the one document. Array fields default to
//! empty so partial documents deserialize cleanly.

use crate::error::Result;
use crate::intro::{ActionStatus, StageCounts};
use crate::store::{AttributeField, Document, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which side of an introduction a contact can sit on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Founder,
    Investor,
    Both,
}

impl ContactType {
    /// Whether a contact of this type can serve as a `wanted` match target
    pub fn satisfies(&self, wanted: ContactType) -> bool {
        *self == wanted || *self == ContactType::Both
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactType::Founder => write!(f, "founder"),
            ContactType::Investor => write!(f, "investor"),
            ContactType::Both => write!(f, "both"),
        }
    }
}

/// Explicitly provided company affiliation; the node id derives from the name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInput {
    pub name: String,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub verticals: Vec<String>,
}

/// One work-history entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Raw distribution channel input before normalization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionCapabilityInput {
    #[serde(default)]
    pub distribution_type: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Kept as raw JSON; anything non-numeric is ignored downstream
    #[serde(default)]
    pub quality_score: Option<Value>,
}

impl DistributionCapabilityInput {
    pub fn numeric_quality_score(&self) -> Option<f64> {
        self.quality_score.as_ref().and_then(|v| v.as_f64())
    }
}

/// Raw investment-thesis criterion before normalization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetCriterionInput {
    #[serde(default)]
    pub label: Option<String>,
    pub dimension: String,
    pub operator: String,
    pub value: Value,
}

/// A founder or investor profile with its derived fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub headline: String,
    pub contact_type: ContactType,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,

    // Reverse-indexed attribute arrays
    #[serde(default)]
    pub job_to_be_done: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub verticals: Vec<String>,
    #[serde(default)]
    pub product_types: Vec<String>,
    #[serde(default)]
    pub funding_stages: Vec<String>,
    #[serde(default)]
    pub company_headcount_ranges: Vec<String>,
    #[serde(default)]
    pub engineering_headcount_ranges: Vec<String>,
    #[serde(default)]
    pub target_domains: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,

    // Profile extras
    #[serde(default)]
    pub seniority_levels: Vec<String>,
    #[serde(default)]
    pub founder_roles: Vec<String>,
    #[serde(default)]
    pub investor_roles: Vec<String>,
    #[serde(default)]
    pub stage_preferences: Vec<String>,
    #[serde(default)]
    pub check_size_range: Vec<String>,
    #[serde(default)]
    pub team_size_preferences: Vec<String>,
    #[serde(default)]
    pub founder_seniority_preferences: Vec<String>,
    #[serde(default)]
    pub engineering_headcount_preferences: Vec<String>,
    #[serde(default)]
    pub revenue_model_preferences: Vec<String>,
    #[serde(default)]
    pub risk_tolerance_preferences: Vec<String>,
    #[serde(default)]
    pub raised_capital_range_ids: Vec<String>,
    #[serde(default)]
    pub raised_capital_range_labels: Vec<String>,

    // Companies
    #[serde(default)]
    pub current_company: Option<String>,
    #[serde(default)]
    pub current_company_id: Option<String>,
    #[serde(default)]
    pub current_role: Option<String>,
    #[serde(default)]
    pub past_companies: Vec<String>,
    #[serde(default)]
    pub companies: Vec<CompanyInput>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub experience_company_ids: Vec<String>,

    // Distribution
    #[serde(default)]
    pub distribution_capabilities: Vec<DistributionCapabilityInput>,
    #[serde(default)]
    pub distribution_capability_ids: Vec<String>,
    #[serde(default)]
    pub distribution_capability_labels: Vec<String>,
    #[serde(default)]
    pub distribution_quality_bucket_ids: Vec<String>,

    // Thesis criteria
    #[serde(default)]
    pub target_criteria: Vec<TargetCriterionInput>,
    #[serde(default)]
    pub target_criterion_ids: Vec<String>,
    #[serde(default)]
    pub target_criterion_summaries: Vec<String>,

    // Denormalized thesis arrays
    #[serde(default)]
    pub target_industries: Vec<String>,
    #[serde(default)]
    pub target_verticals: Vec<String>,
    #[serde(default)]
    pub target_skills: Vec<String>,
    #[serde(default)]
    pub target_roles: Vec<String>,
    #[serde(default)]
    pub target_product_types: Vec<String>,
    #[serde(default)]
    pub target_raised_capital_range_ids: Vec<String>,
    #[serde(default)]
    pub target_raised_capital_range_labels: Vec<String>,
    #[serde(default)]
    pub target_company_headcount_ranges: Vec<String>,
    #[serde(default)]
    pub target_engineering_headcount_ranges: Vec<String>,
    #[serde(default)]
    pub target_distribution_capability_ids: Vec<String>,
    #[serde(default)]
    pub target_distribution_capability_labels: Vec<String>,
    #[serde(default)]
    pub target_location_cities: Vec<String>,
    #[serde(default)]
    pub target_location_countries: Vec<String>,
    #[serde(default)]
    pub target_foundation_years: Vec<String>,
    #[serde(default)]
    pub target_mrr_ranges: Vec<String>,
    #[serde(default)]
    pub target_company_ids: Vec<String>,

    // Pipeline cache
    #[serde(default)]
    pub stage_counts: Option<StageCounts>,
    #[serde(default)]
    pub action_status: Option<ActionStatus>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Default for Contact {
    fn default() -> Self {
        let now = Utc::now();
        Contact {
            id: String::new(),
            full_name: String::new(),
            headline: String::new(),
            contact_type: ContactType::Founder,
            tag: None,
            linkedin_url: None,
            email: None,
            location_city: None,
            location_country: None,
            job_to_be_done: Vec::new(),
            skills: Vec::new(),
            industries: Vec::new(),
            verticals: Vec::new(),
            product_types: Vec::new(),
            funding_stages: Vec::new(),
            company_headcount_ranges: Vec::new(),
            engineering_headcount_ranges: Vec::new(),
            target_domains: Vec::new(),
            roles: Vec::new(),
            seniority_levels: Vec::new(),
            founder_roles: Vec::new(),
            investor_roles: Vec::new(),
            stage_preferences: Vec::new(),
            check_size_range: Vec::new(),
            team_size_preferences: Vec::new(),
            founder_seniority_preferences: Vec::new(),
            engineering_headcount_preferences: Vec::new(),
            revenue_model_preferences: Vec::new(),
            risk_tolerance_preferences: Vec::new(),
            raised_capital_range_ids: Vec::new(),
            raised_capital_range_labels: Vec::new(),
            current_company: None,
            current_company_id: None,
            current_role: None,
            past_companies: Vec::new(),
            companies: Vec::new(),
            experiences: Vec::new(),
            experience_company_ids: Vec::new(),
            distribution_capabilities: Vec::new(),
            distribution_capability_ids: Vec::new(),
            distribution_capability_labels: Vec::new(),
            distribution_quality_bucket_ids: Vec::new(),
            target_criteria: Vec::new(),
            target_criterion_ids: Vec::new(),
            target_criterion_summaries: Vec::new(),
            target_industries: Vec::new(),
            target_verticals: Vec::new(),
            target_skills: Vec::new(),
            target_roles: Vec::new(),
            target_product_types: Vec::new(),
            target_raised_capital_range_ids: Vec::new(),
            target_raised_capital_range_labels: Vec::new(),
            target_company_headcount_ranges: Vec::new(),
            target_engineering_headcount_ranges: Vec::new(),
            target_distribution_capability_ids: Vec::new(),
            target_distribution_capability_labels: Vec::new(),
            target_location_cities: Vec::new(),
            target_location_countries: Vec::new(),
            target_foundation_years: Vec::new(),
            target_mrr_ranges: Vec::new(),
            target_company_ids: Vec::new(),
            stage_counts: None,
            action_status: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Contact {
    /// Minimal contact for a name and type; everything else defaulted
    pub fn new(id: impl Into<String>, full_name: impl Into<String>, contact_type: ContactType) -> Self {
        Contact {
            id: id.into(),
            full_name: full_name.into(),
            contact_type,
            ..Default::default()
        }
    }

    /// The values of one reverse-indexed attribute field
    pub fn attribute_values(&self, field: AttributeField) -> &[String] {
        match field {
            AttributeField::JobToBeDone => &self.job_to_be_done,
            AttributeField::Skills => &self.skills,
            AttributeField::Industries => &self.industries,
            AttributeField::Verticals => &self.verticals,
            AttributeField::ProductTypes => &self.product_types,
            AttributeField::FundingStages => &self.funding_stages,
            AttributeField::CompanyHeadcountRanges => &self.company_headcount_ranges,
            AttributeField::EngineeringHeadcountRanges => &self.engineering_headcount_ranges,
            AttributeField::TargetDomains => &self.target_domains,
            AttributeField::Roles => &self.roles,
            AttributeField::DistributionCapabilityIds => &self.distribution_capability_ids,
            AttributeField::DistributionQualityBucketIds => &self.distribution_quality_bucket_ids,
        }
    }

    pub fn to_document(&self) -> Result<Document> {
        Ok(serde_json::to_value(self).map_err(StoreError::from)?)
    }

    pub fn from_document(doc: Document) -> Result<Contact> {
        Ok(serde_json::from_value(doc).map_err(StoreError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contact_type_satisfies() {
        assert!(ContactType::Founder.satisfies(ContactType::Founder));
        assert!(ContactType::Both.satisfies(ContactType::Founder));
        assert!(ContactType::Both.satisfies(ContactType::Investor));
        assert!(!ContactType::Investor.satisfies(ContactType::Founder));
    }

    #[test]
    fn test_partial_document_deserializes() {
        let doc = json!({
            "id": "c1",
            "full_name": "Ada Lovelace",
            "contact_type": "founder",
            "skills": ["python"]
        });
        let contact = Contact::from_document(doc).unwrap();
        assert_eq!(contact.skills, vec!["python"]);
        assert!(contact.industries.is_empty());
        assert!(contact.stage_counts.is_none());
    }

    #[test]
    fn test_attribute_values_accessor() {
        let mut contact = Contact::new("c1", "Ada", ContactType::Founder);
        contact.skills = vec!["rust".to_string()];
        contact.distribution_capability_ids = vec!["newsletter_default".to_string()];
        assert_eq!(contact.attribute_values(AttributeField::Skills), ["rust"]);
        assert_eq!(
            contact.attribute_values(AttributeField::DistributionCapabilityIds),
            ["newsletter_default"]
        );
        assert!(contact.attribute_values(AttributeField::Roles).is_empty());
    }

    #[test]
    fn test_round_trip_preserves_type() {
        let contact = Contact::new("c1", "Ada", ContactType::Both);
        let doc = contact.to_document().unwrap();
        assert_eq!(doc["contact_type"], "both");
        let back = Contact::from_document(doc).unwrap();
        assert_eq!(back.contact_type, ContactType::Both);
    }

    #[test]
    fn test_quality_score_numeric_only() {
        let numeric = DistributionCapabilityInput {
            distribution_type: "newsletter".to_string(),
            label: None,
            quality_score: Some(json!(0.8)),
        };
        assert_eq!(numeric.numeric_quality_score(), Some(0.8));

        let textual = DistributionCapabilityInput {
            distribution_type: "newsletter".to_string(),
            label: None,
            quality_score: Some(json!("high")),
        };
        assert_eq!(textual.numeric_quality_score(), None);
    }
}
