//! Collection names and the attribute-to-index mapping table
//!
//! The table is the single source of truth for which contact fields are
//! reverse-indexed and where their index documents live. It is const:
//! changing it means changing code, never runtime state.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const COLLECTION_CONTACTS: &str = "contacts";
pub const COLLECTION_INTRODUCTIONS: &str = "introductions";
pub const COLLECTION_COMPANIES: &str = "companies";
pub const COLLECTION_DISTRIBUTION_CAPABILITIES: &str = "distribution_capabilities";
pub const COLLECTION_DISTRIBUTION_QUALITY_BUCKETS: &str = "distribution_quality_buckets";

/// A reverse-indexed contact field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeField {
    JobToBeDone,
    Skills,
    Industries,
    Verticals,
    ProductTypes,
    FundingStages,
    CompanyHeadcountRanges,
    EngineeringHeadcountRanges,
    TargetDomains,
    Roles,
    DistributionCapabilityIds,
    DistributionQualityBucketIds,
}

impl AttributeField {
    /// The contact document field holding the indexed values
    pub fn field_name(&self) -> &'static str {
        self.mapping().field_name
    }

    /// The collection holding this field's index documents
    pub fn collection(&self) -> &'static str {
        self.mapping().collection
    }

    fn mapping(&self) -> &'static AttributeMapping {
        mapping_for(*self)
    }

    /// Parse a field name back into the enum
    pub fn from_field_name(name: &str) -> Option<AttributeField> {
        ALL_MAPPINGS
            .iter()
            .find(|m| m.field_name == name)
            .map(|m| m.field)
    }
}

impl fmt::Display for AttributeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// One row of the mapping table
#[derive(Debug, Clone, Copy)]
pub struct AttributeMapping {
    pub field: AttributeField,
    pub field_name: &'static str,
    pub collection: &'static str,
}

/// Every indexed field, in fixed table order
pub const ALL_MAPPINGS: &[AttributeMapping] = &[
    AttributeMapping {
        field: AttributeField::JobToBeDone,
        field_name: "job_to_be_done",
        collection: "job_to_be_done_index",
    },
    AttributeMapping {
        field: AttributeField::Skills,
        field_name: "skills",
        collection: "skills_index",
    },
    AttributeMapping {
        field: AttributeField::Industries,
        field_name: "industries",
        collection: "industries_index",
    },
    AttributeMapping {
        field: AttributeField::Verticals,
        field_name: "verticals",
        collection: "verticals_index",
    },
    AttributeMapping {
        field: AttributeField::ProductTypes,
        field_name: "product_types",
        collection: "product_types_index",
    },
    AttributeMapping {
        field: AttributeField::FundingStages,
        field_name: "funding_stages",
        collection: "funding_stages_index",
    },
    AttributeMapping {
        field: AttributeField::CompanyHeadcountRanges,
        field_name: "company_headcount_ranges",
        collection: "company_headcount_index",
    },
    AttributeMapping {
        field: AttributeField::EngineeringHeadcountRanges,
        field_name: "engineering_headcount_ranges",
        collection: "engineering_headcount_index",
    },
    AttributeMapping {
        field: AttributeField::TargetDomains,
        field_name: "target_domains",
        collection: "target_domains_index",
    },
    AttributeMapping {
        field: AttributeField::Roles,
        field_name: "roles",
        collection: "roles_index",
    },
    AttributeMapping {
        field: AttributeField::DistributionCapabilityIds,
        field_name: "distribution_capability_ids",
        collection: COLLECTION_DISTRIBUTION_CAPABILITIES,
    },
    AttributeMapping {
        field: AttributeField::DistributionQualityBucketIds,
        field_name: "distribution_quality_bucket_ids",
        collection: COLLECTION_DISTRIBUTION_QUALITY_BUCKETS,
    },
];

/// Look up the table row for a field
pub fn mapping_for(field: AttributeField) -> &'static AttributeMapping {
    let idx = match field {
        AttributeField::JobToBeDone => 0,
        AttributeField::Skills => 1,
        AttributeField::Industries => 2,
        AttributeField::Verticals => 3,
        AttributeField::ProductTypes => 4,
        AttributeField::FundingStages => 5,
        AttributeField::CompanyHeadcountRanges => 6,
        AttributeField::EngineeringHeadcountRanges => 7,
        AttributeField::TargetDomains => 8,
        AttributeField::Roles => 9,
        AttributeField::DistributionCapabilityIds => 10,
        AttributeField::DistributionQualityBucketIds => 11,
    };
    &ALL_MAPPINGS[idx]
}
