//! Contact documents and derived node documents

pub mod model;
pub mod nodes;

pub use model::{
    CompanyInput, Contact, ContactType, DistributionCapabilityInput, Experience,
    TargetCriterionInput,
};
pub use nodes::{CompanyNode, DistributionCapabilityNode, QualityBucketNode, TargetCriterionNode};
