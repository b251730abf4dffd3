//! Derived node upserts
//!
//! Companies, distribution capabilities, and quality buckets are shared
//! documents: many contacts point at the same node. Upserts merge the node
//! fields and union the contact id, so concurrent writers never clobber
//! each other's membership.

use super::sync::ReverseIndexer;
use crate::contact::{CompanyNode, DistributionCapabilityNode, QualityBucketNode};
use crate::error::Result;
use crate::store::{
    FieldOp, WriteBatch, COLLECTION_COMPANIES, COLLECTION_DISTRIBUTION_CAPABILITIES,
    COLLECTION_DISTRIBUTION_QUALITY_BUCKETS,
};
use chrono::Utc;
use serde_json::json;
use tracing::debug;

impl ReverseIndexer {
    /// Upsert company nodes and join the contact to each
    pub async fn sync_company_nodes(
        &self,
        contact_id: &str,
        companies: &[CompanyNode],
    ) -> Result<()> {
        if companies.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut batch = WriteBatch::new();
        for company in companies {
            batch.set(
                COLLECTION_COMPANIES,
                &company.id,
                json!({
                    "id": company.id,
                    "name": company.name,
                    "industries": company.industries,
                    "verticals": company.verticals,
                    "updated_at": now,
                }),
                true,
            );
            batch.update(
                COLLECTION_COMPANIES,
                &company.id,
                vec![(
                    "contact_ids".to_string(),
                    FieldOp::ArrayUnion(vec![json!(contact_id)]),
                )],
            );
        }
        self.store.commit(batch).await?;
        debug!(contact_id, count = companies.len(), "company nodes upserted");
        Ok(())
    }

    /// Upsert capability and quality-bucket nodes and join the contact
    pub async fn sync_capability_nodes(
        &self,
        contact_id: &str,
        capabilities: &[DistributionCapabilityNode],
        buckets: &[QualityBucketNode],
    ) -> Result<()> {
        if capabilities.is_empty() && buckets.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut batch = WriteBatch::new();
        for capability in capabilities {
            batch.set(
                COLLECTION_DISTRIBUTION_CAPABILITIES,
                &capability.id,
                json!({
                    "id": capability.id,
                    "distribution_type": capability.distribution_type,
                    "label": capability.label,
                    "updated_at": now,
                }),
                true,
            );
            batch.update(
                COLLECTION_DISTRIBUTION_CAPABILITIES,
                &capability.id,
                vec![(
                    "contact_ids".to_string(),
                    FieldOp::ArrayUnion(vec![json!(contact_id)]),
                )],
            );
        }
        for bucket in buckets {
            batch.set(
                COLLECTION_DISTRIBUTION_QUALITY_BUCKETS,
                &bucket.id,
                json!({
                    "id": bucket.id,
                    "distribution_type": bucket.distribution_type,
                    "bucket": bucket.bucket,
                    "label": bucket.label,
                    "updated_at": now,
                }),
                true,
            );
            batch.update(
                COLLECTION_DISTRIBUTION_QUALITY_BUCKETS,
                &bucket.id,
                vec![(
                    "contact_ids".to_string(),
                    FieldOp::ArrayUnion(vec![json!(contact_id)]),
                )],
            );
        }
        self.store.commit(batch).await?;
        debug!(
            contact_id,
            capabilities = capabilities.len(),
            buckets = buckets.len(),
            "capability nodes upserted"
        );
        Ok(())
    }
}
