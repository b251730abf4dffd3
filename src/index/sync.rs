//! Contact write-path synchronization
//!
//! Every indexed attribute field maps to a collection of per-value
//! documents whose `contact_ids` arrays are the reverse index. Sync diffs
//! the old and new contact state on the raw values, slugs each changed
//! value into its document id, and commits all membership updates as one
//! atomic batch. The batch is intentionally not atomic with the contact
//! write itself; a failed sync converges on the next one.

use crate::contact::Contact;
use crate::error::{Error, Result};
use crate::flatten::{normalize_handle, Flattener};
use crate::metrics::{MetricsSink, OperationTimer};
use crate::slug::normalize_value;
use crate::store::{
    AttributeField, DocumentStore, FieldOp, WriteBatch, ALL_MAPPINGS, COLLECTION_CONTACTS,
};
use chrono::Utc;
use indexmap::IndexSet;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// What one sync pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Memberships added across all index collections
    pub added: usize,
    /// Memberships removed
    pub removed: usize,
    /// Index documents auto-created for first-seen values
    pub created_docs: usize,
}

/// Write-path engine for contacts and their reverse indexes
pub struct ReverseIndexer {
    pub(super) store: Arc<dyn DocumentStore>,
    metrics: Arc<dyn MetricsSink>,
    flattener: Flattener,
}

impl ReverseIndexer {
    pub fn new(store: Arc<dyn DocumentStore>, metrics: Arc<dyn MetricsSink>) -> Self {
        ReverseIndexer {
            store,
            metrics,
            flattener: Flattener::new(),
        }
    }

    /// Reconcile index membership with a contact state change
    ///
    /// `old = None` is creation, `new = None` is deletion. Index documents
    /// are created on first use but never deleted; a removal whose target
    /// document is already absent is skipped, since absence is the state
    /// the removal wants.
    pub async fn sync(
        &self,
        contact_id: &str,
        old: Option<&Contact>,
        new: Option<&Contact>,
    ) -> Result<SyncReport> {
        let _timer = OperationTimer::start(self.metrics.as_ref(), "contact_sync");
        let mut batch = WriteBatch::new();
        let mut report = SyncReport::default();
        let now = Utc::now();

        for mapping in ALL_MAPPINGS {
            let old_values = attribute_set(old, mapping.field);
            let new_values = attribute_set(new, mapping.field);

            for raw in old_values.difference(&new_values) {
                let doc_id = normalize_value(raw)?;
                if self.store.get(mapping.collection, &doc_id).await?.is_none() {
                    debug!(
                        collection = mapping.collection,
                        id = %doc_id,
                        "removal target already absent"
                    );
                    continue;
                }
                batch.update(
                    mapping.collection,
                    &doc_id,
                    vec![
                        (
                            "contact_ids".to_string(),
                            FieldOp::ArrayRemove(vec![json!(contact_id)]),
                        ),
                        ("updated_at".to_string(), FieldOp::Set(json!(now))),
                    ],
                );
                report.removed += 1;
            }

            for raw in new_values.difference(&old_values) {
                let doc_id = normalize_value(raw)?;
                if self.store.get(mapping.collection, &doc_id).await?.is_none() {
                    batch.set(
                        mapping.collection,
                        &doc_id,
                        json!({
                            "id": doc_id,
                            "label": raw,
                            "contact_ids": [],
                            "updated_at": now,
                        }),
                        false,
                    );
                    report.created_docs += 1;
                }
                batch.update(
                    mapping.collection,
                    &doc_id,
                    vec![
                        (
                            "contact_ids".to_string(),
                            FieldOp::ArrayUnion(vec![json!(contact_id)]),
                        ),
                        ("updated_at".to_string(), FieldOp::Set(json!(now))),
                    ],
                );
                report.added += 1;
            }
        }

        if !batch.is_empty() {
            self.store.commit(batch).await?;
        }

        self.metrics
            .increment("contact_sync", 1, &[("outcome", "ok")]);
        debug!(
            contact_id,
            added = report.added,
            removed = report.removed,
            created = report.created_docs,
            "index sync committed"
        );
        Ok(report)
    }

    /// Create a contact under a server-assigned id
    ///
    /// Any id on the input is ignored. A profile whose normalized email or
    /// LinkedIn URL already belongs to a stored contact is not written
    /// again; that contact is returned unchanged.
    pub async fn create_contact(&self, contact: Contact) -> Result<Contact> {
        if let Some(existing) = self.find_existing(&contact).await? {
            info!(contact_id = %existing.id, "create matched an existing profile");
            self.metrics
                .increment("contact_create", 1, &[("outcome", "duplicate")]);
            return Ok(existing);
        }

        let mut contact = contact;
        contact.id = Uuid::new_v4().to_string();
        self.metrics
            .increment("contact_create", 1, &[("outcome", "created")]);
        self.create_or_update_contact(contact).await
    }

    async fn find_existing(&self, contact: &Contact) -> Result<Option<Contact>> {
        for (field, value) in [
            ("email", contact.email.as_deref()),
            ("linkedin_url", contact.linkedin_url.as_deref()),
        ] {
            let Some(handle) = normalize_handle(value) else {
                continue;
            };
            let docs = self
                .store
                .find_by_field(COLLECTION_CONTACTS, field, &json!(handle))
                .await?;
            if let Some(doc) = docs.into_iter().next() {
                return Ok(Some(Contact::from_document(doc)?));
            }
        }
        Ok(None)
    }

    /// Flatten, write, and fully synchronize one contact
    ///
    /// Returns the contact as stored, with all derived fields applied.
    pub async fn create_or_update_contact(&self, contact: Contact) -> Result<Contact> {
        let _timer = OperationTimer::start(self.metrics.as_ref(), "contact_upsert");
        let mut contact = contact;

        let old = match self.store.get(COLLECTION_CONTACTS, &contact.id).await? {
            Some(doc) => Some(Contact::from_document(doc)?),
            None => None,
        };

        let flattened = self.flattener.flatten(&contact)?;
        flattened.contact_updates.apply_to(&mut contact);
        if let Some(previous) = &old {
            contact.created_at = previous.created_at;
        }
        contact.updated_at = Utc::now();

        self.store
            .set(COLLECTION_CONTACTS, &contact.id, contact.to_document()?, true)
            .await?;

        self.sync_company_nodes(&contact.id, &flattened.companies)
            .await?;
        self.sync_capability_nodes(
            &contact.id,
            &flattened.distribution_capabilities,
            &flattened.quality_buckets,
        )
        .await?;

        let report = self.sync(&contact.id, old.as_ref(), Some(&contact)).await?;
        info!(
            contact_id = %contact.id,
            created = old.is_none(),
            added = report.added,
            removed = report.removed,
            "contact upserted"
        );
        self.metrics.increment("contact_upsert", 1, &[]);
        Ok(contact)
    }

    /// Remove a contact and empty its index memberships
    ///
    /// Index and node documents stay behind with the contact id removed.
    pub async fn delete_contact(&self, contact_id: &str) -> Result<()> {
        let doc = self
            .store
            .get(COLLECTION_CONTACTS, contact_id)
            .await?
            .ok_or_else(|| Error::contact_not_found(contact_id))?;
        let old = Contact::from_document(doc)?;

        self.sync(contact_id, Some(&old), None).await?;
        self.store.delete(COLLECTION_CONTACTS, contact_id).await?;

        info!(contact_id, "contact deleted");
        self.metrics.increment("contact_delete", 1, &[]);
        Ok(())
    }
}

fn attribute_set(contact: Option<&Contact>, field: AttributeField) -> IndexSet<String> {
    contact
        .map(|c| c.attribute_values(field).iter().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactType;
    use crate::metrics::RecordingSink;
    use crate::store::MemoryStore;

    fn indexer_with(store: Arc<MemoryStore>) -> ReverseIndexer {
        ReverseIndexer::new(store, Arc::new(RecordingSink::new()))
    }

    fn contact_with_skills(skills: &[&str]) -> Contact {
        let mut contact = Contact::new("c1", "Ada Lovelace", ContactType::Founder);
        contact.skills = skills.iter().map(|s| s.to_string()).collect();
        contact
    }

    #[tokio::test]
    async fn test_initial_sync_creates_and_joins() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let contact = contact_with_skills(&["Python", "Rust"]);

        let report = indexer.sync("c1", None, Some(&contact)).await.unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.removed, 0);
        assert_eq!(report.created_docs, 2);

        let doc = store.get("skills_index", "python").await.unwrap().unwrap();
        assert_eq!(doc["label"], "Python");
        assert_eq!(doc["contact_ids"], serde_json::json!(["c1"]));
    }

    #[tokio::test]
    async fn test_diff_sync_moves_membership() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let old = contact_with_skills(&["Python", "Go"]);
        indexer.sync("c1", None, Some(&old)).await.unwrap();

        let new = contact_with_skills(&["Go", "Rust"]);
        let report = indexer.sync("c1", Some(&old), Some(&new)).await.unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 1);

        let python = store.get("skills_index", "python").await.unwrap().unwrap();
        assert_eq!(python["contact_ids"], serde_json::json!([]));
        let go = store.get("skills_index", "go").await.unwrap().unwrap();
        assert_eq!(go["contact_ids"], serde_json::json!(["c1"]));
        let rust = store.get("skills_index", "rust").await.unwrap().unwrap();
        assert_eq!(rust["contact_ids"], serde_json::json!(["c1"]));
    }

    #[tokio::test]
    async fn test_removal_of_absent_doc_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());

        // Old state claims a skill whose index doc was never written.
        let old = contact_with_skills(&["Phantom Skill"]);
        let new = contact_with_skills(&[]);
        let report = indexer.sync("c1", Some(&old), Some(&new)).await.unwrap();

        assert_eq!(report.removed, 0);
        assert!(store
            .get("skills_index", "phantom_skill")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unsluggable_value_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let contact = contact_with_skills(&["!!!"]);

        let err = indexer.sync("c1", None, Some(&contact)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_same_values_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let contact = contact_with_skills(&["Rust"]);
        indexer.sync("c1", None, Some(&contact)).await.unwrap();

        let report = indexer
            .sync("c1", Some(&contact), Some(&contact))
            .await
            .unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());

        let first = indexer
            .create_or_update_contact(contact_with_skills(&["Rust"]))
            .await
            .unwrap();

        let mut changed = contact_with_skills(&["Rust", "Python"]);
        changed.full_name = "Ada L.".to_string();
        let second = indexer.create_or_update_contact(changed).await.unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.full_name, "Ada L.");
    }

    #[tokio::test]
    async fn test_upsert_applies_derived_fields() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());

        let mut contact = contact_with_skills(&[]);
        contact.current_company = Some("Acme Corp".to_string());
        let stored = indexer.create_or_update_contact(contact).await.unwrap();

        assert_eq!(stored.current_company_id.as_deref(), Some("acme_corp"));
        let company = store.get("companies", "acme_corp").await.unwrap().unwrap();
        assert_eq!(company["name"], "Acme Corp");
        assert_eq!(company["contact_ids"], serde_json::json!(["c1"]));
    }

    #[tokio::test]
    async fn test_create_assigns_server_id() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());

        let mut input = Contact::new("ignored", "Grace Hopper", ContactType::Investor);
        input.email = Some("grace@example.com".to_string());
        let created = indexer.create_contact(input).await.unwrap();

        assert_ne!(created.id, "ignored");
        assert_eq!(created.id.len(), 36);
        assert!(store
            .get(COLLECTION_CONTACTS, &created.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_create_dedupes_by_email() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());

        let mut original = contact_with_skills(&["Rust"]);
        original.email = Some("Ada@Example.com".to_string());
        indexer.create_or_update_contact(original).await.unwrap();

        let mut duplicate = Contact::new("", "Someone Else", ContactType::Founder);
        duplicate.email = Some("  ADA@example.COM ".to_string());
        let found = indexer.create_contact(duplicate).await.unwrap();

        // The stored profile wins; nothing new is written.
        assert_eq!(found.id, "c1");
        assert_eq!(found.full_name, "Ada Lovelace");
        assert_eq!(store.list_ids(COLLECTION_CONTACTS, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_dedupes_by_linkedin() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());

        let mut original = contact_with_skills(&[]);
        original.linkedin_url = Some("https://linkedin.com/in/ada".to_string());
        indexer.create_or_update_contact(original).await.unwrap();

        let mut duplicate = Contact::new("", "Someone Else", ContactType::Founder);
        duplicate.linkedin_url = Some("https://LinkedIn.com/in/Ada".to_string());
        let found = indexer.create_contact(duplicate).await.unwrap();
        assert_eq!(found.id, "c1");
    }

    #[tokio::test]
    async fn test_delete_contact_empties_membership() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        indexer
            .create_or_update_contact(contact_with_skills(&["Rust"]))
            .await
            .unwrap();

        indexer.delete_contact("c1").await.unwrap();

        assert!(store.get("contacts", "c1").await.unwrap().is_none());
        let rust = store.get("skills_index", "rust").await.unwrap().unwrap();
        assert_eq!(rust["contact_ids"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_delete_missing_contact_fails() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer_with(store.clone());
        let err = indexer.delete_contact("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.to_string(), "Contact ghost not found");
    }
}
