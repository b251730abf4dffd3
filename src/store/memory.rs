//! In-memory document store
//!
//! Backs the tests and the demo binary. A single `RwLock` over the whole
//! collection map makes batches and transactions trivially atomic: the
//! write lock is held for the full batch or closure.

use super::{
    BatchOp, Document, DocumentStore, FieldOp, StoreError, StoreResult, Transaction, TxnFn,
    WriteBatch,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

type CollectionMap = HashMap<String, IndexMap<String, Document>>;

/// In-memory backend; documents kept in insertion order per collection
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<CollectionMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of documents currently in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

fn apply_field_op(doc: &mut Document, field: &str, op: &FieldOp) -> StoreResult<()> {
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::Backend("document is not an object".to_string()))?;

    match op {
        FieldOp::Set(value) => {
            obj.insert(field.to_string(), value.clone());
        }
        FieldOp::ArrayUnion(values) => {
            let entry = obj
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            let arr = entry
                .as_array_mut()
                .ok_or_else(|| StoreError::Backend(format!("field {} is not an array", field)))?;
            for value in values {
                if !arr.contains(value) {
                    arr.push(value.clone());
                }
            }
        }
        FieldOp::ArrayRemove(values) => {
            if let Some(entry) = obj.get_mut(field) {
                let arr = entry.as_array_mut().ok_or_else(|| {
                    StoreError::Backend(format!("field {} is not an array", field))
                })?;
                arr.retain(|v| !values.contains(v));
            }
        }
        FieldOp::Delete => {
            obj.remove(field);
        }
    }
    Ok(())
}

fn merge_into(existing: &mut Document, incoming: &Document) {
    match (existing.as_object_mut(), incoming.as_object()) {
        (Some(target), Some(source)) => {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        _ => *existing = incoming.clone(),
    }
}

fn apply_set(map: &mut CollectionMap, collection: &str, id: &str, data: &Document, merge: bool) {
    let docs = map.entry(collection.to_string()).or_default();
    match docs.get_mut(id) {
        Some(existing) if merge => merge_into(existing, data),
        _ => {
            docs.insert(id.to_string(), data.clone());
        }
    }
}

fn apply_update(
    map: &mut CollectionMap,
    collection: &str,
    id: &str,
    fields: &[(String, FieldOp)],
) -> StoreResult<()> {
    let doc = map
        .get_mut(collection)
        .and_then(|docs| docs.get_mut(id))
        .ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
    for (field, op) in fields {
        apply_field_op(doc, field, op)?;
    }
    Ok(())
}

/// Buffered transaction view; staged writes land only when the closure
/// returns Ok
struct MemoryTransaction<'a> {
    base: &'a mut CollectionMap,
    staged: IndexMap<(String, String), Document>,
}

impl MemoryTransaction<'_> {
    fn materialize(&self, collection: &str, id: &str) -> Option<Document> {
        let key = (collection.to_string(), id.to_string());
        if let Some(doc) = self.staged.get(&key) {
            return Some(doc.clone());
        }
        self.base
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    fn stage(&mut self, collection: &str, id: &str, doc: Document) {
        self.staged
            .insert((collection.to_string(), id.to_string()), doc);
    }

    fn commit(self) {
        for ((collection, id), doc) in self.staged {
            self.base.entry(collection).or_default().insert(id, doc);
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get(&mut self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.materialize(collection, id))
    }

    fn set(&mut self, collection: &str, id: &str, doc: Document, merge: bool) -> StoreResult<()> {
        let next = match self.materialize(collection, id) {
            Some(mut existing) if merge => {
                merge_into(&mut existing, &doc);
                existing
            }
            _ => doc,
        };
        self.stage(collection, id, next);
        Ok(())
    }

    fn update(
        &mut self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldOp)>,
    ) -> StoreResult<()> {
        let mut doc = self
            .materialize(collection, id)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        for (field, op) in &fields {
            apply_field_op(&mut doc, field, op)?;
        }
        self.stage(collection, id, doc);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let map = self.collections.read().await;
        Ok(map.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> StoreResult<Vec<Option<Document>>> {
        let map = self.collections.read().await;
        let docs = map.get(collection);
        Ok(ids
            .iter()
            .map(|id| docs.and_then(|d| d.get(id)).cloned())
            .collect())
    }

    async fn set(&self, collection: &str, id: &str, doc: Document, merge: bool) -> StoreResult<()> {
        let mut map = self.collections.write().await;
        apply_set(&mut map, collection, id, &doc, merge);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Vec<(String, FieldOp)>,
    ) -> StoreResult<()> {
        let mut map = self.collections.write().await;
        apply_update(&mut map, collection, id, &fields)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut map = self.collections.write().await;
        if let Some(docs) = map.get_mut(collection) {
            docs.shift_remove(id);
        }
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut map = self.collections.write().await;

        // Validate update targets before touching anything so a mid-batch
        // miss cannot leave a partial batch behind.
        let mut will_exist: HashSet<(String, String)> = HashSet::new();
        let mut deleted: HashSet<(String, String)> = HashSet::new();
        for (collection, id, op) in &batch.ops {
            let key = (collection.clone(), id.clone());
            match op {
                BatchOp::Set { .. } => {
                    deleted.remove(&key);
                    will_exist.insert(key);
                }
                BatchOp::Delete => {
                    will_exist.remove(&key);
                    deleted.insert(key);
                }
                BatchOp::Update { .. } => {
                    let in_store = map
                        .get(collection)
                        .map(|docs| docs.contains_key(id))
                        .unwrap_or(false);
                    let exists = will_exist.contains(&key) || (in_store && !deleted.contains(&key));
                    if !exists {
                        return Err(StoreError::NotFound {
                            collection: collection.clone(),
                            id: id.clone(),
                        });
                    }
                }
            }
        }

        for (collection, id, op) in &batch.ops {
            match op {
                BatchOp::Set { data, merge } => apply_set(&mut map, collection, id, data, *merge),
                BatchOp::Update { fields } => apply_update(&mut map, collection, id, fields)?,
                BatchOp::Delete => {
                    if let Some(docs) = map.get_mut(collection) {
                        docs.shift_remove(id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_transaction(&self, f: TxnFn) -> StoreResult<Value> {
        let mut map = self.collections.write().await;
        let mut txn = MemoryTransaction {
            base: &mut map,
            staged: IndexMap::new(),
        };
        let result = f(&mut txn)?;
        txn.commit();
        Ok(result)
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        let map = self.collections.read().await;
        let Some(docs) = map.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| doc.get(field) == Some(value))
            .cloned()
            .collect())
    }

    async fn list_ids(&self, collection: &str, limit: usize) -> StoreResult<Vec<String>> {
        let map = self.collections.read().await;
        let Some(docs) = map.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs.keys().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store
            .set("contacts", "c1", json!({"id": "c1", "full_name": "Ada"}), false)
            .await
            .unwrap();

        let doc = store.get("contacts", "c1").await.unwrap().unwrap();
        assert_eq!(doc["full_name"], "Ada");

        store.delete("contacts", "c1").await.unwrap();
        assert!(store.get("contacts", "c1").await.unwrap().is_none());

        // Deleting again is fine
        store.delete("contacts", "c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_merge_set_keeps_other_fields() {
        let store = MemoryStore::new();
        store
            .set("contacts", "c1", json!({"a": 1, "b": 2}), false)
            .await
            .unwrap();
        store
            .set("contacts", "c1", json!({"b": 3, "c": 4}), true)
            .await
            .unwrap();

        let doc = store.get("contacts", "c1").await.unwrap().unwrap();
        assert_eq!(doc, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[tokio::test]
    async fn test_array_union_and_remove() {
        let store = MemoryStore::new();
        store
            .set("skills_index", "python", json!({"contact_ids": ["c1"]}), false)
            .await
            .unwrap();

        store
            .update(
                "skills_index",
                "python",
                vec![(
                    "contact_ids".to_string(),
                    FieldOp::ArrayUnion(vec![json!("c2"), json!("c1")]),
                )],
            )
            .await
            .unwrap();
        let doc = store.get("skills_index", "python").await.unwrap().unwrap();
        assert_eq!(doc["contact_ids"], json!(["c1", "c2"]));

        store
            .update(
                "skills_index",
                "python",
                vec![(
                    "contact_ids".to_string(),
                    FieldOp::ArrayRemove(vec![json!("c1")]),
                )],
            )
            .await
            .unwrap();
        let doc = store.get("skills_index", "python").await.unwrap().unwrap();
        assert_eq!(doc["contact_ids"], json!(["c2"]));
    }

    #[tokio::test]
    async fn test_update_missing_doc_fails() {
        let store = MemoryStore::new();
        let err = store
            .update(
                "contacts",
                "ghost",
                vec![("x".to_string(), FieldOp::Set(json!(1)))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_batch_is_atomic_on_bad_update() {
        let store = MemoryStore::new();
        store
            .set("contacts", "c1", json!({"n": 0}), false)
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.update("contacts", "c1", vec![("n".to_string(), FieldOp::Set(json!(1)))]);
        batch.update("contacts", "ghost", vec![("n".to_string(), FieldOp::Set(json!(1)))]);

        assert!(store.commit(batch).await.is_err());
        let doc = store.get("contacts", "c1").await.unwrap().unwrap();
        assert_eq!(doc["n"], 0, "first update must not have been applied");
    }

    #[tokio::test]
    async fn test_batch_set_then_update_same_doc() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("idx", "v", json!({"contact_ids": []}), false);
        batch.update(
            "idx",
            "v",
            vec![("contact_ids".to_string(), FieldOp::ArrayUnion(vec![json!("c1")]))],
        );
        store.commit(batch).await.unwrap();

        let doc = store.get("idx", "v").await.unwrap().unwrap();
        assert_eq!(doc["contact_ids"], json!(["c1"]));
    }

    #[tokio::test]
    async fn test_transaction_stages_until_ok() {
        let store = MemoryStore::new();
        store
            .set("contacts", "o1", json!({"stage_counts": {"prospect": 1}}), false)
            .await
            .unwrap();

        let result = store
            .run_transaction(Box::new(|txn| {
                let mut doc = txn.get("contacts", "o1")?.unwrap();
                doc["stage_counts"]["prospect"] = json!(2);
                txn.set("contacts", "o1", doc, false)?;
                Ok(json!({"applied": true}))
            }))
            .await
            .unwrap();
        assert_eq!(result["applied"], true);

        let doc = store.get("contacts", "o1").await.unwrap().unwrap();
        assert_eq!(doc["stage_counts"]["prospect"], 2);
    }

    #[tokio::test]
    async fn test_transaction_discards_on_error() {
        let store = MemoryStore::new();
        store.set("contacts", "o1", json!({"n": 1}), false).await.unwrap();

        let outcome = store
            .run_transaction(Box::new(|txn| {
                txn.set("contacts", "o1", json!({"n": 99}), false)?;
                Err(StoreError::Conflict("simulated".to_string()))
            }))
            .await;
        assert!(outcome.is_err());

        let doc = store.get("contacts", "o1").await.unwrap().unwrap();
        assert_eq!(doc["n"], 1);
    }

    #[tokio::test]
    async fn test_find_by_field() {
        let store = MemoryStore::new();
        store
            .set("introductions", "o1__t1", json!({"owner_id": "o1", "stage": "prospect"}), false)
            .await
            .unwrap();
        store
            .set("introductions", "o1__t2", json!({"owner_id": "o1", "stage": "met"}), false)
            .await
            .unwrap();
        store
            .set("introductions", "o2__t9", json!({"owner_id": "o2", "stage": "met"}), false)
            .await
            .unwrap();

        let docs = store
            .find_by_field("introductions", "owner_id", &json!("o1"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["stage"], "prospect");
    }

    #[tokio::test]
    async fn test_list_ids_in_insertion_order() {
        let store = MemoryStore::new();
        for id in ["b", "a", "c"] {
            store.set("contacts", id, json!({"id": id}), false).await.unwrap();
        }
        let ids = store.list_ids("contacts", 2).await.unwrap();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }
}
