//! Introduction pipeline over the store: cached stage counts, bulk moves,
//! campaign listings, and count self-healing.

use intrograph::contact::{Contact, ContactType};
use intrograph::intro::{
    CampaignListOptions, CampaignOrder, IntroductionEngine, Stage, StageCounts,
};
use intrograph::metrics::TracingSink;
use intrograph::store::{
    DocumentStore, FieldOp, MemoryStore, COLLECTION_CONTACTS, COLLECTION_INTRODUCTIONS,
};
use serde_json::json;
use std::sync::Arc;

async fn setup(owner: &str, targets: &[&str]) -> (Arc<MemoryStore>, IntroductionEngine) {
    let store = Arc::new(MemoryStore::new());
    let engine = IntroductionEngine::new(store.clone(), Arc::new(TracingSink));

    let owner_doc = Contact::new(owner, "Owner", ContactType::Investor);
    store
        .set(COLLECTION_CONTACTS, owner, owner_doc.to_document().unwrap(), false)
        .await
        .unwrap();
    for target in targets {
        let doc = Contact::new(*target, format!("Target {}", target), ContactType::Founder);
        store
            .set(COLLECTION_CONTACTS, target, doc.to_document().unwrap(), false)
            .await
            .unwrap();
    }
    (store, engine)
}

async fn cached_counts(store: &MemoryStore, owner: &str) -> StageCounts {
    let doc = store.get(COLLECTION_CONTACTS, owner).await.unwrap().unwrap();
    serde_json::from_value(doc["stage_counts"].clone()).unwrap()
}

#[tokio::test]
async fn test_stage_transitions_update_cached_counts() {
    let (store, engine) = setup("inv", &["t1"]).await;

    engine.set_stage("inv", "t1", Stage::Prospect, None).await.unwrap();
    let counts = cached_counts(&store, "inv").await;
    assert_eq!(counts.get(Stage::Prospect), 1);
    assert_eq!(counts.total(), 1);

    let owner = store.get(COLLECTION_CONTACTS, "inv").await.unwrap().unwrap();
    assert_eq!(owner["action_status"], "waiting");

    // Transition moves the count; the pair keeps a single document.
    engine.set_stage("inv", "t1", Stage::Met, None).await.unwrap();
    let counts = cached_counts(&store, "inv").await;
    assert_eq!(counts.get(Stage::Prospect), 0);
    assert_eq!(counts.get(Stage::Met), 1);

    let owner = store.get(COLLECTION_CONTACTS, "inv").await.unwrap().unwrap();
    assert_eq!(owner["action_status"], "action_required");

    let intro = store
        .get(COLLECTION_INTRODUCTIONS, "inv__t1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intro["stage"], "met");
    assert_eq!(intro["stage_rank"], 5);
}

#[tokio::test]
async fn test_same_stage_repeat_keeps_counts() {
    let (store, engine) = setup("inv", &["t1"]).await;

    engine.set_stage("inv", "t1", Stage::Met, None).await.unwrap();
    engine
        .set_stage("inv", "t1", Stage::Met, Some(json!({"note": "second touch"})))
        .await
        .unwrap();

    let counts = cached_counts(&store, "inv").await;
    assert_eq!(counts.get(Stage::Met), 1);

    let intro = store
        .get(COLLECTION_INTRODUCTIONS, "inv__t1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intro["metadata"]["note"], "second touch");
}

#[tokio::test]
async fn test_bulk_set_stage_net_counts() {
    let (store, engine) = setup("inv", &["t1", "t2"]).await;
    engine.set_stage("inv", "t1", Stage::Prospect, None).await.unwrap();

    let report = engine
        .bulk_set_stage(
            "inv",
            &[
                ("t1".to_string(), Stage::Qualified),
                ("t2".to_string(), Stage::Prospect),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.unchanged, 0);

    let counts = cached_counts(&store, "inv").await;
    assert_eq!(counts.get(Stage::Prospect), 1);
    assert_eq!(counts.get(Stage::Qualified), 1);
    assert_eq!(counts.total(), 2);
}

#[tokio::test]
async fn test_recompute_heals_corrupted_counts() {
    let (store, engine) = setup("inv", &["t1"]).await;
    engine.set_stage("inv", "t1", Stage::Met, None).await.unwrap();

    // Corrupt the cache behind the engine's back.
    store
        .update(
            COLLECTION_CONTACTS,
            "inv",
            vec![(
                "stage_counts".to_string(),
                FieldOp::Set(json!({"met": 40, "prospect": 7})),
            )],
        )
        .await
        .unwrap();

    let outcome = engine.recompute_stage_counts("inv").await.unwrap();
    assert!(outcome.owner_updated);
    assert_eq!(outcome.counts.get(Stage::Met), 1);

    let counts = cached_counts(&store, "inv").await;
    assert_eq!(counts.get(Stage::Met), 1);
    assert_eq!(counts.get(Stage::Prospect), 0);

    let owner = store.get(COLLECTION_CONTACTS, "inv").await.unwrap().unwrap();
    assert_eq!(owner["action_status"], "action_required");
}

#[tokio::test]
async fn test_summary_zero_fills_in_rank_order() {
    let (_store, engine) = setup("inv", &[]).await;

    let summary = engine.get_stage_summary("inv").await.unwrap();
    assert_eq!(summary.total, 0);

    let names: Vec<&str> = summary.counts.iter().map(|(s, _)| s.wire_name()).collect();
    assert_eq!(
        names,
        vec![
            "prospect",
            "qualified",
            "outreached",
            "interested",
            "to-meet",
            "met",
            "disqualified",
            "not-in-campaign"
        ]
    );
    assert!(summary.counts.iter().all(|(_, count)| count == 0));
}

#[tokio::test]
async fn test_campaign_listing_pages_by_stage() {
    let (_store, engine) = setup("inv", &["t1", "t2", "t3"]).await;
    engine.set_stage("inv", "t1", Stage::Met, None).await.unwrap();
    engine.set_stage("inv", "t2", Stage::Prospect, None).await.unwrap();
    engine.set_stage("inv", "t3", Stage::Qualified, None).await.unwrap();

    let first = engine
        .get_campaign_contacts(
            "inv",
            CampaignListOptions {
                limit: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let ids: Vec<&str> = first.records.iter().map(|r| r.contact.id.as_str()).collect();
    assert_eq!(ids, vec!["t2", "t3"]);
    assert_eq!(first.records[0].campaign_stage, Stage::Prospect);
    assert!(first.has_more);
    assert_eq!(first.next_cursor.as_deref(), Some("inv__t3"));

    let second = engine
        .get_campaign_contacts(
            "inv",
            CampaignListOptions {
                limit: 2,
                start_after: first.next_cursor,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let ids: Vec<&str> = second.records.iter().map(|r| r.contact.id.as_str()).collect();
    assert_eq!(ids, vec!["t1"]);
    assert!(!second.has_more);
    assert_eq!(second.next_cursor, None);
}

#[tokio::test]
async fn test_campaign_listing_by_recency() {
    let (_store, engine) = setup("inv", &["t1", "t2"]).await;
    engine.set_stage("inv", "t1", Stage::Prospect, None).await.unwrap();
    engine.set_stage("inv", "t2", Stage::Prospect, None).await.unwrap();
    // Touch t1 again so it is the most recently updated.
    engine.set_stage("inv", "t1", Stage::Met, None).await.unwrap();

    let page = engine
        .get_campaign_contacts(
            "inv",
            CampaignListOptions {
                order_by: CampaignOrder::UpdatedAt,
                descending: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let ids: Vec<&str> = page.records.iter().map(|r| r.contact.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
}

#[tokio::test]
async fn test_campaign_listing_rejects_unknown_cursor() {
    let (_store, engine) = setup("inv", &["t1"]).await;
    engine.set_stage("inv", "t1", Stage::Prospect, None).await.unwrap();

    let err = engine
        .get_campaign_contacts(
            "inv",
            CampaignListOptions {
                start_after: Some("inv__ghost".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "startAfter cursor inv__ghost not found for owner inv"
    );
}
