use intrograph::contact::{Contact, ContactType, TargetCriterionInput};
use intrograph::index::ReverseIndexer;
use intrograph::intro::{IntroductionEngine, Stage};
use intrograph::matching::{CampaignMatchOptions, FilterCriteria, MatchAttribute, MatchEngine};
use intrograph::metrics::TracingSink;
use intrograph::store::{DocumentStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Intrograph v{}", intrograph::version());
    println!("==========================================");
    println!();

    let store = Arc::new(MemoryStore::new());
    let metrics = Arc::new(TracingSink);
    let indexer = ReverseIndexer::new(store.clone(), metrics.clone());
    let pipeline = IntroductionEngine::new(store.clone(), metrics.clone());
    let matcher = MatchEngine::new(store.clone(), metrics.clone());

    let (founder_ids, investor_id) = demo_contact_graph(&indexer, store.as_ref()).await?;
    demo_pipeline(&pipeline, &investor_id, &founder_ids).await?;
    demo_matching(&matcher, &investor_id).await?;

    Ok(())
}

async fn demo_contact_graph(
    indexer: &ReverseIndexer,
    store: &MemoryStore,
) -> anyhow::Result<(Vec<String>, String)> {
    println!("=== Demo 1: Contacts and Reverse Indexes ===");

    let founders = [
        ("Maya Chen", "maya@climateos.io", vec!["rust", "distributed systems"], "climate", "US"),
        ("Leo Park", "leo@soilmetrics.com", vec!["python"], "climate", "US"),
        ("Ana Silva", "ana@pagoflow.com", vec!["go"], "fintech", "BR"),
    ];
    let mut founder_ids = Vec::new();
    for (name, email, skills, industry, country) in founders {
        let mut contact = Contact::new("", name, ContactType::Founder);
        contact.email = Some(email.to_string());
        contact.skills = skills.into_iter().map(String::from).collect();
        contact.industries = vec![industry.to_string()];
        contact.location_country = Some(country.to_string());
        let stored = indexer.create_contact(contact).await?;
        println!("✓ Created founder: {} ({} / {})", stored.full_name, industry, country);
        founder_ids.push(stored.id);
    }

    let mut investor = Contact::new("", "Sam Rivera", ContactType::Investor);
    investor.email = Some("sam@terraventures.vc".to_string());
    investor.location_country = Some("US".to_string());
    investor.target_criteria = vec![TargetCriterionInput {
        label: Some("Climate focus".to_string()),
        dimension: "Industry".to_string(),
        operator: "anyOf".to_string(),
        value: json!(["climate"]),
    }];
    let investor = indexer.create_contact(investor).await?;
    println!("✓ Created investor: {} (thesis: climate)", investor.full_name);

    // Creating again with the same email hands back the stored profile.
    let mut duplicate = Contact::new("", "S. Rivera", ContactType::Investor);
    duplicate.email = Some("SAM@terraventures.vc".to_string());
    let deduped = indexer.create_contact(duplicate).await?;
    println!("✓ Duplicate create resolved to existing id {}", deduped.id);

    if let Some(doc) = store.get("industries_index", "climate").await? {
        let members = doc["contact_ids"].as_array().map(|a| a.len()).unwrap_or(0);
        println!("\nReverse index check:");
        println!("  industries_index/climate lists {} contacts", members);
    }

    Ok((founder_ids, investor.id))
}

async fn demo_pipeline(
    pipeline: &IntroductionEngine,
    owner_id: &str,
    founder_ids: &[String],
) -> anyhow::Result<()> {
    println!("\n=== Demo 2: Introduction Pipeline ===");

    pipeline
        .set_stage(owner_id, &founder_ids[0], Stage::Met, None)
        .await?;
    pipeline
        .set_stage(
            owner_id,
            &founder_ids[1],
            Stage::Qualified,
            Some(json!({"channel": "warm-intro"})),
        )
        .await?;
    pipeline
        .set_stage(owner_id, &founder_ids[2], Stage::Prospect, None)
        .await?;
    println!("✓ Moved three introductions through the funnel");

    let summary = pipeline.get_stage_summary(owner_id).await?;
    println!("\nPipeline summary: total {}, status {}", summary.total, summary.action_status);
    for (stage, count) in summary.counts.iter() {
        if count > 0 {
            println!("  {:<16} {}", stage.wire_name(), count);
        }
    }
    Ok(())
}

async fn demo_matching(matcher: &MatchEngine, seed_id: &str) -> anyhow::Result<()> {
    println!("\n=== Demo 3: Campaign Matching ===");

    let candidates = matcher
        .campaign_match(
            seed_id,
            CampaignMatchOptions {
                attributes: vec![MatchAttribute::Industries],
                target_type: ContactType::Founder,
                ..Default::default()
            },
        )
        .await?;
    println!("Founders matching the climate thesis:");
    for candidate in &candidates {
        let values: Vec<&str> = candidate
            .overlaps
            .iter()
            .flat_map(|o| o.values.iter().map(String::as_str))
            .collect();
        println!(
            "  {:<12} score {}  shared: {}",
            candidate.contact.full_name,
            candidate.score,
            values.join(", ")
        );
    }

    let filtered = matcher
        .filter_contacts(FilterCriteria {
            contact_type: Some(ContactType::Founder),
            industries: vec!["climate".to_string()],
            ..Default::default()
        })
        .await?;
    println!("\nBrowse filter (founders in climate): {} contacts", filtered.len());

    let presets = matcher
        .analyze_campaign_potential(seed_id, ContactType::Founder)
        .await?;
    let best = presets.iter().max_by_key(|p| p.candidate_count);
    if let Some(best) = best {
        println!(
            "Best campaign preset: {} ({} candidates)",
            best.name, best.candidate_count
        );
    }
    Ok(())
}
