//! Intrograph
//!
//! Contact graph engine for founder/investor networks: normalized contact
//! documents with reverse-index synchronization, an introduction pipeline
//! with cached stage counts, and attribute-overlap campaign matching.
//!
//! # Architecture
//!
//! - Contacts are flat documents; every indexed attribute value owns a
//!   per-value index document whose `contact_ids` array is the reverse
//!   index, so "who has this skill" is a single document read.
//! - Derived state (company nodes, capability nodes, denormalized thesis
//!   arrays, cached stage counts) is recomputed from source fields on every
//!   write; a lost update heals on the next one.
//! - Storage sits behind the [`store::DocumentStore`] trait;
//!   [`store::MemoryStore`] is the bundled backend.
//!
//! ## Example Usage
//!
//! ```rust
//! use intrograph::contact::{Contact, ContactType};
//! use intrograph::flatten::Flattener;
//!
//! let mut contact = Contact::new("jane", "Jane Doe", ContactType::Founder);
//! contact.current_company = Some("Acme Corp".to_string());
//! contact.skills = vec!["rust".to_string()];
//!
//! // Normalization is pure: node documents plus a contact field patch.
//! let flattened = Flattener::new().flatten(&contact).unwrap();
//! assert_eq!(flattened.companies[0].id, "acme_corp");
//! assert_eq!(
//!     flattened.contact_updates.current_company_id.as_deref(),
//!     Some("acme_corp")
//! );
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod contact;
pub mod error;
pub mod flatten;
pub mod index;
pub mod intro;
pub mod matching;
pub mod metrics;
pub mod slug;
pub mod store;

// Re-export main types for convenience
pub use contact::{Contact, ContactType};
pub use error::{Error, Result};
pub use flatten::{FlattenedContact, Flattener};
pub use index::{ReverseIndexer, SyncReport};
pub use intro::{IntroductionEngine, Stage, StageCounts, StageSummary};
pub use matching::{CampaignMatchOptions, FilterCriteria, MatchCandidate, MatchEngine};
pub use metrics::{MetricsSink, NullSink};
pub use store::{DocumentStore, MemoryStore};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
