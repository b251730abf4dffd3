//! Attribute selection policy
//!
//! One function decides whose values score: the seed's own attributes or
//! its stated thesis. The substitution is directional. An investor (or
//! `both`) seed looking for founders is matched on what it wants to invest
//! in; every other direction uses the seed's actual profile, so a founder
//! searching for investors is matched on the founder's real attributes.

use crate::contact::{Contact, ContactType};
use crate::store::AttributeField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requestable attribute families for campaign matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAttribute {
    Skills,
    Industries,
    Verticals,
    FundingStages,
    /// Hard filter only; never contributes to the score
    Location,
}

impl MatchAttribute {
    /// The reverse-indexed field backing this family, if it scores
    pub fn attribute_field(&self) -> Option<AttributeField> {
        match self {
            MatchAttribute::Skills => Some(AttributeField::Skills),
            MatchAttribute::Industries => Some(AttributeField::Industries),
            MatchAttribute::Verticals => Some(AttributeField::Verticals),
            MatchAttribute::FundingStages => Some(AttributeField::FundingStages),
            MatchAttribute::Location => None,
        }
    }

    /// The index collection this family scores against
    pub fn collection(&self) -> Option<&'static str> {
        self.attribute_field().map(|f| f.collection())
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            MatchAttribute::Skills => "skills",
            MatchAttribute::Industries => "industries",
            MatchAttribute::Verticals => "verticals",
            MatchAttribute::FundingStages => "funding_stages",
            MatchAttribute::Location => "location",
        }
    }
}

impl fmt::Display for MatchAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Acceptable location values for the hard filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationPolicy {
    pub cities: Vec<String>,
    pub countries: Vec<String>,
}

impl LocationPolicy {
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.countries.is_empty()
    }
}

/// Whether the seed's thesis arrays substitute for its own attributes
pub fn uses_thesis(seed_type: ContactType, target_type: ContactType) -> bool {
    matches!(seed_type, ContactType::Investor | ContactType::Both)
        && target_type == ContactType::Founder
}

/// Values the seed contributes for one scored family
///
/// Location always resolves to an empty list here; use
/// [`location_values`] for the filter.
pub fn scoring_values(seed: &Contact, target_type: ContactType, family: MatchAttribute) -> Vec<String> {
    let thesis = uses_thesis(seed.contact_type, target_type);
    match (family, thesis) {
        (MatchAttribute::Skills, false) => seed.skills.clone(),
        (MatchAttribute::Skills, true) => seed.target_skills.clone(),
        (MatchAttribute::Industries, false) => seed.industries.clone(),
        (MatchAttribute::Industries, true) => seed.target_industries.clone(),
        (MatchAttribute::Verticals, false) => seed.verticals.clone(),
        (MatchAttribute::Verticals, true) => seed.target_verticals.clone(),
        (MatchAttribute::FundingStages, false) => seed.funding_stages.clone(),
        (MatchAttribute::FundingStages, true) => seed.target_raised_capital_range_ids.clone(),
        (MatchAttribute::Location, _) => Vec::new(),
    }
}

/// City and country values the location filter accepts
pub fn location_values(seed: &Contact, target_type: ContactType) -> LocationPolicy {
    if uses_thesis(seed.contact_type, target_type) {
        LocationPolicy {
            cities: seed.target_location_cities.clone(),
            countries: seed.target_location_countries.clone(),
        }
    } else {
        LocationPolicy {
            cities: seed.location_city.iter().cloned().collect(),
            countries: seed.location_country.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn investor_seed() -> Contact {
        let mut seed = Contact::new("s1", "Seed Investor", ContactType::Investor);
        seed.skills = vec!["negotiation".to_string()];
        seed.industries = vec!["finance".to_string()];
        seed.funding_stages = vec!["series_b".to_string()];
        seed.target_skills = vec!["rust".to_string()];
        seed.target_industries = vec!["climate".to_string()];
        seed.target_raised_capital_range_ids = vec!["series_a".to_string()];
        seed.location_city = Some("London".to_string());
        seed.location_country = Some("GB".to_string());
        seed.target_location_cities = vec!["Berlin".to_string()];
        seed.target_location_countries = vec!["DE".to_string()];
        seed
    }

    #[test]
    fn test_thesis_direction() {
        assert!(uses_thesis(ContactType::Investor, ContactType::Founder));
        assert!(uses_thesis(ContactType::Both, ContactType::Founder));
        assert!(!uses_thesis(ContactType::Founder, ContactType::Investor));
        assert!(!uses_thesis(ContactType::Investor, ContactType::Investor));
        assert!(!uses_thesis(ContactType::Founder, ContactType::Founder));
    }

    #[test]
    fn test_investor_matching_founders_uses_thesis() {
        let seed = investor_seed();
        assert_eq!(
            scoring_values(&seed, ContactType::Founder, MatchAttribute::Skills),
            vec!["rust"]
        );
        assert_eq!(
            scoring_values(&seed, ContactType::Founder, MatchAttribute::Industries),
            vec!["climate"]
        );
        assert_eq!(
            scoring_values(&seed, ContactType::Founder, MatchAttribute::FundingStages),
            vec!["series_a"]
        );
    }

    #[test]
    fn test_investor_matching_investors_uses_own_profile() {
        let seed = investor_seed();
        assert_eq!(
            scoring_values(&seed, ContactType::Investor, MatchAttribute::Skills),
            vec!["negotiation"]
        );
        assert_eq!(
            scoring_values(&seed, ContactType::Investor, MatchAttribute::FundingStages),
            vec!["series_b"]
        );
    }

    #[test]
    fn test_location_never_scores() {
        let seed = investor_seed();
        assert!(scoring_values(&seed, ContactType::Founder, MatchAttribute::Location).is_empty());
        assert!(scoring_values(&seed, ContactType::Investor, MatchAttribute::Location).is_empty());
    }

    #[test]
    fn test_location_values_substitution() {
        let seed = investor_seed();
        let thesis = location_values(&seed, ContactType::Founder);
        assert_eq!(thesis.cities, vec!["Berlin"]);
        assert_eq!(thesis.countries, vec!["DE"]);

        let own = location_values(&seed, ContactType::Investor);
        assert_eq!(own.cities, vec!["London"]);
        assert_eq!(own.countries, vec!["GB"]);
    }

    #[test]
    fn test_collections_for_scored_families() {
        assert_eq!(MatchAttribute::Skills.collection(), Some("skills_index"));
        assert_eq!(
            MatchAttribute::FundingStages.collection(),
            Some("funding_stages_index")
        );
        assert_eq!(MatchAttribute::Location.collection(), None);
    }
}
