//! Named combinations of rules.

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use libris_kernel::settings::CatalogSettings;
use serde::Serialize;

use super::rules::{DateRule, PriceRule, RecordRule, TextRule};

const PREMIUM_PRICE_RANGE: (u64, u64) = (15_000, 1_000_000);
const STANDARD_PRICE_RANGE: (u64, u64) = (5, 1_000);

/// Every policy the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyName {
    /// Per-field checks only, premium price range.
    Field,
    /// Whole-record checks only.
    Object,
    /// Reusable character and range checks, standard price range.
    Custom,
    /// Price range only.
    BuiltIn,
    /// Field checks plus title/author and cover uniqueness.
    Complete,
    /// The strictest per-field checks.
    HomeworkField,
    /// Whole-record checks including the recent-book price floor.
    HomeworkObject,
    /// Every rule of the data model.
    Strict,
}

impl PolicyName {
    pub const ALL: [PolicyName; 8] = [
        PolicyName::Field,
        PolicyName::Object,
        PolicyName::Custom,
        PolicyName::BuiltIn,
        PolicyName::Complete,
        PolicyName::HomeworkField,
        PolicyName::HomeworkObject,
        PolicyName::Strict,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyName::Field => "field",
            PolicyName::Object => "object",
            PolicyName::Custom => "custom",
            PolicyName::BuiltIn => "builtin",
            PolicyName::Complete => "complete",
            PolicyName::HomeworkField => "homework-field",
            PolicyName::HomeworkObject => "homework-object",
            PolicyName::Strict => "strict",
        }
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown validation policy '{0}'")]
pub struct UnknownPolicy(pub String);

impl FromStr for PolicyName {
    type Err = UnknownPolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PolicyName::ALL
            .into_iter()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| UnknownPolicy(value.to_string()))
    }
}

/// Ordered rules per field plus whole-record rules.
///
/// Field rules run in order and stop at the first failure for that field;
/// normalizers such as [`TextRule::TitleCase`] rewrite the value seen by
/// later rules and stored on acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub name: PolicyName,
    pub title: Vec<TextRule>,
    pub author: Vec<TextRule>,
    pub isbn_number: Vec<TextRule>,
    pub price: Vec<PriceRule>,
    pub published_date: Vec<DateRule>,
    pub record: Vec<RecordRule>,
}

impl Policy {
    /// Assemble a policy, taking deployment limits from `catalog`.
    pub fn build(name: PolicyName, catalog: &CatalogSettings) -> Self {
        use TextRule::*;

        let price_range = |(min, max): (u64, u64)| {
            let (min, max) = catalog
                .price_range
                .map_or((min, max), |range| (range.min, range.max));
            PriceRule::Range { min, max }
        };
        let min_year = catalog.min_year;
        let recent_floor = RecordRule::RecentPriceFloor {
            window_days: catalog.recent_window_days,
            floor: catalog.recent_price_floor,
        };

        let empty = Policy {
            name,
            title: vec![],
            author: vec![],
            isbn_number: vec![],
            price: vec![],
            published_date: vec![],
            record: vec![],
        };

        match name {
            PolicyName::Field => Policy {
                title: vec![MinWords(2), FirstCharUppercase, NotDigitsOnly, TitleCase],
                author: vec![MinWords(2), EveryWordCapitalized],
                isbn_number: vec![IsbnDigits, Unique],
                price: vec![PriceRule::Positive, price_range(PREMIUM_PRICE_RANGE)],
                published_date: vec![DateRule::NotInFuture, DateRule::MinYear(min_year)],
                ..empty
            },
            PolicyName::Object => Policy {
                record: vec![
                    RecordRule::UniqueTitleAuthor,
                    RecordRule::SubtitleNotLongerThanTitle,
                ],
                ..empty
            },
            PolicyName::Custom => Policy {
                title: vec![TitleCharset, MinWords(2)],
                author: vec![EveryWordCapitalized],
                isbn_number: vec![IsbnDigits, Unique],
                price: vec![price_range(STANDARD_PRICE_RANGE)],
                published_date: vec![DateRule::YearUpToCurrent(min_year)],
                ..empty
            },
            PolicyName::BuiltIn => Policy {
                price: vec![price_range(PREMIUM_PRICE_RANGE)],
                ..empty
            },
            PolicyName::Complete => Policy {
                title: vec![TitleCharset, NotDigitsOnly, MinWords(2)],
                author: vec![MinWords(2), EveryWordCapitalized],
                isbn_number: vec![IsbnDigits, Unique],
                price: vec![price_range(PREMIUM_PRICE_RANGE)],
                published_date: vec![DateRule::YearUpToCurrent(min_year)],
                record: vec![RecordRule::UniqueTitleAuthor, RecordRule::UniqueCoverImage],
                ..empty
            },
            PolicyName::HomeworkField => Policy {
                title: vec![MinWords(2), FirstCharUppercase, TitleCharset, TitleCase],
                author: vec![LettersAndSpaces, MinWords(2), EveryWordCapitalized],
                isbn_number: vec![IsbnDigits, IsbnGrouping, Unique],
                price: vec![
                    PriceRule::Positive,
                    price_range(STANDARD_PRICE_RANGE),
                    PriceRule::MaxFractionDigits(2),
                ],
                published_date: vec![
                    DateRule::NotInFuture,
                    DateRule::MinYear(min_year),
                    DateRule::MaxAgeDays(catalog.max_age_days),
                ],
                ..empty
            },
            PolicyName::HomeworkObject => Policy {
                record: vec![
                    RecordRule::UniqueTitleAuthor,
                    RecordRule::SubtitleNotLongerThanTitle,
                    recent_floor,
                ],
                ..empty
            },
            PolicyName::Strict => Policy {
                name,
                title: vec![
                    MinWords(2),
                    FirstCharUppercase,
                    TitleCharset,
                    NotDigitsOnly,
                    TitleCase,
                ],
                author: vec![LettersAndSpaces, MinWords(2), EveryWordCapitalized],
                isbn_number: vec![IsbnDigits, IsbnGrouping, Unique],
                price: vec![
                    PriceRule::Positive,
                    price_range(STANDARD_PRICE_RANGE),
                    PriceRule::MaxFractionDigits(2),
                ],
                published_date: vec![
                    DateRule::NotInFuture,
                    DateRule::MinYear(min_year),
                    DateRule::MaxAgeDays(catalog.max_age_days),
                ],
                record: vec![
                    RecordRule::UniqueTitleAuthor,
                    RecordRule::SubtitleNotLongerThanTitle,
                    RecordRule::UniqueCoverImage,
                    recent_floor,
                ],
            },
        }
    }

    /// Human readable listing of the rules, keyed by field.
    pub fn summary(&self) -> PolicySummary {
        fn describe<T: fmt::Display>(rules: &[T]) -> Vec<String> {
            rules.iter().map(ToString::to_string).collect()
        }

        let mut fields = BTreeMap::new();
        for (key, rules) in [
            ("title", describe(&self.title)),
            ("author", describe(&self.author)),
            ("isbn_number", describe(&self.isbn_number)),
            ("price", describe(&self.price)),
            ("published_date", describe(&self.published_date)),
        ] {
            if !rules.is_empty() {
                fields.insert(key, rules);
            }
        }

        PolicySummary {
            name: self.name.as_str(),
            fields,
            record: describe(&self.record),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicySummary {
    pub name: &'static str,
    pub fields: BTreeMap<&'static str, Vec<String>>,
    pub record: Vec<String>,
}

/// All policies built once for a deployment, plus the default one.
#[derive(Debug, Clone)]
pub struct Policies {
    default: PolicyName,
    policies: BTreeMap<PolicyName, Arc<Policy>>,
}

impl Policies {
    pub fn from_settings(catalog: &CatalogSettings) -> Result<Self, UnknownPolicy> {
        let default = catalog.policy.parse()?;
        let policies = PolicyName::ALL
            .into_iter()
            .map(|name| (name, Arc::new(Policy::build(name, catalog))))
            .collect();
        Ok(Self { default, policies })
    }

    pub fn default_name(&self) -> PolicyName {
        self.default
    }

    pub fn default_policy(&self) -> Arc<Policy> {
        self.get(self.default)
    }

    pub fn get(&self, name: PolicyName) -> Arc<Policy> {
        match self.policies.get(&name) {
            Some(policy) => policy.clone(),
            // Every name is built in `from_settings`.
            None => Arc::new(Policy::build(name, &CatalogSettings::default())),
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Policy>, UnknownPolicy> {
        Ok(self.get(name.parse()?))
    }

    pub fn summaries(&self) -> Vec<PolicySummary> {
        self.policies.values().map(|policy| policy.summary()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_kernel::settings::PriceRangeSettings;

    #[test]
    fn test_names_round_trip() {
        for name in PolicyName::ALL {
            assert_eq!(name.as_str().parse::<PolicyName>().unwrap(), name);
        }
        assert_eq!(
            "lenient".parse::<PolicyName>(),
            Err(UnknownPolicy("lenient".to_string()))
        );
    }

    #[test]
    fn test_strict_policy_carries_every_record_rule() {
        let policy = Policy::build(PolicyName::Strict, &CatalogSettings::default());
        assert_eq!(policy.record.len(), 4);
        assert_eq!(policy.title.last(), Some(&TextRule::TitleCase));
        assert!(policy
            .price
            .contains(&PriceRule::Range { min: 5, max: 1000 }));
    }

    #[test]
    fn test_configured_price_range_overrides_presets() {
        let catalog = CatalogSettings {
            price_range: Some(PriceRangeSettings { min: 10, max: 50 }),
            ..CatalogSettings::default()
        };
        for name in [PolicyName::Field, PolicyName::Custom, PolicyName::BuiltIn] {
            let policy = Policy::build(name, &catalog);
            assert!(policy.price.contains(&PriceRule::Range { min: 10, max: 50 }));
        }
    }

    #[test]
    fn test_object_policy_has_no_field_rules() {
        let summary = Policy::build(PolicyName::Object, &CatalogSettings::default()).summary();
        assert!(summary.fields.is_empty());
        assert_eq!(
            summary.record,
            vec!["title and author pair unique", "subtitle not longer than title"]
        );
    }

    #[test]
    fn test_policies_resolve_default_from_settings() {
        let catalog = CatalogSettings {
            policy: "complete".to_string(),
            ..CatalogSettings::default()
        };
        let policies = Policies::from_settings(&catalog).unwrap();
        assert_eq!(policies.default_policy().name, PolicyName::Complete);
        assert_eq!(policies.summaries().len(), PolicyName::ALL.len());
        assert!(policies.lookup("nope").is_err());

        let bad = CatalogSettings {
            policy: "nope".to_string(),
            ..CatalogSettings::default()
        };
        assert!(Policies::from_settings(&bad).is_err());
    }
}
