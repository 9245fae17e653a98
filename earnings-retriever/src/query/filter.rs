//! Metadata filter construction for constrained retrieval.
//!
//! A query may carry structured hints alongside its free text: a company
//! ticker, a fiscal quarter, a fiscal year. Each hint is independently
//! optional. This module turns whatever hints are present into a
//! [`MetadataFilter`], a plain value the store interprets: zero conditions
//! mean an unconstrained search, one condition is a direct equality, and two
//! or more are a conjunction over all of them.
//!
//! Construction is pure and deterministic, does no I/O, and never produces a
//! malformed predicate: absent hints simply contribute no condition.

use serde::Serialize;

/// One equality condition over stored chunk metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FilterCondition {
    /// Company ticker, uppercase (e.g. "RIVN").
    Ticker(String),
    /// Fiscal quarter, uppercase (e.g. "Q4").
    Quarter(String),
    /// Fiscal year (e.g. 2025).
    Year(i64),
}

/// An equality/conjunction predicate over chunk metadata.
///
/// Built fresh per query from optional hints and discarded after use; it is
/// never persisted. An empty filter matches every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataFilter {
    conditions: Vec<FilterCondition>,
}

impl MetadataFilter {
    /// Build a filter from optional query hints.
    ///
    /// Ticker and quarter are normalized to uppercase before comparison, so
    /// `rivn`/`q4` match chunks tagged `RIVN`/`Q4`. Absent hints contribute
    /// nothing; all-absent hints yield the empty (unconstrained) filter.
    pub fn from_hints(ticker: Option<&str>, quarter: Option<&str>, year: Option<i64>) -> Self {
        let mut conditions = Vec::new();
        if let Some(ticker) = ticker {
            conditions.push(FilterCondition::Ticker(ticker.to_uppercase()));
        }
        if let Some(quarter) = quarter {
            conditions.push(FilterCondition::Quarter(quarter.to_uppercase()));
        }
        if let Some(year) = year {
            conditions.push(FilterCondition::Year(year));
        }
        Self { conditions }
    }

    /// The filter's conditions, in construction order.
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    /// `true` when no conditions are present (unconstrained search).
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Evaluate the predicate against one chunk's metadata fields.
    ///
    /// All conditions must hold (conjunction); an empty filter matches
    /// everything. A condition over a field the chunk lacks does not match.
    pub fn matches(&self, ticker: Option<&str>, quarter: Option<&str>, year: Option<i64>) -> bool {
        self.conditions.iter().all(|condition| match condition {
            FilterCondition::Ticker(want) => ticker == Some(want.as_str()),
            FilterCondition::Quarter(want) => quarter == Some(want.as_str()),
            FilterCondition::Year(want) => year == Some(*want),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hints_build_an_empty_filter() {
        let filter = MetadataFilter::from_hints(None, None, None);
        assert!(filter.is_empty());
        assert_eq!(filter.len(), 0);
        // Empty filter is an unconstrained no-op
        assert!(filter.matches(None, None, None));
        assert!(filter.matches(Some("RIVN"), Some("Q4"), Some(2025)));
    }

    #[test]
    fn single_hint_builds_a_single_condition() {
        let filter = MetadataFilter::from_hints(Some("TSLA"), None, None);
        assert_eq!(filter.len(), 1);
        assert_eq!(
            filter.conditions(),
            &[FilterCondition::Ticker("TSLA".to_string())]
        );
    }

    #[test]
    fn multiple_hints_build_a_conjunction_over_all_of_them() {
        let filter = MetadataFilter::from_hints(Some("RIVN"), Some("Q4"), Some(2025));
        assert_eq!(filter.len(), 3);
        assert!(filter
            .conditions()
            .contains(&FilterCondition::Ticker("RIVN".to_string())));
        assert!(filter
            .conditions()
            .contains(&FilterCondition::Quarter("Q4".to_string())));
        assert!(filter.conditions().contains(&FilterCondition::Year(2025)));

        // Conjunction: every condition must hold
        assert!(filter.matches(Some("RIVN"), Some("Q4"), Some(2025)));
        assert!(!filter.matches(Some("RIVN"), Some("Q4"), Some(2024)));
        assert!(!filter.matches(Some("TSLA"), Some("Q4"), Some(2025)));
        assert!(!filter.matches(Some("RIVN"), None, Some(2025)));
    }

    #[test]
    fn ticker_and_quarter_are_normalized_to_uppercase() {
        let filter = MetadataFilter::from_hints(Some("rivn"), Some("q4"), None);
        assert_eq!(
            filter.conditions(),
            &[
                FilterCondition::Ticker("RIVN".to_string()),
                FilterCondition::Quarter("Q4".to_string()),
            ]
        );
        assert!(filter.matches(Some("RIVN"), Some("Q4"), None));
    }

    #[test]
    fn equal_hints_build_equal_filters() {
        let a = MetadataFilter::from_hints(Some("RIVN"), None, Some(2025));
        let b = MetadataFilter::from_hints(Some("rivn"), None, Some(2025));
        assert_eq!(a, b);
    }

    #[test]
    fn condition_over_an_absent_field_never_matches() {
        let filter = MetadataFilter::from_hints(Some("RIVN"), None, None);
        // A chunk whose filename did not parse has no ticker at all.
        assert!(!filter.matches(None, Some("Q4"), Some(2025)));
    }
}
