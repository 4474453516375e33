//! Aggregation Calculator Module
//! Frequency counts, calendar buckets, age bins and cross-tabulations.

use crate::aggregate::view::{AggregateView, CrossTab, ViewEntry};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AggregateError {
    #[error("No records have a value for {0}")]
    Empty(String),
}

/// Calendar period for time-bucketed counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Quarter,
}

impl Period {
    /// Bucket key `(year, month or quarter)`; keys sort chronologically.
    pub fn key(self, date: NaiveDate) -> (i32, u32) {
        match self {
            Period::Month => (date.year(), date.month()),
            Period::Quarter => (date.year(), (date.month() - 1) / 3 + 1),
        }
    }

    pub fn label(self, (year, n): (i32, u32)) -> String {
        match self {
            Period::Month => format!("{year}-{n:02}"),
            Period::Quarter => format!("Q{n} {year}"),
        }
    }
}

/// A half-open age range `[lower, upper)`; the last bin also includes its
/// upper bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBin {
    pub lower: f64,
    pub upper: f64,
    pub label: &'static str,
    pub closed: bool,
}

impl AgeBin {
    const fn new(lower: f64, upper: f64, label: &'static str) -> Self {
        Self {
            lower,
            upper,
            label,
            closed: false,
        }
    }

    pub fn contains(&self, age: f64) -> bool {
        age >= self.lower && (age < self.upper || (self.closed && age == self.upper))
    }
}

pub const AGE_BINS: [AgeBin; 7] = [
    AgeBin::new(0.0, 18.0, "Under 18"),
    AgeBin::new(18.0, 25.0, "18-24"),
    AgeBin::new(25.0, 35.0, "25-34"),
    AgeBin::new(35.0, 45.0, "35-44"),
    AgeBin::new(45.0, 55.0, "45-54"),
    AgeBin::new(55.0, 65.0, "55-64"),
    AgeBin {
        lower: 65.0,
        upper: 100.0,
        label: "65+",
        closed: true,
    },
];

/// Returns `hit` when `value` equals `sentinel` exactly, `miss` otherwise
/// (including when the value is missing).
pub fn binary_split<'a>(
    value: Option<&str>,
    sentinel: &str,
    hit: &'a str,
    miss: &'a str,
) -> &'a str {
    if value == Some(sentinel) {
        hit
    } else {
        miss
    }
}

/// Handles the descriptive aggregations behind every chart.
pub struct Aggregator;

impl Aggregator {
    /// Count each distinct non-missing value under its display label.
    ///
    /// Values sharing a label are merged. Entries are ordered by count
    /// descending, then label ascending, and optionally cut to the first
    /// `top_k`.
    pub fn frequency<K, I, F>(
        values: I,
        label: F,
        top_k: Option<usize>,
        field: &str,
    ) -> Result<AggregateView, AggregateError>
    where
        I: IntoIterator<Item = Option<K>>,
        F: Fn(K) -> String,
    {
        let mut universe = 0;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in values.into_iter().flatten() {
            universe += 1;
            *counts.entry(label(value)).or_default() += 1;
        }

        if counts.is_empty() {
            return Err(AggregateError::Empty(field.to_string()));
        }

        let mut entries: Vec<ViewEntry> = counts
            .into_iter()
            .map(|(label, count)| ViewEntry { label, count })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        if let Some(k) = top_k {
            entries.truncate(k);
        }

        Ok(AggregateView::new(entries, universe))
    }

    /// Count records per calendar period in chronological order. Periods
    /// without records do not appear.
    pub fn time_buckets<I>(dates: I, period: Period) -> Result<AggregateView, AggregateError>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut buckets: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        for date in dates {
            *buckets.entry(period.key(date)).or_default() += 1;
        }

        if buckets.is_empty() {
            return Err(AggregateError::Empty("date".to_string()));
        }

        let universe = buckets.values().sum();
        let entries = buckets
            .into_iter()
            .map(|(key, count)| ViewEntry {
                label: period.label(key),
                count,
            })
            .collect();

        Ok(AggregateView::new(entries, universe))
    }

    /// Count ages per `AGE_BINS` range in bin order. Empty bins and ages
    /// outside every bin are omitted.
    pub fn age_bins<I>(ages: I) -> Result<AggregateView, AggregateError>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut counts = [0usize; AGE_BINS.len()];
        for age in ages.into_iter().flatten() {
            if let Some(i) = AGE_BINS.iter().position(|bin| bin.contains(age)) {
                counts[i] += 1;
            }
        }

        let universe: usize = counts.iter().sum();
        if universe == 0 {
            return Err(AggregateError::Empty("age".to_string()));
        }

        let entries = AGE_BINS
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(bin, count)| ViewEntry {
                label: bin.label.to_string(),
                count,
            })
            .collect();

        Ok(AggregateView::new(entries, universe))
    }

    /// Cross-tabulate two fields, skipping records missing either value.
    pub fn cross_tab<R, C, I, FR, FC>(
        pairs: I,
        row_label: FR,
        column_label: FC,
        columns: &[&str],
        field: &str,
    ) -> Result<CrossTab, AggregateError>
    where
        I: IntoIterator<Item = (Option<R>, Option<C>)>,
        FR: Fn(R) -> String,
        FC: Fn(C) -> String,
    {
        let labelled = pairs.into_iter().filter_map(|(row, column)| match (row, column) {
            (Some(row), Some(column)) => Some((row_label(row), column_label(column))),
            _ => None,
        });

        let tab = CrossTab::from_pairs(labelled, columns);
        if tab.is_empty() {
            return Err(AggregateError::Empty(field.to_string()));
        }
        Ok(tab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::labels::{race_label, verbatim};
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_frequency_counts_non_missing() {
        let values = [Some("gun"), None, Some("knife"), Some("gun"), None, Some("gun")];
        let view = Aggregator::frequency(values, verbatim, None, "armed").unwrap();

        assert_eq!(view.universe, 4);
        assert_eq!(view.total(), 4);
        assert_eq!(view.labels(), vec!["gun", "knife"]);
        assert_eq!(view.count_of("gun"), Some(3));
    }

    #[test]
    fn test_frequency_top_k_keeps_universe() {
        let values = ["CA", "CA", "CA", "TX", "TX", "FL", "AZ"].map(Some);
        let view = Aggregator::frequency(values, verbatim, Some(2), "state").unwrap();

        assert_eq!(view.labels(), vec!["CA", "TX"]);
        assert_eq!(view.universe, 7);
        assert_eq!(view.total(), 5);
    }

    #[test]
    fn test_frequency_ties_sorted_by_label() {
        let values = ["b", "a", "c", "a", "b", "c"].map(Some);
        let view = Aggregator::frequency(values, verbatim, None, "x").unwrap();
        assert_eq!(view.labels(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_frequency_merges_unknown_codes() {
        let values = ["W", "Z", "Q", "W"].map(Some);
        let view = Aggregator::frequency(values, race_label, None, "race").unwrap();
        assert_eq!(view.count_of("White"), Some(2));
        assert_eq!(view.count_of("Unknown"), Some(2));
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_frequency_empty_is_error() {
        let values: [Option<&str>; 2] = [None, None];
        let result = Aggregator::frequency(values, verbatim, None, "flee");
        assert_eq!(result, Err(AggregateError::Empty("flee".to_string())));
    }

    #[test]
    fn test_frequency_is_deterministic() {
        let values: Vec<Option<&str>> = ["x", "y", "z", "y", "x", "w", "v"]
            .into_iter()
            .map(Some)
            .collect();
        let first = Aggregator::frequency(values.clone(), verbatim, None, "x").unwrap();
        for _ in 0..10 {
            let again = Aggregator::frequency(values.clone(), verbatim, None, "x").unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_month_and_quarter_bucket() {
        let dates = [date(2015, 3, 14)];
        let months = Aggregator::time_buckets(dates, Period::Month).unwrap();
        let quarters = Aggregator::time_buckets(dates, Period::Quarter).unwrap();
        assert_eq!(months.labels(), vec!["2015-03"]);
        assert_eq!(quarters.labels(), vec!["Q1 2015"]);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(3, 1)]
    #[case(4, 2)]
    #[case(9, 3)]
    #[case(10, 4)]
    #[case(12, 4)]
    fn test_quarter_key(#[case] month: u32, #[case] quarter: u32) {
        assert_eq!(Period::Quarter.key(date(2016, month, 1)), (2016, quarter));
    }

    #[test]
    fn test_time_buckets_chronological_without_gaps() {
        let dates = [
            date(2016, 2, 1),
            date(2015, 1, 5),
            date(2015, 12, 31),
            date(2015, 1, 20),
            date(2016, 11, 3),
        ];
        let months = Aggregator::time_buckets(dates, Period::Month).unwrap();
        assert_eq!(months.labels(), vec!["2015-01", "2015-12", "2016-02", "2016-11"]);
        assert_eq!(months.count_of("2015-01"), Some(2));

        let quarters = Aggregator::time_buckets(dates, Period::Quarter).unwrap();
        assert_eq!(quarters.labels(), vec!["Q1 2015", "Q4 2015", "Q1 2016", "Q4 2016"]);

        let keys: Vec<(i32, u32)> = dates.iter().map(|d| Period::Quarter.key(*d)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert!(sorted.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_age_bins_are_contiguous() {
        for pair in AGE_BINS.windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
        }
        assert_eq!(AGE_BINS[0].lower, 0.0);
        assert_eq!(AGE_BINS[AGE_BINS.len() - 1].upper, 100.0);
    }

    #[rstest]
    #[case(0.0, "Under 18")]
    #[case(17.9, "Under 18")]
    #[case(18.0, "18-24")]
    #[case(24.0, "18-24")]
    #[case(25.0, "25-34")]
    #[case(64.5, "55-64")]
    #[case(65.0, "65+")]
    #[case(100.0, "65+")]
    fn test_age_falls_in_exactly_one_bin(#[case] age: f64, #[case] label: &str) {
        let matches: Vec<&AgeBin> = AGE_BINS.iter().filter(|b| b.contains(age)).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].label, label);
    }

    #[test]
    fn test_age_bins_preserve_order_and_omit_empty() {
        let ages = [Some(70.0), Some(20.0), None, Some(19.0), Some(120.0), Some(-1.0)];
        let view = Aggregator::age_bins(ages).unwrap();
        assert_eq!(view.labels(), vec!["18-24", "65+"]);
        assert_eq!(view.count_of("18-24"), Some(2));
        assert_eq!(view.universe, 3);
    }

    #[test]
    fn test_binary_split() {
        assert_eq!(binary_split(Some("unarmed"), "unarmed", "Unarmed", "Armed"), "Unarmed");
        assert_eq!(binary_split(Some("Unarmed"), "unarmed", "Unarmed", "Armed"), "Armed");
        assert_eq!(binary_split(Some("gun"), "unarmed", "Unarmed", "Armed"), "Armed");
        assert_eq!(binary_split(None, "unarmed", "Unarmed", "Armed"), "Armed");
    }

    #[test]
    fn test_cross_tab_skips_incomplete_pairs() {
        let pairs = [
            (Some("W"), Some(true)),
            (Some("W"), None),
            (None, Some(false)),
            (Some("B"), Some(false)),
        ];
        let tab = Aggregator::cross_tab(
            pairs,
            race_label,
            |flag: bool| flag.to_string(),
            &["true", "false"],
            "race",
        )
        .unwrap();
        assert_eq!(tab.rows(), &["Black".to_string(), "White".to_string()]);
        assert_eq!(tab.row_counts(1), &[1, 0]);
    }

    #[test]
    fn test_cross_tab_empty_is_error() {
        let pairs: [(Option<&str>, Option<bool>); 1] = [(None, Some(true))];
        let result = Aggregator::cross_tab(pairs, race_label, |f: bool| f.to_string(), &[], "race");
        assert!(matches!(result, Err(AggregateError::Empty(_))));
    }
}
