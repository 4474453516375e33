//! Aggregate views: the per-chart results handed to the renderer.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One labelled count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewEntry {
    pub label: String,
    pub count: usize,
}

/// Ordered label → count pairs.
///
/// `universe` is the number of records that had a value for the aggregated
/// field, counted before any top-K truncation; percentages use it as the
/// denominator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateView {
    pub entries: Vec<ViewEntry>,
    pub universe: usize,
}

impl AggregateView {
    pub fn new(entries: Vec<ViewEntry>, universe: usize) -> Self {
        Self { entries, universe }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    pub fn max_count(&self) -> usize {
        self.entries.iter().map(|e| e.count).max().unwrap_or(0)
    }

    pub fn percentage(&self, count: usize) -> f64 {
        if self.universe == 0 {
            0.0
        } else {
            count as f64 / self.universe as f64 * 100.0
        }
    }
}

#[cfg(test)]
impl AggregateView {
    /// Sum of the displayed counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn count_of(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.count)
    }
}

/// Counts for every (row, column) combination of two categorical fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTab {
    rows: Vec<String>,
    columns: Vec<String>,
    counts: Vec<Vec<usize>>,
}

impl CrossTab {
    /// Build from labelled pairs. `columns` fixes the order (and presence) of
    /// the expected columns; unexpected column labels are appended in
    /// ascending order. Rows start in ascending label order.
    pub fn from_pairs<I>(pairs: I, columns: &[&str]) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut cells: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for (row, column) in pairs {
            *cells.entry(row).or_default().entry(column).or_default() += 1;
        }

        let mut all_columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let mut extra: Vec<String> = cells
            .values()
            .flat_map(|row| row.keys())
            .filter(|c| !all_columns.contains(c))
            .cloned()
            .collect();
        extra.sort();
        extra.dedup();
        all_columns.extend(extra);

        let rows: Vec<String> = cells.keys().cloned().collect();
        let counts = cells
            .values()
            .map(|row| {
                all_columns
                    .iter()
                    .map(|c| row.get(c).copied().unwrap_or(0))
                    .collect()
            })
            .collect();

        Self {
            rows,
            columns: all_columns,
            counts,
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_counts(&self, row: usize) -> &[usize] {
        &self.counts[row]
    }

    pub fn row_total(&self, row: usize) -> usize {
        self.counts[row].iter().sum()
    }

    pub fn max_row_total(&self) -> usize {
        (0..self.rows.len())
            .map(|r| self.row_total(r))
            .max()
            .unwrap_or(0)
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Percentages of each row's total; every row sums to 100.
    pub fn row_percentages(&self, row: usize) -> Vec<f64> {
        let total = self.row_total(row);
        self.counts[row]
            .iter()
            .map(|&c| {
                if total == 0 {
                    0.0
                } else {
                    c as f64 / total as f64 * 100.0
                }
            })
            .collect()
    }

    /// Order rows by the share of `column`, highest first. Ties keep label
    /// order. An unknown column leaves the order unchanged.
    pub fn sort_rows_by_column_pct(&mut self, column: &str) {
        let Some(col) = self.column_index(column) else {
            return;
        };
        let shares: Vec<f64> = (0..self.rows.len())
            .map(|r| self.row_percentages(r)[col])
            .collect();
        self.reorder(|a, b| {
            shares[b]
                .partial_cmp(&shares[a])
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Order rows by their total count, highest first. Ties keep label order.
    pub fn sort_rows_by_total(&mut self) {
        let totals: Vec<usize> = (0..self.rows.len()).map(|r| self.row_total(r)).collect();
        self.reorder(|a, b| totals[b].cmp(&totals[a]));
    }

    fn reorder<F>(&mut self, compare: F)
    where
        F: Fn(usize, usize) -> Ordering,
    {
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by(|&a, &b| compare(a, b).then_with(|| self.rows[a].cmp(&self.rows[b])));
        self.rows = order.iter().map(|&i| self.rows[i].clone()).collect();
        self.counts = order.iter().map(|&i| self.counts[i].clone()).collect();
    }
}
