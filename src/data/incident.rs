//! Incident records and the loaded tables shared by every chart.

use chrono::{Datelike, NaiveDate};
use polars::prelude::DataFrame;

/// One fatal encounter.
///
/// Text fields are `None` when the cell was empty. A blank date leaves
/// `date`, `year` and `month` all `None`; the record still counts in every
/// view that does not bucket by time.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub race: Option<String>,
    pub age: Option<f64>,
    pub armed: Option<String>,
    pub gender: Option<String>,
    pub mental_illness: Option<bool>,
    pub threat_level: Option<String>,
    pub flee: Option<String>,
    pub body_camera: Option<bool>,
    pub manner_of_death: Option<String>,
}

impl Incident {
    /// A record dated `date` (if any), with `year` and `month` derived from
    /// it and every other field missing.
    pub fn dated(date: Option<NaiveDate>) -> Self {
        Self {
            date,
            year: date.map(|d| d.year()),
            month: date.map(|d| d.month()),
            state: None,
            city: None,
            race: None,
            age: None,
            armed: None,
            gender: None,
            mental_illness: None,
            threat_level: None,
            flee: None,
            body_camera: None,
            manner_of_death: None,
        }
    }
}

/// The incident table, read-only after load.
#[derive(Debug, Clone, Default)]
pub struct IncidentTable {
    records: Vec<Incident>,
}

impl IncidentTable {
    pub fn new(records: Vec<Incident>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Incident> {
        self.records.iter()
    }
}

/// The four demographic reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Income,
    Education,
    Poverty,
    RaceShare,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Income,
        ReferenceKind::Education,
        ReferenceKind::Poverty,
        ReferenceKind::RaceShare,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReferenceKind::Income => "income",
            ReferenceKind::Education => "education",
            ReferenceKind::Poverty => "poverty",
            ReferenceKind::RaceShare => "race_share",
        }
    }

    /// Columns every copy of this table must carry (after header stripping).
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            ReferenceKind::Income => &["Geographic Area", "City", "Median Income"],
            ReferenceKind::Education => &["Geographic Area", "City", "percent_completed_hs"],
            ReferenceKind::Poverty => &["Geographic Area", "City", "poverty_rate"],
            ReferenceKind::RaceShare => &[
                "Geographic area",
                "City",
                "share_white",
                "share_black",
                "share_native_american",
                "share_asian",
                "share_hispanic",
            ],
        }
    }
}

/// Reference tables keyed by city/state. Loaded for availability; no chart
/// joins them yet.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    tables: Vec<(ReferenceKind, DataFrame)>,
}

impl ReferenceTables {
    pub fn new(tables: Vec<(ReferenceKind, DataFrame)>) -> Self {
        Self { tables }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ReferenceKind, DataFrame)> {
        self.tables.iter()
    }
}

#[cfg(test)]
impl ReferenceTables {
    pub fn get(&self, kind: ReferenceKind) -> Option<&DataFrame> {
        self.tables
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, df)| df)
    }
}

#[cfg(test)]
impl Incident {
    pub fn on(date: NaiveDate) -> Self {
        Self::dated(Some(date))
    }

    pub fn with_race(mut self, race: &str) -> Self {
        self.race = Some(race.to_string());
        self
    }

    pub fn with_mental_illness(mut self, flag: bool) -> Self {
        self.mental_illness = Some(flag);
        self
    }

    pub fn with_armed(mut self, armed: &str) -> Self {
        self.armed = Some(armed.to_string());
        self
    }

    pub fn with_state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_fields() {
        let incident = Incident::on(NaiveDate::from_ymd_opt(2015, 3, 14).unwrap());
        assert_eq!(incident.year, Some(2015));
        assert_eq!(incident.month, Some(3));
        assert!(incident.race.is_none());
    }

    #[test]
    fn test_undated_record_has_no_derived_fields() {
        let incident = Incident::dated(None);
        assert_eq!(incident.date, None);
        assert_eq!(incident.year, None);
        assert_eq!(incident.month, None);
    }

    #[test]
    fn test_reference_lookup() {
        let tables = ReferenceTables::new(vec![(ReferenceKind::Poverty, DataFrame::default())]);
        assert!(tables.get(ReferenceKind::Poverty).is_some());
        assert!(tables.get(ReferenceKind::Income).is_none());
    }
}
