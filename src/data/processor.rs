//! Data Processor Module
//! Turns the loaded incident DataFrame into typed records.

use crate::data::incident::Incident;
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

/// Day/month/two-digit-year, e.g. `14/03/15`.
pub const DATE_FORMAT: &str = "%d/%m/%y";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Record {row}: cannot parse date '{value}' (expected dd/mm/yy)")]
    InvalidDate { row: usize, value: String },
}

/// Handles conversion from raw columns to incident records.
pub struct DataProcessor;

impl DataProcessor {
    /// Parse an incident date in `dd/mm/yy` form.
    pub fn parse_date(text: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
    }

    /// Build one `Incident` per row. A blank date is kept as `None`; the
    /// first non-empty date that does not parse is an error.
    pub fn incidents_from_frame(df: &DataFrame) -> Result<Vec<Incident>, ProcessorError> {
        let dates = Self::text_column(df, "date")?;
        let mut states = Self::text_column(df, "state")?;
        let mut cities = Self::text_column(df, "city")?;
        let mut races = Self::text_column(df, "race")?;
        let ages = Self::float_column(df, "age")?;
        let mut armed = Self::text_column(df, "armed")?;
        let mut genders = Self::text_column(df, "gender")?;
        let mental = Self::bool_column(df, "signs_of_mental_illness")?;
        let mut threats = Self::text_column(df, "threat_level")?;
        let mut flee = Self::text_column(df, "flee")?;
        let cameras = Self::bool_column(df, "body_camera")?;
        let mut manners = Self::text_column(df, "manner_of_death")?;

        let mut incidents = Vec::with_capacity(df.height());

        for (i, raw) in dates.into_iter().enumerate() {
            let row = i + 1;
            let date = raw
                .map(|text| {
                    Self::parse_date(&text).ok_or(ProcessorError::InvalidDate { row, value: text })
                })
                .transpose()?;

            incidents.push(Incident {
                state: states[i].take(),
                city: cities[i].take(),
                race: races[i].take(),
                age: ages[i],
                armed: armed[i].take(),
                gender: genders[i].take(),
                mental_illness: mental[i],
                threat_level: threats[i].take(),
                flee: flee[i].take(),
                body_camera: cameras[i],
                manner_of_death: manners[i].take(),
                ..Incident::dated(date)
            });
        }

        Ok(incidents)
    }

    /// Text values with surrounding whitespace removed; empty cells are `None`.
    pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, ProcessorError> {
        let column = df.column(name)?.cast(&DataType::String)?;
        let values = column
            .str()?
            .into_iter()
            .map(|v| {
                v.map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .collect();
        Ok(values)
    }

    /// Numeric values as `f64`; unparseable cells and NaN are `None`.
    pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        let values = column
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Ok(values)
    }

    /// Boolean flags. Accepts a native boolean column or `true`/`false` text
    /// in any case; anything else is `None`.
    pub fn bool_column(df: &DataFrame, name: &str) -> Result<Vec<Option<bool>>, ProcessorError> {
        let column = df.column(name)?;
        if column.dtype() == &DataType::Boolean {
            return Ok(column.bool()?.into_iter().collect());
        }

        let values = Self::text_column(df, name)?
            .into_iter()
            .map(|v| v.and_then(|text| Self::parse_flag(&text)))
            .collect();
        Ok(values)
    }

    fn parse_flag(text: &str) -> Option<bool> {
        if text.eq_ignore_ascii_case("true") {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}
