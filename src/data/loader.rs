//! CSV Data Loader Module
//! Reads the incident and reference tables using Polars.

use crate::config::{Encoding, InputConfig, TableSource};
use crate::data::incident::{IncidentTable, ReferenceKind, ReferenceTables};
use crate::data::processor::{DataProcessor, ProcessorError};
use log::{debug, info};
use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;

/// Columns the incident table must carry.
pub const INCIDENT_COLUMNS: [&str; 12] = [
    "date",
    "manner_of_death",
    "armed",
    "age",
    "gender",
    "race",
    "city",
    "state",
    "signs_of_mental_illness",
    "threat_level",
    "flee",
    "body_camera",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} is not valid UTF-8")]
    Encoding { path: PathBuf },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Loads every input table declared in the configuration.
pub struct DataLoader {
    inputs: InputConfig,
}

impl DataLoader {
    pub fn new(inputs: InputConfig) -> Self {
        Self { inputs }
    }

    /// Read one CSV file with its declared encoding. Column names come back
    /// with leading and trailing whitespace stripped.
    pub fn read_table(source: &TableSource) -> Result<DataFrame, LoaderError> {
        let bytes = fs::read(&source.path).map_err(|err| LoaderError::Io {
            path: source.path.clone(),
            source: err,
        })?;
        let text = Self::decode(bytes, source.encoding).ok_or_else(|| LoaderError::Encoding {
            path: source.path.clone(),
        })?;

        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
            .finish()?;

        Self::strip_column_names(&mut df)?;
        debug!(
            "Read {:?}: {} rows, {} columns",
            source.path,
            df.height(),
            df.width()
        );
        Ok(df)
    }

    /// Decode raw bytes; Latin-1 maps each byte to the code point of the
    /// same value, so it never fails.
    pub fn decode(bytes: Vec<u8>, encoding: Encoding) -> Option<String> {
        match encoding {
            Encoding::Utf8 => String::from_utf8(bytes).ok(),
            Encoding::Latin1 => Some(bytes.into_iter().map(char::from).collect()),
        }
    }

    fn strip_column_names(df: &mut DataFrame) -> Result<(), LoaderError> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.as_str().trim().to_string())
            .collect();
        df.set_column_names(names)?;
        Ok(())
    }

    /// Fail unless every name in `columns` is present.
    pub fn require_columns(
        df: &DataFrame,
        table: &str,
        columns: &[&str],
    ) -> Result<(), LoaderError> {
        for column in columns {
            if df.column(column).is_err() {
                return Err(LoaderError::MissingColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Load the incident table and convert it into typed records.
    pub fn load_incidents(&self) -> Result<IncidentTable, LoaderError> {
        let df = Self::read_table(&self.inputs.incidents)?;
        Self::require_columns(&df, "incidents", &INCIDENT_COLUMNS)?;
        let records = DataProcessor::incidents_from_frame(&df)?;
        Ok(IncidentTable::new(records))
    }

    fn reference_source(&self, kind: ReferenceKind) -> &TableSource {
        match kind {
            ReferenceKind::Income => &self.inputs.income,
            ReferenceKind::Education => &self.inputs.education,
            ReferenceKind::Poverty => &self.inputs.poverty,
            ReferenceKind::RaceShare => &self.inputs.race_share,
        }
    }

    /// Load the four reference tables in parallel.
    pub fn load_reference_tables(&self) -> Result<ReferenceTables, LoaderError> {
        let tables = ReferenceKind::ALL
            .par_iter()
            .map(|&kind| -> Result<(ReferenceKind, DataFrame), LoaderError> {
                let df = Self::read_table(self.reference_source(kind))?;
                Self::require_columns(&df, kind.name(), kind.required_columns())?;
                Ok((kind, df))
            })
            .collect::<Result<Vec<_>, LoaderError>>()?;

        for (kind, df) in &tables {
            info!("Loaded {} table: {} rows", kind.name(), df.height());
        }

        Ok(ReferenceTables::new(tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    const DEATHS_HEADER: &str = "id,name,date,manner_of_death,armed,age,gender,race,city,state,signs_of_mental_illness,threat_level,flee,body_camera";

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> TableSource {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        TableSource {
            path,
            encoding: Encoding::Latin1,
        }
    }

    fn write_inputs(dir: &TempDir) -> InputConfig {
        let deaths = format!(
            "{DEATHS_HEADER}\n\
             3,Tim Elliot,02/01/15,shot,gun,53,M,A,Shelton,WA,True,attack,Not fleeing,False\n\
             4,Lewis Lee Lembke,02/01/15,shot,gun,47,M,W,Aloha,OR,False,attack,Not fleeing,False\n\
             5,John Paul Quintero,03/01/15,shot and Tasered,unarmed,23,M,H,Wichita,KS,False,other,Not fleeing,False\n\
             8,Matthew Hoffman,04/02/16,shot,toy weapon,,M,,San Francisco,CA,True,attack,,True\n"
        );
        InputConfig {
            incidents: write(dir.path(), "deaths.csv", deaths.as_bytes()),
            income: write(
                dir.path(),
                "income.csv",
                b"Geographic Area ,City , Median Income\nAL,Abanda CDP,11207\n",
            ),
            education: write(
                dir.path(),
                "education.csv",
                b"Geographic Area,City,percent_completed_hs\nAL,Abanda CDP,21.2\n",
            ),
            poverty: write(
                dir.path(),
                "poverty.csv",
                b"Geographic Area,City,poverty_rate\nAL,Abanda CDP,78.8\n",
            ),
            race_share: write(
                dir.path(),
                "race.csv",
                b"Geographic area,City,share_white,share_black,share_native_american,share_asian,share_hispanic\nAL,Abanda CDP,67.2,30.2,0,0,1.6\n",
            ),
        }
    }

    #[test]
    fn test_decode_latin1() {
        let text =
            DataLoader::decode(vec![b'C', b'a', 0xF1, b'o', b'n'], Encoding::Latin1).unwrap();
        assert_eq!(text, "Cañon");
    }

    #[test]
    fn test_decode_utf8_rejects_latin1_bytes() {
        assert!(DataLoader::decode(vec![b'C', 0xF1], Encoding::Utf8).is_none());
    }

    #[test]
    fn test_read_table_strips_headers() {
        let dir = TempDir::new().unwrap();
        let source = write(dir.path(), "t.csv", b" City , Median Income \nEspa\xF1ola,41000\n");
        let df = DataLoader::read_table(&source).unwrap();

        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["City", "Median Income"]);
        let cities = DataProcessor::text_column(&df, "City").unwrap();
        assert_eq!(cities, vec![Some("Española".to_string())]);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = TableSource {
            path: dir.path().join("absent.csv"),
            encoding: Encoding::Latin1,
        };
        let result = DataLoader::read_table(&source);
        assert!(matches!(result, Err(LoaderError::Io { .. })));
    }

    #[test]
    fn test_missing_column() {
        let dir = TempDir::new().unwrap();
        let source = write(dir.path(), "t.csv", b"City,State\nAloha,OR\n");
        let df = DataLoader::read_table(&source).unwrap();
        let err =
            DataLoader::require_columns(&df, "income", &["City", "Median Income"]).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::MissingColumn { ref table, ref column }
                if table == "income" && column == "Median Income"
        ));
    }

    #[test]
    fn test_load_incidents() {
        let dir = TempDir::new().unwrap();
        let loader = DataLoader::new(write_inputs(&dir));
        let table = loader.load_incidents().unwrap();

        assert_eq!(table.len(), 4);
        let records: Vec<_> = table.iter().collect();
        assert_eq!(records[0].year, Some(2015));
        assert_eq!(records[0].month, Some(1));
        assert_eq!(records[0].mental_illness, Some(true));
        assert_eq!(records[2].manner_of_death.as_deref(), Some("shot and Tasered"));
        assert_eq!(records[3].race, None);
        assert_eq!(records[3].age, None);
        assert_eq!(records[3].flee, None);
        assert_eq!(records[3].body_camera, Some(true));
    }

    #[test]
    fn test_load_incidents_with_blank_date() {
        let dir = TempDir::new().unwrap();
        let mut inputs = write_inputs(&dir);
        let deaths = format!(
            "{DEATHS_HEADER}
             3,Tim Elliot,02/01/15,shot,gun,53,M,A,Shelton,WA,True,attack,Not fleeing,False
             4,Lewis Lee Lembke,,shot,gun,47,M,W,Aloha,OR,False,attack,Not fleeing,False
"
        );
        inputs.incidents = write(dir.path(), "deaths.csv", deaths.as_bytes());

        let table = DataLoader::new(inputs).load_incidents().unwrap();
        assert_eq!(table.len(), 2);
        let records: Vec<_> = table.iter().collect();
        assert_eq!(records[0].year, Some(2015));
        assert_eq!(records[1].date, None);
        assert_eq!(records[1].race.as_deref(), Some("W"));
    }

    #[test]
    fn test_load_reference_tables() {
        let dir = TempDir::new().unwrap();
        let loader = DataLoader::new(write_inputs(&dir));
        let tables = loader.load_reference_tables().unwrap();

        let income = tables.get(ReferenceKind::Income).unwrap();
        assert!(income.column("Median Income").is_ok());
        assert_eq!(tables.iter().count(), 4);
    }

    #[test]
    fn test_reference_table_missing_column() {
        let dir = TempDir::new().unwrap();
        let mut inputs = write_inputs(&dir);
        inputs.poverty = write(dir.path(), "poverty.csv", b"Geographic Area,City\nAL,Abanda CDP\n");

        let result = DataLoader::new(inputs).load_reference_tables();
        assert!(matches!(result, Err(LoaderError::MissingColumn { .. })));
    }
}
