//! Report Generator
//! The fixed catalogue of fifteen charts and the sequential run that loads
//! the inputs, aggregates each view and renders it.

use crate::aggregate::labels::{
    body_camera_label, gender_label, mental_illness_label, race_label, title_case, verbatim,
    NO_SIGNS, SIGNS_OF_MENTAL_ILLNESS,
};
use crate::aggregate::{binary_split, AggregateError, Aggregator, Period};
use crate::charts::{
    BarLayout, ChartData, ChartSpec, ChartStyle, Palette, RenderError, StaticChartRenderer, BLUE,
    GREEN, ORANGE, PINK, PURPLE, RED,
};
use crate::config::ReportConfig;
use crate::data::{DataLoader, IncidentTable, LoaderError};
use log::{debug, info};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const TOP_STATES: usize = 15;
const TOP_ARMED: usize = 12;
const TOP_CITIES: usize = 20;

const UNARMED_VALUE: &str = "unarmed";
const ARMED: &str = "Armed";
const UNARMED: &str = "Unarmed";

const INCIDENTS_AXIS: &str = "Number of Incidents";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to create output directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load inputs: {0}")]
    Load(#[from] LoaderError),
    #[error("Failed to aggregate chart {chart}: {source}")]
    Aggregate {
        chart: String,
        #[source]
        source: AggregateError,
    },
    #[error("Failed to render chart {chart}: {source}")]
    Render {
        chart: String,
        #[source]
        source: RenderError,
    },
}

/// Every chart the report produces, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    TemporalTrends,
    GeographicDistribution,
    RaceDistribution,
    AgeDistribution,
    ArmedStatus,
    MentalIllnessIndicator,
    ThreatLevel,
    FleeingStatus,
    BodyCameraPresence,
    GenderDistribution,
    MannerOfDeath,
    RaceMentalIllness,
    TopCities,
    ArmedStatusByRace,
    QuarterlyTrends,
}

fn chart(
    ordinal: u8,
    name: &'static str,
    title: &'static str,
    style: ChartStyle,
    figure: (f64, f64),
) -> ChartSpec {
    ChartSpec {
        ordinal,
        name,
        title,
        x_desc: "",
        y_desc: INCIDENTS_AXIS,
        style,
        palette: Palette::Categorical,
        series_colors: &[],
        figure,
        show_percent: false,
        label_every: 1,
    }
}

const VERTICAL: ChartStyle = ChartStyle::Bars(BarLayout::Vertical);
const HORIZONTAL: ChartStyle = ChartStyle::Bars(BarLayout::Horizontal);

impl ChartKind {
    pub const ALL: [ChartKind; 15] = [
        ChartKind::TemporalTrends,
        ChartKind::GeographicDistribution,
        ChartKind::RaceDistribution,
        ChartKind::AgeDistribution,
        ChartKind::ArmedStatus,
        ChartKind::MentalIllnessIndicator,
        ChartKind::ThreatLevel,
        ChartKind::FleeingStatus,
        ChartKind::BodyCameraPresence,
        ChartKind::GenderDistribution,
        ChartKind::MannerOfDeath,
        ChartKind::RaceMentalIllness,
        ChartKind::TopCities,
        ChartKind::ArmedStatusByRace,
        ChartKind::QuarterlyTrends,
    ];

    /// Progress text logged while the chart is generated.
    pub fn description(self) -> &'static str {
        match self {
            ChartKind::TemporalTrends => "Temporal trends",
            ChartKind::GeographicDistribution => "Geographic distribution",
            ChartKind::RaceDistribution => "Race distribution",
            ChartKind::AgeDistribution => "Age distribution",
            ChartKind::ArmedStatus => "Armed status",
            ChartKind::MentalIllnessIndicator => "Mental illness factor",
            ChartKind::ThreatLevel => "Threat level",
            ChartKind::FleeingStatus => "Fleeing status",
            ChartKind::BodyCameraPresence => "Body camera usage",
            ChartKind::GenderDistribution => "Gender distribution",
            ChartKind::MannerOfDeath => "Manner of death",
            ChartKind::RaceMentalIllness => "Race and mental illness correlation",
            ChartKind::TopCities => "Top cities",
            ChartKind::ArmedStatusByRace => "Armed status by race",
            ChartKind::QuarterlyTrends => "Quarterly trends",
        }
    }

    pub fn spec(self) -> ChartSpec {
        match self {
            ChartKind::TemporalTrends => ChartSpec {
                x_desc: "Time Period",
                palette: Palette::Solid(RED),
                label_every: 6,
                ..chart(
                    1,
                    "temporal_trends",
                    "Fatal Police Encounters: Monthly Trend Analysis",
                    ChartStyle::Area,
                    (14.0, 6.0),
                )
            },
            ChartKind::GeographicDistribution => ChartSpec {
                x_desc: "Number of Fatal Incidents",
                y_desc: "",
                palette: Palette::Gradient(RED),
                ..chart(
                    2,
                    "geographic_distribution",
                    "Geographic Concentration: States with Highest Incident Rates",
                    HORIZONTAL,
                    (14.0, 8.0),
                )
            },
            ChartKind::RaceDistribution => ChartSpec {
                show_percent: true,
                ..chart(
                    3,
                    "race_distribution",
                    "Demographic Profile: Racial Distribution of Fatal Encounters",
                    VERTICAL,
                    (12.0, 7.0),
                )
            },
            ChartKind::AgeDistribution => ChartSpec {
                x_desc: "Age Group",
                palette: Palette::Gradient(ORANGE),
                ..chart(
                    4,
                    "age_distribution",
                    "Age Distribution: Risk Profile Across Age Groups",
                    VERTICAL,
                    (14.0, 6.0),
                )
            },
            ChartKind::ArmedStatus => ChartSpec {
                x_desc: INCIDENTS_AXIS,
                y_desc: "",
                palette: Palette::Gradient(ORANGE),
                show_percent: true,
                ..chart(
                    5,
                    "armed_status",
                    "Weapon Presence: Armed Status at Time of Incident",
                    HORIZONTAL,
                    (14.0, 8.0),
                )
            },
            ChartKind::MentalIllnessIndicator => ChartSpec {
                palette: Palette::Fixed(&[RED, GREEN]),
                show_percent: true,
                ..chart(
                    6,
                    "mental_illness_indicator",
                    "Mental Health Factor: Prevalence in Fatal Encounters",
                    VERTICAL,
                    (10.0, 6.0),
                )
            },
            ChartKind::ThreatLevel => ChartSpec {
                palette: Palette::Fixed(&[RED, ORANGE, GREEN]),
                show_percent: true,
                ..chart(
                    7,
                    "threat_level",
                    "Threat Assessment: Perceived Threat Level During Incidents",
                    VERTICAL,
                    (12.0, 6.0),
                )
            },
            ChartKind::FleeingStatus => ChartSpec {
                show_percent: true,
                ..chart(
                    8,
                    "fleeing_status",
                    "Flight Response: Subject Behavior During Encounter",
                    ChartStyle::Bars(BarLayout::Auto),
                    (12.0, 6.0),
                )
            },
            ChartKind::BodyCameraPresence => ChartSpec {
                palette: Palette::Fixed(&[BLUE, ORANGE]),
                show_percent: true,
                ..chart(
                    9,
                    "body_camera_presence",
                    "Transparency Tool: Body Camera Deployment Rate",
                    VERTICAL,
                    (10.0, 6.0),
                )
            },
            ChartKind::GenderDistribution => ChartSpec {
                palette: Palette::Fixed(&[BLUE, PINK]),
                show_percent: true,
                ..chart(
                    10,
                    "gender_distribution",
                    "Gender Distribution: Incidents by Gender",
                    VERTICAL,
                    (10.0, 6.0),
                )
            },
            ChartKind::MannerOfDeath => ChartSpec {
                palette: Palette::Gradient(RED),
                show_percent: true,
                ..chart(
                    11,
                    "manner_of_death",
                    "Method Analysis: Classification of Fatal Force Used",
                    VERTICAL,
                    (12.0, 6.0),
                )
            },
            ChartKind::RaceMentalIllness => ChartSpec {
                y_desc: "Percentage (%)",
                series_colors: &[RED, GREEN],
                ..chart(
                    12,
                    "race_mental_illness",
                    "Mental Health Context: Prevalence by Demographic Group",
                    ChartStyle::StackedPercent,
                    (14.0, 7.0),
                )
            },
            ChartKind::TopCities => ChartSpec {
                x_desc: "Number of Fatal Incidents",
                y_desc: "",
                palette: Palette::Gradient(BLUE),
                ..chart(
                    13,
                    "top_cities",
                    "Urban Concentration: Cities with Highest Incident Frequency",
                    HORIZONTAL,
                    (14.0, 8.0),
                )
            },
            ChartKind::ArmedStatusByRace => ChartSpec {
                series_colors: &[ORANGE, BLUE],
                ..chart(
                    14,
                    "armed_status_by_race",
                    "Weapon Status: Armed vs Unarmed by Demographic Group",
                    ChartStyle::StackedCounts,
                    (14.0, 7.0),
                )
            },
            ChartKind::QuarterlyTrends => ChartSpec {
                palette: Palette::Solid(PURPLE),
                label_every: 2,
                ..chart(
                    15,
                    "quarterly_trends",
                    "Quarterly Performance: Incident Volume Trends",
                    VERTICAL,
                    (14.0, 6.0),
                )
            },
        }
    }

    /// Aggregate the view this chart draws.
    pub fn build(self, incidents: &IncidentTable) -> Result<ChartData, AggregateError> {
        let data = match self {
            ChartKind::TemporalTrends => ChartData::Series(Aggregator::time_buckets(
                incidents.iter().filter_map(|i| i.date),
                Period::Month,
            )?),
            ChartKind::GeographicDistribution => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.state.as_deref()),
                verbatim,
                Some(TOP_STATES),
                "state",
            )?),
            ChartKind::RaceDistribution => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.race.as_deref()),
                race_label,
                None,
                "race",
            )?),
            ChartKind::AgeDistribution => {
                ChartData::Series(Aggregator::age_bins(incidents.iter().map(|i| i.age))?)
            }
            ChartKind::ArmedStatus => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.armed.as_deref()),
                verbatim,
                Some(TOP_ARMED),
                "armed",
            )?),
            ChartKind::MentalIllnessIndicator => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.mental_illness),
                mental_illness_label,
                None,
                "signs_of_mental_illness",
            )?),
            ChartKind::ThreatLevel => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.threat_level.as_deref()),
                title_case,
                None,
                "threat_level",
            )?),
            ChartKind::FleeingStatus => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.flee.as_deref()),
                verbatim,
                None,
                "flee",
            )?),
            ChartKind::BodyCameraPresence => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.body_camera),
                body_camera_label,
                None,
                "body_camera",
            )?),
            ChartKind::GenderDistribution => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.gender.as_deref()),
                gender_label,
                None,
                "gender",
            )?),
            ChartKind::MannerOfDeath => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.manner_of_death.as_deref()),
                title_case,
                None,
                "manner_of_death",
            )?),
            ChartKind::RaceMentalIllness => {
                let mut tab = Aggregator::cross_tab(
                    incidents.iter().map(|i| (i.race.as_deref(), i.mental_illness)),
                    race_label,
                    mental_illness_label,
                    &[SIGNS_OF_MENTAL_ILLNESS, NO_SIGNS],
                    "race",
                )?;
                tab.sort_rows_by_column_pct(SIGNS_OF_MENTAL_ILLNESS);
                ChartData::Table(tab)
            }
            ChartKind::TopCities => ChartData::Series(Aggregator::frequency(
                incidents.iter().map(|i| i.city.as_deref()),
                verbatim,
                Some(TOP_CITIES),
                "city",
            )?),
            ChartKind::ArmedStatusByRace => {
                let mut tab = Aggregator::cross_tab(
                    incidents.iter().map(|i| {
                        let status =
                            binary_split(i.armed.as_deref(), UNARMED_VALUE, UNARMED, ARMED);
                        (i.race.as_deref(), Some(status))
                    }),
                    race_label,
                    verbatim,
                    &[ARMED, UNARMED],
                    "race",
                )?;
                tab.sort_rows_by_total();
                ChartData::Table(tab)
            }
            ChartKind::QuarterlyTrends => ChartData::Series(Aggregator::time_buckets(
                incidents.iter().filter_map(|i| i.date),
                Period::Quarter,
            )?),
        };
        Ok(data)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub charts: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub incidents: usize,
}

pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Load every input and write all charts in catalogue order. The first
    /// failure stops the run; charts already written stay on disk.
    pub fn run(&self) -> Result<ReportSummary, ReportError> {
        let output = &self.config.output.dir;
        fs::create_dir_all(output).map_err(|source| ReportError::Io {
            path: output.clone(),
            source,
        })?;

        info!("Loading datasets...");
        let loader = DataLoader::new(self.config.input.clone());
        let incidents = loader.load_incidents()?;
        let references = loader.load_reference_tables()?;
        for (kind, df) in references.iter() {
            debug!("Reference table {}: {} columns", kind.name(), df.width());
        }

        info!("Analyzing {} incidents...", incidents.len());

        let mut charts = Vec::with_capacity(ChartKind::ALL.len());
        for kind in ChartKind::ALL {
            charts.push(self.generate(kind, &incidents)?);
        }

        let output_dir = fs::canonicalize(output).unwrap_or_else(|_| output.clone());
        Ok(ReportSummary {
            charts,
            output_dir,
            incidents: incidents.len(),
        })
    }

    /// Aggregate and render one chart, returning the written file.
    pub fn generate(
        &self,
        kind: ChartKind,
        incidents: &IncidentTable,
    ) -> Result<PathBuf, ReportError> {
        let spec = kind.spec();
        info!("Generating Chart {}: {}...", spec.ordinal, kind.description());

        let data = kind.build(incidents).map_err(|source| ReportError::Aggregate {
            chart: spec.file_stem(),
            source,
        })?;
        debug!("{}: {} categories", spec.file_stem(), data.category_count());

        let path = self.config.output.dir.join(spec.file_name());
        StaticChartRenderer::render(&spec, &data, &path, self.config.output.dpi).map_err(|source| {
            ReportError::Render {
                chart: spec.file_stem(),
                source,
            }
        })?;

        Ok(path)
    }
}
