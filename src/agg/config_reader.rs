use crate::agg::{AggResult, OpeningJsonSnafu, ParsingJsonSnafu};

use poll_aggregation::{Poll, PollError};
use snafu::prelude::*;

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(rename = "dashboardName")]
    pub dashboard_name: String,
    #[serde(rename = "raceDate")]
    pub race_date: Option<String>,
    #[serde(rename = "jurisdiction")]
    pub jurisdiction: Option<String>,
    #[serde(rename = "office")]
    pub office: Option<String>,
}

/// The config echo included at the top of the output summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub dashboard: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    #[serde(rename = "goldMultiplier")]
    pub gold_multiplier: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSettings {
    /// Explicit list of labels to project. When absent, the labels are
    /// discovered from the polls.
    pub keys: Option<Vec<String>>,
    /// Labels removed from discovery. Defaults to Undecided and Other.
    pub exclude: Option<Vec<String>>,
    #[serde(rename = "sortAlphabetically")]
    pub sort_alphabetically: Option<bool>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(rename = "goldMultiplier")]
    pub gold_multiplier: Option<f64>,
    #[serde(rename = "recencyScaleDays")]
    pub recency_scale_days: Option<f64>,
    #[serde(rename = "maxAgeDays")]
    pub max_age_days: Option<i64>,
    #[serde(rename = "likelyVoterWeight")]
    pub likely_voter_weight: Option<f64>,
    #[serde(rename = "registeredVoterWeight")]
    pub registered_voter_weight: Option<f64>,
    #[serde(rename = "adultWeight")]
    pub adult_weight: Option<f64>,
    #[serde(rename = "goldStandardPollsters")]
    pub gold_standard_pollsters: Option<Vec<String>>,
    #[serde(rename = "extendRangeTo")]
    pub extend_range_to: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(rename = "displaySettings")]
    pub display_settings: DisplaySettings,
    #[serde(rename = "pollFileSources")]
    pub poll_file_sources: Vec<FileSource>,
    pub candidates: Option<CandidateSettings>,
    pub weighting: Option<PolicySettings>,
}

/// One poll release as carried by the input files. Label order is not
/// preserved; callers sort the discovered keys for display anyway.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollRecord {
    pub pollster: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    #[serde(rename = "sampleSize")]
    pub sample_size: u64,
    #[serde(rename = "sampleType")]
    pub sample_type: String,
    pub results: std::collections::BTreeMap<String, f64>,
}

impl PollRecord {
    pub fn to_poll(&self) -> Result<Poll, PollError> {
        let results: Vec<(String, f64)> = self
            .results
            .iter()
            .map(|(label, value)| (label.clone(), *value))
            .collect();
        Poll::new(
            &self.pollster,
            &self.end_date,
            self.sample_size,
            &self.sample_type,
            &results,
        )
    }
}

pub fn read_summary(path: String) -> AggResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
