use log::{debug, info, warn};

use poll_aggregation::pollster::GoldStandardRegistry;
use poll_aggregation::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::agg::config_reader::*;
use crate::agg::io_common::simplify_file_name;
use crate::args::Args;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum AggError {
    #[snafu(display("Error opening workbook {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Workbook {path} has no usable worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("JSON parse error"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file"))]
    CsvOpen { source: csv::Error },
    #[snafu(display("CSV parse error"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Aggregation { source: PollError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AggResult<T> = Result<T, AggError>;

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Converts parsed poll records into validated polls.
///
/// A record that fails validation (malformed date, unknown sample type, value
/// out of range) is dropped with a warning naming the source and the record;
/// the rest of the poll set is unaffected.
pub fn validate_polls(records: &[PollRecord], source_label: &str) -> Vec<Poll> {
    let mut res: Vec<Poll> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        match record.to_poll() {
            Ok(p) => res.push(p),
            Err(e) => warn!("{}: dropping poll #{}: {}", source_label, idx + 1, e),
        }
    }
    res
}

fn read_poll_data(root_path: String, cfs: &FileSource) -> AggResult<Vec<Poll>> {
    let p: PathBuf = [root_path, cfs.file_path.clone()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read poll file {:?}", p2);
    let records = match cfs.provider.as_str() {
        "json" => io_json::read_json_polls(p2.clone()),
        "csv" => io_csv::read_csv_polls(p2.clone()),
        "xlsx" => io_xlsx::read_excel_polls(p2.clone(), cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }?;
    debug!("read_poll_data: {} records from {}", records.len(), p2);
    Ok(validate_polls(&records, &simplify_file_name(p2.as_str())))
}

fn validate_policy(settings: &Option<PolicySettings>) -> AggResult<WeightingPolicy> {
    let defaults = WeightingPolicy::DEFAULT_POLICY;
    let s = match settings {
        Some(s) => s.clone(),
        None => return Ok(defaults),
    };
    let res = WeightingPolicy {
        gold_multiplier: match s.gold_multiplier {
            None => defaults.gold_multiplier,
            Some(m) if m.is_finite() && m >= 1.0 => m,
            Some(m) => {
                whatever!("goldMultiplier must be a finite number >= 1, got {}", m)
            }
        },
        recency_scale_days: match s.recency_scale_days {
            None => defaults.recency_scale_days,
            Some(d) if d.is_finite() && d > 0.0 => d,
            Some(d) => {
                whatever!("recencyScaleDays must be a positive number of days, got {}", d)
            }
        },
        max_age_days: match s.max_age_days {
            None => defaults.max_age_days,
            Some(d) if d >= 0 => d,
            Some(d) => {
                whatever!("maxAgeDays may not be negative, got {}", d)
            }
        },
        likely_voter_weight: validate_type_weight("likelyVoterWeight", s.likely_voter_weight, defaults.likely_voter_weight)?,
        registered_voter_weight: validate_type_weight(
            "registeredVoterWeight",
            s.registered_voter_weight,
            defaults.registered_voter_weight,
        )?,
        adult_weight: validate_type_weight("adultWeight", s.adult_weight, defaults.adult_weight)?,
    };
    if !(res.likely_voter_weight >= res.registered_voter_weight
        && res.registered_voter_weight >= res.adult_weight)
    {
        whatever!(
            "sample-type weights must satisfy LV >= RV >= A, got {} / {} / {}",
            res.likely_voter_weight,
            res.registered_voter_weight,
            res.adult_weight
        )
    }
    Ok(res)
}

fn validate_type_weight(name: &str, value: Option<f64>, default: f64) -> AggResult<f64> {
    match value {
        None => Ok(default),
        Some(w) if w.is_finite() && w > 0.0 => Ok(w),
        Some(w) => whatever!("{} must be a positive number, got {}", name, w),
    }
}

fn build_registry(settings: &Option<PolicySettings>) -> GoldStandardRegistry {
    match settings
        .as_ref()
        .and_then(|s| s.gold_standard_pollsters.clone())
    {
        Some(names) => GoldStandardRegistry::new(&names),
        None => GoldStandardRegistry::curated(),
    }
}

/// The candidate keys to project: either the explicit list from the
/// configuration, or the labels discovered in the polls minus the excluded
/// ones (by default "Undecided" and "Other"), sorted for display.
fn resolve_keys(polls: &[Poll], settings: &Option<CandidateSettings>) -> Vec<String> {
    if let Some(keys) = settings.as_ref().and_then(|s| s.keys.clone()) {
        return keys;
    }
    let excluded: Vec<String> = match settings.as_ref().and_then(|s| s.exclude.clone()) {
        Some(labels) => labels,
        None => vec!["Undecided".to_string(), "Other".to_string()],
    };
    let mut keys: Vec<String> = candidate_keys(polls)
        .into_iter()
        .filter(|k| !excluded.contains(k))
        .collect();
    let sort = settings
        .as_ref()
        .and_then(|s| s.sort_alphabetically)
        .unwrap_or(true);
    if sort {
        keys.sort();
    }
    keys
}

fn resolve_range(
    polls: &[Poll],
    settings: &Option<PolicySettings>,
) -> AggResult<(NaiveDate, NaiveDate)> {
    let range_end = match settings.as_ref().and_then(|s| s.extend_range_to.clone()) {
        Some(text) => match NaiveDate::parse_from_str(text.as_str(), "%Y-%m-%d") {
            Ok(date) => RangeEnd::Through(date),
            Err(_) => {
                whatever!("extendRangeTo {:?} is not a calendar date (expected YYYY-MM-DD)", text)
            }
        },
        None => RangeEnd::LastPollDate,
    };
    date_range_with(polls, range_end).context(AggregationSnafu {})
}

fn daily_series_to_json(keys: &[String], rows: &[DailyRow]) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for row in rows.iter() {
        let mut m: JSMap<String, JSValue> = JSMap::new();
        m.insert(
            "date".to_string(),
            json!(row.date.format("%Y-%m-%d").to_string()),
        );
        for (key, value) in keys.iter().zip(row.values.iter()) {
            // "no data" days must stay distinguishable from a true zero.
            let v = match value {
                Some(x) => json!(x),
                None => json!("no data"),
            };
            m.insert(key.clone(), v);
        }
        l.push(JSValue::Object(m));
    }
    l
}

fn audit_to_json(
    raw_polls: &[Poll],
    registry: &GoldStandardRegistry,
    policy: &WeightingPolicy,
    keys: &[String],
) -> Vec<JSValue> {
    let mut sorted: Vec<&Poll> = raw_polls.iter().collect();
    sorted.sort_by(|a, b| b.end_date.cmp(&a.end_date).then(a.pollster.cmp(&b.pollster)));

    let mut l: Vec<JSValue> = Vec::new();
    for p in sorted {
        let gold = registry.is_gold_standard(&p.pollster);
        let eff = registry.effective_sample_size(&p.pollster, p.sample_size, policy.gold_multiplier);
        let weight_label = if p.sample_size == 0 {
            "—".to_string()
        } else if gold {
            format!("×{:.2}", policy.gold_multiplier)
        } else {
            "×1.00".to_string()
        };
        let margin: JSValue = match (
            keys.first().and_then(|k| p.result(k)),
            keys.get(1).and_then(|k| p.result(k)),
        ) {
            (Some(a), Some(b)) => json!(round1(a - b)),
            _ => JSValue::Null,
        };
        l.push(json!({
            "pollster": p.pollster,
            "endDate": p.end_date.format("%Y-%m-%d").to_string(),
            "sampleSize": p.sample_size,
            "sampleType": p.sample_type.code(),
            "effectiveSampleSize": eff,
            "goldStandard": gold,
            "weight": weight_label,
            "margin": margin,
        }));
    }
    l
}

fn build_summary_js(
    config: &DashboardConfig,
    policy: &WeightingPolicy,
    keys: &[String],
    rows: &[DailyRow],
    audit: Vec<JSValue>,
) -> JSValue {
    let c = SummaryConfig {
        dashboard: config.display_settings.dashboard_name.clone(),
        date: config.display_settings.race_date.clone(),
        jurisdiction: config.display_settings.jurisdiction.clone(),
        office: config.display_settings.office.clone(),
        gold_multiplier: Some(format!("{}", policy.gold_multiplier)),
    };
    json!({
        "config": c,
        "candidates": keys,
        "series": daily_series_to_json(keys, rows),
        "polls": audit })
}

pub fn run(args: &Args) -> AggResult<()> {
    match (&args.config, &args.input) {
        (Some(config_path), _) => run_dashboard(config_path.clone(), args),
        (None, Some(input)) => run_standalone(input.clone(), args),
        (None, None) => {
            whatever!("either --config <FILE> or --input <FILE> must be provided")
        }
    }
}

fn run_dashboard(config_path: String, args: &Args) -> AggResult<()> {
    let config_p = Path::new(config_path.as_str());
    let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {
        path: config_path.clone(),
    })?;
    let config: DashboardConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    if config.poll_file_sources.is_empty() {
        whatever!("no poll file sources detected")
    }

    let root_p = match config_p.parent() {
        Some(p) => p.as_os_str().to_str().unwrap_or("").to_string(),
        None => "".to_string(),
    };
    run_tabulation(&config, root_p, args)
}

fn run_standalone(input: String, args: &Args) -> AggResult<()> {
    let provider = args.input_type.clone().unwrap_or_else(|| "json".to_string());
    let config = DashboardConfig {
        display_settings: DisplaySettings {
            dashboard_name: simplify_file_name(input.as_str()),
            race_date: None,
            jurisdiction: None,
            office: None,
        },
        poll_file_sources: vec![FileSource {
            provider,
            file_path: input,
            excel_worksheet_name: args.excel_worksheet_name.clone(),
        }],
        candidates: None,
        weighting: None,
    };
    run_tabulation(&config, "".to_string(), args)
}

fn run_tabulation(config: &DashboardConfig, root_path: String, args: &Args) -> AggResult<()> {
    let mut raw_polls: Vec<Poll> = Vec::new();
    for cfs in config.poll_file_sources.iter() {
        let mut file_data = read_poll_data(root_path.clone(), cfs)?;
        raw_polls.append(&mut file_data);
    }
    info!("{} polls accepted", raw_polls.len());

    let policy = validate_policy(&config.weighting)?;
    let registry = build_registry(&config.weighting);

    // Classification happens here, on the input data; the series builder
    // only ever sees adjusted polls.
    let adjusted: Vec<Poll> = raw_polls
        .iter()
        .map(|p| registry.adjust_poll(p, policy.gold_multiplier))
        .collect();

    let keys = resolve_keys(&raw_polls, &config.candidates);
    let (start, end) = resolve_range(&raw_polls, &config.weighting)?;
    info!("candidates: {:?}, range: {} -> {}", keys, start, end);
    debug!("pollset fingerprint: {}", pollset_fingerprint(&adjusted));

    let rows = run_daily_series(&adjusted, &keys, start, end, &policy)
        .context(AggregationSnafu {})?;

    let audit = audit_to_json(&raw_polls, &registry, &policy, &keys);
    let result_js = build_summary_js(config, &policy, &keys, &rows, audit);
    let pretty_js_stats =
        serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match &args.out {
        Some(path) if path != "stdout" => {
            fs::write(path, &pretty_js_stats).context(WritingSummarySnafu { path: path.clone() })?
        }
        _ => println!("{}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p.clone())?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}
