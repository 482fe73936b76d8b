use log::warn;
use snafu::prelude::*;

use crate::agg::{config_reader::PollRecord, AggResult};

use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The column layout of a tabular poll file: the four fixed columns plus one
/// column per option label.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PollColumns {
    pub pollster: usize,
    pub end_date: usize,
    pub sample_size: usize,
    pub sample_type: usize,
    pub options: Vec<(usize, String)>,
}

pub fn locate_columns(header: &[String]) -> AggResult<PollColumns> {
    let mut pollster: Option<usize> = None;
    let mut end_date: Option<usize> = None;
    let mut sample_size: Option<usize> = None;
    let mut sample_type: Option<usize> = None;
    let mut options: Vec<(usize, String)> = Vec::new();
    for (idx, cell) in header.iter().enumerate() {
        match cell.trim() {
            "pollster" => pollster = Some(idx),
            "endDate" => end_date = Some(idx),
            "sampleSize" => sample_size = Some(idx),
            "sampleType" => sample_type = Some(idx),
            "" => {}
            label => options.push((idx, label.to_string())),
        }
    }
    match (pollster, end_date, sample_size, sample_type) {
        (Some(pollster), Some(end_date), Some(sample_size), Some(sample_type)) => Ok(PollColumns {
            pollster,
            end_date,
            sample_size,
            sample_type,
            options,
        }),
        _ => whatever!(
            "header {:?} is missing one of the required columns pollster, endDate, sampleSize, sampleType",
            header
        ),
    }
}

/// Assembles one poll record from a data row. Returns `None` (after a
/// warning) when the row cannot be understood; only that poll is dropped.
pub fn row_to_record(
    columns: &PollColumns,
    cells: &[String],
    source: &str,
    lineno: usize,
) -> Option<PollRecord> {
    let get = |idx: usize| -> String {
        cells.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    let sample_size_text = get(columns.sample_size);
    let sample_size: u64 = if sample_size_text.is_empty() {
        // An unreported sample size excludes the poll from weighting but
        // keeps it for display.
        0
    } else {
        match sample_size_text.parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                warn!(
                    "{} line {}: sample size {:?} is not a whole number, dropping poll",
                    source, lineno, sample_size_text
                );
                return None;
            }
        }
    };

    let mut results = std::collections::BTreeMap::new();
    for (idx, label) in columns.options.iter() {
        let cell = get(*idx);
        if cell.is_empty() {
            continue;
        }
        match cell.parse::<f64>() {
            Ok(value) => {
                results.insert(label.clone(), value);
            }
            Err(_) => {
                warn!(
                    "{} line {}: value {:?} for {:?} is not a number, dropping poll",
                    source, lineno, cell, label
                );
                return None;
            }
        }
    }

    Some(PollRecord {
        pollster: get(columns.pollster),
        end_date: get(columns.end_date),
        sample_size,
        sample_type: get(columns.sample_type),
        results,
    })
}
