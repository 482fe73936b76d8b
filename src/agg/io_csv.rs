// Primitives for reading CSV files.

use std::fs::File;

use log::debug;
use snafu::prelude::*;

use crate::agg::{
    config_reader::PollRecord,
    io_common::{locate_columns, row_to_record, simplify_file_name},
    AggResult, CsvLineParseSnafu, CsvOpenSnafu,
};

pub fn read_csv_polls(path: String) -> AggResult<Vec<PollRecord>> {
    let source_label = simplify_file_name(path.as_str());
    let mut records = get_records(&path)?;

    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu {})?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => whatever!("CSV file {} is empty", path),
    };
    let columns = locate_columns(&header)?;

    let mut res: Vec<PollRecord> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_polls: {:?} {:?}", lineno, line);
        let cells: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        if let Some(record) = row_to_record(&columns, &cells, &source_label, lineno) {
            res.push(record);
        }
    }
    Ok(res)
}

fn get_records(path: &String) -> AggResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    Ok(rdr.into_records())
}
