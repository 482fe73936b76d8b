// Primitives for reading Excel workbooks.

use log::debug;
use snafu::prelude::*;

use calamine::{open_workbook, Reader, Xlsx};

use crate::agg::{
    config_reader::{FileSource, PollRecord},
    io_common::{locate_columns, row_to_record, simplify_file_name},
    AggResult, EmptyExcelSnafu, OpeningExcelSnafu,
};

pub fn read_excel_polls(path: String, cfs: &FileSource) -> AggResult<Vec<PollRecord>> {
    let source_label = simplify_file_name(path.as_str());
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook.worksheet_range(name.as_str()),
        None => workbook.worksheet_range_at(0),
    }
    .context(EmptyExcelSnafu { path: path.clone() })?
    .context(OpeningExcelSnafu { path })?;

    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(read_cell).collect::<AggResult<Vec<String>>>()?,
        None => whatever!("worksheet in {} is empty", source_label),
    };
    let columns = locate_columns(&header)?;

    let mut res: Vec<PollRecord> = Vec::new();
    for (idx, row) in rows.enumerate() {
        // The header is row 1.
        let lineno = idx + 2;
        debug!("read_excel_polls: {:?} {:?}", lineno, row);
        let cells: Vec<String> = row.iter().map(read_cell).collect::<AggResult<Vec<String>>>()?;
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        if let Some(record) = row_to_record(&columns, &cells, &source_label, lineno) {
            res.push(record);
        }
    }
    Ok(res)
}

// Cells are carried as text; whole numbers print without a trailing `.0` so
// they parse the same as their CSV counterparts.
fn read_cell(cell: &calamine::DataType) -> AggResult<String> {
    match cell {
        calamine::DataType::String(s) => Ok(s.clone()),
        calamine::DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        calamine::DataType::Float(f) => Ok(format!("{}", f)),
        calamine::DataType::Int(i) => Ok(format!("{}", i)),
        calamine::DataType::Empty => Ok("".to_string()),
        _ => whatever!("read_cell: could not understand cell {:?}", cell),
    }
}
