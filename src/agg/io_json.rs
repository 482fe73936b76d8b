// Primitives for reading JSON poll lists.

use std::fs;

use snafu::prelude::*;

use crate::agg::{config_reader::PollRecord, AggResult, OpeningJsonSnafu, ParsingJsonSnafu};

pub fn read_json_polls(path: String) -> AggResult<Vec<PollRecord>> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let records: Vec<PollRecord> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(records)
}
