// Primitives for reading CSV files.

use std::fs::File;

use crate::rpv::{
    io_common::{parse_text_cell, records_from_rows, simplify_file_name},
    *,
};

/// Reads the records of a CSV file. The first line holds the column names.
pub fn read_csv_records(path: &str) -> RpvResult<Vec<Record>> {
    let file_name = simplify_file_name(path);
    let mut records = get_records(path)?;

    let header: Vec<Option<String>> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { lineno: 1_usize })?
            .iter()
            .map(|s| Some(s.to_string()))
            .collect(),
        None => return MissingHeaderSnafu { path }.fail(),
    };
    debug!("read_csv_records: {}: header: {:?}", file_name, header);

    let mut rows: Vec<(usize, Vec<Value>)> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        // Quoted cells may span several lines.
        let start = line
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(lineno);
        rows.push((start, line.iter().map(parse_text_cell).collect()));
    }
    let res = records_from_rows(&file_name, &header, rows);
    debug!("read_csv_records: {}: {:?} records", file_name, res.len());
    Ok(res)
}

fn get_records(path: &str) -> RpvResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    Ok(rdr.into_records())
}
