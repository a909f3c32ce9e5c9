use std::collections::HashSet;
use std::path::Path;

use log::{debug, warn};
use reshaping::{Record, Value};

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Cleans up the names of the first row. Blank names and repeated names are
/// dropped (the first occurrence wins), along with their column.
pub fn header_names(header: &[Option<String>]) -> Vec<Option<String>> {
    let mut seen: HashSet<String> = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, name)| match name {
            Some(n) if n.trim().is_empty() => None,
            Some(n) if seen.contains(n.trim()) => {
                warn!(
                    "header_names: column {} repeats the name {:?} and is skipped",
                    idx + 1,
                    n
                );
                None
            }
            Some(n) => {
                let n = n.trim().to_string();
                seen.insert(n.clone());
                Some(n)
            }
            None => None,
        })
        .collect()
}

/// Turns the rows below the header into records. Each row comes with its
/// line in the source file, which the record keeps. Fully blank rows are
/// skipped. Cells beyond the end of a short row are blank.
pub fn records_from_rows<I>(file_name: &str, header: &[Option<String>], rows: I) -> Vec<Record>
where
    I: IntoIterator<Item = (usize, Vec<Value>)>,
{
    let names = header_names(header);
    let mut res: Vec<Record> = Vec::new();
    for (line, row) in rows.into_iter() {
        if row.iter().all(|v| v.is_empty()) {
            debug!("records_from_rows: {}: skipping blank line {}", file_name, line);
            continue;
        }
        let mut record = Record::new().with_line(line);
        for (col, name) in names.iter().enumerate() {
            if let Some(name) = name {
                let v = row.get(col).cloned().unwrap_or(Value::Empty);
                record.insert(name.clone(), v);
            }
        }
        res.push(record);
    }
    res
}

/// Reads a text cell. Numbers are only recognized when they print back to
/// the same text, so identifiers like `007` stay text.
pub fn parse_text_cell(s: &str) -> Value {
    if s.trim().is_empty() {
        return Value::Empty;
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() && n.to_string() == s => Value::Number(n),
        _ => Value::Text(s.to_string()),
    }
}
