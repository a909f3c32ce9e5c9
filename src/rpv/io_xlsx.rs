// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::rpv::{
    io_common::{records_from_rows, simplify_file_name},
    *,
};

/// Reads the records of a worksheet. The first row holds the column names.
///
/// Without a worksheet name, the first worksheet of the workbook is used.
pub fn read_xlsx_records(path: &str, worksheet_name: Option<&str>) -> RpvResult<Vec<Record>> {
    let file_name = simplify_file_name(path);
    let wrange = get_range(path, worksheet_name)?;

    let mut iter = wrange.rows();
    let header_row = iter.next().context(MissingHeaderSnafu { path })?;
    let header: Vec<Option<String>> = header_row.iter().map(read_header_cell).collect();
    debug!("read_xlsx_records: {}: header: {:?}", file_name, header);

    // The range starts at the first used cell, not necessarily on line 1.
    let header_line = wrange.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
    let rows = iter.enumerate().map(|(idx, row)| {
        let cells: Vec<Value> = row.iter().map(read_cell).collect();
        (header_line + 1 + idx, cells)
    });
    let res = records_from_rows(&file_name, &header, rows);
    debug!("read_xlsx_records: {}: {:?} records", file_name, res.len());
    Ok(res)
}

fn read_header_cell(cell: &DataType) -> Option<String> {
    match read_cell(cell) {
        Value::Empty => None,
        v => Some(v.to_string()),
    }
}

/// Date cells come out as their serial number.
fn read_cell(cell: &DataType) -> Value {
    match cell {
        DataType::String(s) if s.is_empty() => Value::Empty,
        DataType::String(s) => Value::Text(s.clone()),
        DataType::Float(f) => Value::Number(*f),
        DataType::Int(i) => Value::Number(*i as f64),
        DataType::DateTime(f) => Value::Number(*f),
        DataType::Bool(b) => Value::Bool(*b),
        DataType::Empty => Value::Empty,
        DataType::Error(e) => {
            warn!("read_cell: error cell {:?} is read as text", e);
            Value::Text(format!("{:?}", e))
        }
        #[allow(unreachable_patterns)]
        other => Value::Text(format!("{:?}", other)),
    }
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> RpvResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(name) = worksheet_name {
        let wrange = workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}
