// Writing the reshaped table to an Excel workbook.

use std::collections::HashMap;

use rust_xlsxwriter::{Format, Workbook};

use crate::rpv::*;

/// Largest number of columns in an Excel worksheet.
const MAX_COLUMNS: usize = 16_384;

/// Writes the table in a single worksheet: the headers on the first row, then
/// one row per key. Fields a row does not have are left blank.
pub fn write_xlsx(path: &str, sheet_name: &str, res: &Reshaped) -> RpvResult<()> {
    if res.headers.len() > MAX_COLUMNS {
        whatever!(
            "The reshaped table has {} columns, more than the {} an Excel worksheet can hold",
            res.headers.len(),
            MAX_COLUMNS
        );
    }
    let positions: HashMap<&str, u16> = res
        .headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.as_str(), idx as u16))
        .collect();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet_name)
        .context(WritingExcelSnafu { path })?;

    let header_format = Format::new().set_bold();
    for (idx, h) in res.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, idx as u16, h, &header_format)
            .context(WritingExcelSnafu { path })?;
    }

    for (idx, row) in res.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        for (name, v) in row.fields.iter() {
            let col = match positions.get(name.as_str()) {
                Some(col) => *col,
                None => {
                    warn!(
                        "write_xlsx: row {}: field {:?} has no column, skipping",
                        row_num, name
                    );
                    continue;
                }
            };
            match v {
                Value::Empty => {}
                Value::Text(s) => {
                    worksheet
                        .write_string(row_num, col, s)
                        .context(WritingExcelSnafu { path })?;
                }
                Value::Number(n) if n.is_finite() => {
                    worksheet
                        .write_number(row_num, col, *n)
                        .context(WritingExcelSnafu { path })?;
                }
                Value::Number(n) => {
                    worksheet
                        .write_string(row_num, col, n.to_string())
                        .context(WritingExcelSnafu { path })?;
                }
                Value::Bool(b) => {
                    worksheet
                        .write_boolean(row_num, col, *b)
                        .context(WritingExcelSnafu { path })?;
                }
            }
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .context(WritingExcelSnafu { path })?;
    worksheet.autofit();

    debug!(
        "write_xlsx: {:?}: {:?} rows, {:?} columns in sheet {:?}",
        path,
        res.rows.len(),
        res.headers.len(),
        sheet_name
    );
    workbook.save(path).context(WritingExcelSnafu { path })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpv::io_xlsx::read_xlsx_records;
    use tempfile::tempdir;

    fn row(fields: &[(&str, Value)]) -> OutputRow {
        OutputRow {
            fields: fields
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn writes_headers_and_blank_padding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ProcessedData.xlsx").display().to_string();
        let res = Reshaped {
            headers: vec![
                "Participant".to_string(),
                "Time1".to_string(),
                "Rating1".to_string(),
                "Time2".to_string(),
                "Rating2".to_string(),
            ],
            rows: vec![
                row(&[
                    ("Participant", "A".into()),
                    ("Time1", 1.0.into()),
                    ("Rating1", 5.0.into()),
                    ("Time2", 4.0.into()),
                    ("Rating2", 9.0.into()),
                ]),
                row(&[
                    ("Participant", "B".into()),
                    ("Time1", 2.0.into()),
                    ("Rating1", true.into()),
                ]),
            ],
        };
        write_xlsx(&path, "ProcessedData", &res).unwrap();

        let back = read_xlsx_records(&path, Some("ProcessedData")).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].len(), 5);
        assert_eq!(back[0].get("Participant"), Some(&Value::from("A")));
        assert_eq!(back[0].get("Rating2"), Some(&Value::Number(9.0)));
        assert_eq!(back[1].get("Rating1"), Some(&Value::Bool(true)));
        assert_eq!(back[1].get("Time2"), Some(&Value::Empty));
        assert_eq!(back[1].get("Rating2"), Some(&Value::Empty));
    }

    #[test]
    fn empty_table_keeps_the_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xlsx").display().to_string();
        let res = Reshaped {
            headers: vec!["record_id".to_string()],
            rows: vec![],
        };
        write_xlsx(&path, "ProcessedData", &res).unwrap();
        let back = read_xlsx_records(&path, None).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn invalid_sheet_name_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.xlsx").display().to_string();
        let res = Reshaped {
            headers: vec!["id".to_string()],
            rows: vec![],
        };
        let err = write_xlsx(&path, "bad[name]", &res).unwrap_err();
        assert!(matches!(err, RpvError::WritingExcel { .. }));
    }
}
