use log::{debug, info, warn};

use reshaping::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::rpv::config_reader::*;
use crate::rpv::io_csv::read_csv_records;
use crate::rpv::io_export::write_xlsx;
use crate::rpv::io_xlsx::read_xlsx_records;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_export;
pub mod io_xlsx;
pub mod preview;

/// Name of the stream accepted in place of a file path for the JSON output.
pub const STDOUT: &str = "stdout";

#[derive(Debug, Snafu)]
pub enum RpvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The workbook {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("The first row of {path} should hold the column names, but the sheet is empty"))]
    MissingHeader { path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing file {path}"))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error creating directory {path}"))]
    CreatingDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not reshape the records"))]
    Reshaping { source: ReshapeErrors },
    #[snafu(display("Difference detected between the reshaped table and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RpvResult<T> = Result<T, RpvError>;

fn read_records(input: &InputSource) -> RpvResult<Vec<Record>> {
    info!(
        "Attempting to read {:?} file {:?}",
        input.provider, input.path
    );
    let records = match input.provider {
        Provider::Xlsx => read_xlsx_records(&input.path, input.worksheet.as_deref()),
        Provider::Csv => read_csv_records(&input.path),
    }?;
    info!("Read {:?} records from {:?}", records.len(), input.path);
    Ok(records)
}

fn build_summary_js(job: &Job, res: &Reshaped) -> JSValue {
    json!({
        "config": {
            "keyField": job.schema.key_field,
            "measurementFields": job.schema.measurement_fields,
            "dateFields": job.schema.date_fields,
        },
        "table": preview::rows_to_json(res),
    })
}

fn write_text(path: &str, contents: &str) -> RpvResult<()> {
    if path == STDOUT {
        println!("{}", contents);
        return Ok(());
    }
    fs::write(path, contents).context(WritingJsonSnafu { path })
}

fn ensure_parent_dir(path: &str) -> RpvResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("ensure_parent_dir: creating {:?}", parent);
            fs::create_dir_all(parent).context(CreatingDirSnafu {
                path: parent.display().to_string(),
            })?;
        }
    }
    Ok(())
}

/// Compares the summary with a reference file. Differences are printed as a text diff.
fn check_reference(summary: &JSValue, reference_path: &str) -> RpvResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("check_reference: reference: {:?}", summary_ref);
    let pretty_ref = serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    let pretty = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if pretty_ref != pretty {
        warn!("Found differences with the reference {:?}", reference_path);
        print_diff(pretty_ref.as_str(), pretty.as_str(), "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The reshaped table matches the reference {:?}", reference_path);
    Ok(())
}

/// Runs a fully resolved job: read, reshape, write and optionally preview and check.
pub fn run_job(job: &Job) -> RpvResult<Reshaped> {
    info!("job: {:?}", job);
    let records = read_records(&job.input)?;

    let res = reshape(&records, &job.schema, job.offset).context(ReshapingSnafu {})?;
    info!(
        "Reshaped {:?} records into {:?} rows and {:?} columns",
        records.len(),
        res.rows.len(),
        res.headers.len()
    );

    ensure_parent_dir(&job.output_path)?;
    write_xlsx(&job.output_path, &job.sheet_name, &res)?;
    info!("Wrote {:?}", job.output_path);

    if job.preview {
        for line in preview::summary_lines(&res, &job.schema) {
            println!("{}", line);
        }
        println!("{}", preview::render_table(&res));
    }

    let summary = build_summary_js(job, &res);
    if job.json_path.is_some() || job.reference_path.is_some() {
        let pretty = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
        if let Some(json_path) = &job.json_path {
            if json_path != STDOUT {
                ensure_parent_dir(json_path)?;
            }
            write_text(json_path, &pretty)?;
        }
    }

    if let Some(reference_path) = &job.reference_path {
        check_reference(&summary, reference_path)?;
    }

    Ok(res)
}

pub fn run(args: &Args) -> RpvResult<Reshaped> {
    let config = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            Some((config, root))
        }
        None => None,
    };
    let job = resolve_job(
        args,
        config.as_ref().map(|(c, root)| (c, root.as_path())),
        reshaping::dates::local_offset(),
    )?;
    run_job(&job)
}
