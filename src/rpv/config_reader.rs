use crate::args::Args;
use crate::rpv::*;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_FILE_NAME: &str = "ProcessedData.xlsx";
pub const DEFAULT_SHEET_NAME: &str = "ProcessedData";
pub const DEFAULT_PRESET: &str = "ratings";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSettings {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub provider: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSettings {
    pub preset: Option<String>,
    #[serde(rename = "keyField")]
    pub key_field: Option<String>,
    #[serde(rename = "measurementFields")]
    pub measurement_fields: Option<Vec<String>>,
    #[serde(rename = "dateFields")]
    pub date_fields: Option<Vec<String>>,
    #[serde(rename = "missingKey")]
    pub missing_key: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(rename = "sheetName")]
    pub sheet_name: Option<String>,
    #[serde(rename = "jsonPath")]
    pub json_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpvConfig {
    #[serde(rename = "inputSettings", default)]
    pub input_settings: InputSettings,
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Xlsx,
    Csv,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct InputSource {
    pub path: String,
    pub provider: Provider,
    pub worksheet: Option<String>,
}

/// Everything needed to run the program once, after merging the command
/// line with the configuration file.
#[derive(PartialEq, Debug, Clone)]
pub struct Job {
    pub input: InputSource,
    pub schema: Schema,
    /// Time zone used to convert date serials.
    pub offset: FixedOffset,
    pub output_path: String,
    pub sheet_name: String,
    pub json_path: Option<String>,
    pub reference_path: Option<String>,
    pub preview: bool,
}

pub fn read_config(path: &str) -> RpvResult<RpvConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RpvConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> RpvResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn parse_provider(s: &str) -> RpvResult<Provider> {
    match s.to_lowercase().as_str() {
        "xlsx" | "excel" => Ok(Provider::Xlsx),
        "csv" => Ok(Provider::Csv),
        x => whatever!("Input type not implemented: {:?}", x),
    }
}

fn provider_from_path(path: &str) -> Provider {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Provider::Csv,
        _ => Provider::Xlsx,
    }
}

fn parse_missing_key(s: &str) -> RpvResult<MissingKeyPolicy> {
    match s {
        "reject" => Ok(MissingKeyPolicy::Reject),
        "empty" => Ok(MissingKeyPolicy::EmptyKey),
        x => whatever!(
            "Failed to understand the missing key option {:?}: expected 'reject' or 'empty'",
            x
        ),
    }
}

/// Paths from the configuration file are relative to its directory.
fn resolve_path(root: &Path, p: &str) -> String {
    if p == STDOUT {
        return p.to_string();
    }
    root.join(p).display().to_string()
}

fn resolve_schema(args: &Args, settings: Option<&SchemaSettings>) -> RpvResult<Schema> {
    let preset_name = args
        .preset
        .clone()
        .or_else(|| settings.and_then(|s| s.preset.clone()))
        .unwrap_or_else(|| DEFAULT_PRESET.to_string());
    let mut schema = match Schema::preset(&preset_name) {
        Some(s) => s,
        None => whatever!(
            "Unknown preset {:?}: expected 'ratings' or 'phq'",
            preset_name
        ),
    };

    if let Some(key) = args
        .key
        .clone()
        .or_else(|| settings.and_then(|s| s.key_field.clone()))
    {
        schema.key_field = key;
    }
    if let Some(fields) = args
        .fields
        .clone()
        .or_else(|| settings.and_then(|s| s.measurement_fields.clone()))
    {
        schema.measurement_fields = fields;
        // The preset's date fields only apply if they are still measured.
        let kept: Vec<String> = schema
            .date_fields
            .iter()
            .filter(|f| schema.measurement_fields.contains(f))
            .cloned()
            .collect();
        schema.date_fields = kept;
    }
    if let Some(date_fields) = args
        .date_fields
        .clone()
        .or_else(|| settings.and_then(|s| s.date_fields.clone()))
    {
        schema.date_fields = date_fields;
    }
    if let Some(policy) = args
        .missing_key
        .clone()
        .or_else(|| settings.and_then(|s| s.missing_key.clone()))
    {
        schema.missing_key = parse_missing_key(&policy)?;
    }

    if schema.key_field.is_empty() {
        whatever!("The key field cannot be empty");
    }
    if schema.measurement_fields.contains(&schema.key_field) {
        whatever!(
            "The key field {:?} cannot also be a measurement field",
            schema.key_field
        );
    }
    if let Some((a, b)) = find_name_clash(&schema) {
        whatever!(
            "The columns generated for {:?} and {:?} can have the same name",
            a,
            b
        );
    }
    let (kept, dropped): (Vec<String>, Vec<String>) = schema
        .date_fields
        .iter()
        .cloned()
        .partition(|f| schema.measurement_fields.contains(f));
    for f in dropped.iter() {
        warn!(
            "resolve_schema: date field {:?} is not a measurement field and is ignored",
            f
        );
    }
    schema.date_fields = kept;
    Ok(schema)
}

/// True if `name` is `prefix` followed by a positive position, as in `Time12`.
fn is_generated_from(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(pos) => {
            !pos.is_empty() && !pos.starts_with('0') && pos.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Finds two names of the schema whose output columns can collide: the key
/// and a generated `field{pos}`, or two generated columns such as `Score11`
/// from `Score` and `Score1`. A field listed twice also collides.
fn find_name_clash(schema: &Schema) -> Option<(String, String)> {
    let fields = &schema.measurement_fields;
    for (i, f) in fields.iter().enumerate() {
        if is_generated_from(&schema.key_field, f) {
            return Some((schema.key_field.clone(), f.clone()));
        }
        for g in fields.iter().skip(i + 1) {
            // `f` followed by a position can only equal `g` followed by a
            // position when one is the other plus a leading position digit.
            if f == g || is_generated_from(g, f) || is_generated_from(f, g) {
                return Some((f.clone(), g.clone()));
            }
        }
    }
    None
}

/// Merges the command line arguments with the configuration file, if any.
/// The command line takes precedence.
pub fn resolve_job(
    args: &Args,
    config: Option<(&RpvConfig, &Path)>,
    offset: FixedOffset,
) -> RpvResult<Job> {
    let input_settings = config.map(|(c, _)| &c.input_settings);
    let output_settings = config.map(|(c, _)| &c.output_settings);
    let root = config.map(|(_, r)| r);

    let path = match (&args.input, input_settings.and_then(|s| s.file_path.clone()), root) {
        (Some(p), _, _) => p.clone(),
        (None, Some(p), Some(r)) => resolve_path(r, &p),
        _ => whatever!("No input file: use --input or inputSettings.filePath"),
    };
    let provider = match args
        .input_type
        .clone()
        .or_else(|| input_settings.and_then(|s| s.provider.clone()))
    {
        Some(p) => parse_provider(&p)?,
        None => provider_from_path(&path),
    };
    let worksheet = args
        .excel_worksheet_name
        .clone()
        .or_else(|| input_settings.and_then(|s| s.excel_worksheet_name.clone()));

    let schema = resolve_schema(args, config.map(|(c, _)| &c.schema))?;

    let output_path = match (&args.out, output_settings, root) {
        (Some(p), _, _) => p.clone(),
        (None, Some(o), Some(r)) => {
            let file_name = o
                .file_name
                .clone()
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
            match &o.output_directory {
                Some(d) => resolve_path(&r.join(d), &file_name),
                None => resolve_path(r, &file_name),
            }
        }
        _ => DEFAULT_FILE_NAME.to_string(),
    };
    let sheet_name = args
        .sheet_name
        .clone()
        .or_else(|| output_settings.and_then(|o| o.sheet_name.clone()))
        .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
    let json_path = match (&args.json, output_settings.and_then(|o| o.json_path.clone()), root) {
        (Some(p), _, _) => Some(p.clone()),
        (None, Some(p), Some(r)) => Some(resolve_path(r, &p)),
        _ => None,
    };

    Ok(Job {
        input: InputSource {
            path,
            provider,
            worksheet,
        },
        schema,
        offset,
        output_path,
        sheet_name,
        json_path,
        reference_path: args.reference.clone(),
        preview: args.preview,
    })
}
