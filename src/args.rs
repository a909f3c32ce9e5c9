use clap::Parser;

/// This is a program to reshape repeated-measure spreadsheets: rows are grouped by a key column
/// and the repeated columns are pivoted into one wide row per key.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the input, the schema and the outputs.
    /// Relative paths in this file are resolved from its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The spreadsheet to reshape (.xlsx or .csv). Setting this option overrides
    /// the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (xlsx or csv, default: from the file extension) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (ratings or phq, default ratings) The predefined layout of the input.
    #[clap(long, value_parser)]
    pub preset: Option<String>,

    /// (column name) The column used to group the rows. Overrides the key of the preset.
    #[clap(long, value_parser)]
    pub key: Option<String>,

    /// (column names, repeatable) The columns repeated for every row of a group, in output order.
    /// Overrides the columns of the preset.
    #[clap(long, value_parser)]
    pub fields: Option<Vec<String>>,

    /// (column names, repeatable) The repeated columns holding dates, rewritten as yyyy-mm-dd.
    #[clap(long, value_parser)]
    pub date_fields: Option<Vec<String>>,

    /// (reject or empty, default reject) What to do with rows that have no key.
    #[clap(long, value_parser)]
    pub missing_key: Option<String>,

    /// (file path, default ProcessedData.xlsx) Where to write the reshaped workbook.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (default ProcessedData) The name of the worksheet in the reshaped workbook.
    #[clap(long, value_parser)]
    pub sheet_name: Option<String>,

    /// (file path or 'stdout') If specified, the reshaped table will be written in JSON format
    /// to the given location.
    #[clap(long, value_parser)]
    pub json: Option<String>,

    /// (file path) A reference file containing a reshaped table in JSON format. If provided, repivot will
    /// check that its output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, prints the groups and the reshaped table.
    #[clap(long, takes_value = false)]
    pub preview: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
