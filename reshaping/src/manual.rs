/*!

This is the long-form manual for `reshaping` and `repivot`.

## What the reshaping does

The input is a sheet with one row per measurement: a key column identifies
the participant (or record), and a few columns repeat for every occurrence.

```text
Participant,Time,Rating
A,1,5
B,2,3
A,4,9
```

The output has one row per key. The repeated columns are numbered by
position within the group, in the order the rows appeared in the input:

```text
Participant,Time1,Rating1,Time2,Rating2
A,1,5,4,9
B,2,3,,
```

Keys come out in the order they were first seen (not sorted). The table is as
wide as the largest group; shorter groups leave the trailing cells blank.

## Input formats

The following formats are supported:
* `xlsx` Excel workbooks. The first worksheet is read unless a name is given.
* `csv` Comma Separated Values.

In both cases the first row holds the column names. Columns that are not part
of the schema are ignored.

### `xlsx`

Number cells, including cells formatted as dates, are read as numbers. A date
cell therefore reaches the reshaping as a spreadsheet serial (a count of
days since 1899-12-30).

### `csv`

Cells that parse as numbers are read as numbers, empty cells are blank, and
all the other cells are text.

## Schemas

A schema names the key column and the repeated columns. Two presets are
provided:

| preset    | key           | repeated columns                                      | date columns    |
|-----------|---------------|-------------------------------------------------------|-----------------|
| `ratings` | `Participant` | `Time`, `Rating`                                      |                 |
| `phq`     | `record_id`   | `redcap_event_name`, `phq_timestamp`, `phq_score`     | `phq_timestamp` |

Any other layout can be described with `--key` and `--fields` on the command
line, or in the configuration file.

### Date columns

The cells of a date column are rewritten as `yyyy-mm-dd` before pivoting:
- a number is read as a spreadsheet serial;
- a string such as `3/4/2022` (month/day/year) becomes `2022-03-04`;
- anything else is kept unchanged.

### Rows without a key

By default a row with an empty key cell stops the processing with an error
that names the row. With `--missing-key empty`, such rows are grouped
together under an empty key instead.

## Configuration

The program accepts a configuration file in JSON. All the entries are
optional; the command line flags take precedence.

```text
{
  "inputSettings": {
    "filePath": "phq_export.xlsx",
    "provider": "xlsx",
    "excelWorksheetName": "Sheet1"
  },
  "schema": {
    "preset": "phq",
    "missingKey": "reject"
  },
  "outputSettings": {
    "outputDirectory": "out",
    "fileName": "ProcessedData.xlsx",
    "sheetName": "ProcessedData",
    "jsonPath": "preview.json"
  }
}
```

Relative paths are resolved from the directory of the configuration file.

Entries of `schema`:
 - `preset` (string): `ratings` or `phq`.
 - `keyField` (string): overrides the key of the preset.
 - `measurementFields` (array of strings): overrides the repeated columns.
 - `dateFields` (array of strings): overrides the date columns.
 - `missingKey` (string): `reject` or `empty`.

 */
