/*!

# Quick start with a REDCap export

This example reshapes the PHQ scores of a REDCap project into one row per
participant.

**Exporting the data** In REDCap, create a report with the fields
`record_id`, `redcap_event_name`, `phq_timestamp` and `phq_score`, and export
it in the Excel format. The export has one row per participant and event:

```text
record_id  redcap_event_name  phq_timestamp  phq_score
1          baseline_arm_1     1/3/2022       12
1          week_4_arm_1       2/1/2022       9
2          baseline_arm_1     1/5/2022       7
```

**Reshaping** Run `repivot` with the `phq` preset:

```bash
repivot -i phq_export.xlsx --preset phq --preview
```

The program writes `ProcessedData.xlsx` (a single worksheet named
`ProcessedData`) and, with `--preview`, prints the result:

```text
record_id 1: redcap_event_name: baseline_arm_1, phq_timestamp: 2022-01-03, phq_score: 12, redcap_event_name: week_4_arm_1, phq_timestamp: 2022-02-01, phq_score: 9
record_id 2: redcap_event_name: baseline_arm_1, phq_timestamp: 2022-01-05, phq_score: 7
```

The timestamps are rewritten as `yyyy-mm-dd`, whether Excel stored them as
dates or as text.

**Other layouts** For a sheet with different column names, give the key and
the repeated columns explicitly:

```bash
repivot -i ratings.xlsx --key Participant --fields Time --fields Rating -o wide.xlsx
```

The order of the `--fields` flags is the order of the columns in the output.

**Checking a result** The `--json` flag writes the reshaped table in JSON. A
previous JSON output can be given with `--reference`: the program then
prints the differences and fails if the new result does not match.

```bash
repivot -i phq_export.xlsx --preset phq --json stdout --reference expected.json
```

See the [manual](../manual/index.html) for all the options.

*/
