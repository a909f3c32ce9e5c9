mod config;
pub mod dates;
pub mod manual;
pub mod quick_start;

use chrono::FixedOffset;
use log::{debug, info, warn};

use std::collections::HashMap;

pub use crate::config::*;

// **** Private structures ****

/// Position of a group in first-seen order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct GroupId(usize);

/// Insertion-ordered grouping. The map only resolves a key to its slot, the
/// order of the groups is the order of `groups`.
struct GroupIndex<'a> {
    slots: HashMap<String, GroupId>,
    groups: Vec<(String, Vec<&'a Record>)>,
}

impl<'a> GroupIndex<'a> {
    fn new() -> GroupIndex<'a> {
        GroupIndex {
            slots: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn push(&mut self, key: String, record: &'a Record) {
        let gid = match self.slots.get(&key) {
            Some(gid) => *gid,
            None => {
                let gid = GroupId(self.groups.len());
                self.slots.insert(key.clone(), gid);
                self.groups.push((key, Vec::new()));
                gid
            }
        };
        self.groups[gid.0].1.push(record);
    }
}

fn index_records<'a>(
    records: &'a [Record],
    schema: &Schema,
) -> Result<GroupIndex<'a>, ReshapeErrors> {
    let mut index = GroupIndex::new();
    for (idx, record) in records.iter().enumerate() {
        let key = match (record.key(&schema.key_field), schema.missing_key) {
            (Some(k), _) => k,
            (None, MissingKeyPolicy::EmptyKey) => {
                warn!(
                    "index_records: record {} has no {:?}, grouped under the empty key",
                    idx, schema.key_field
                );
                String::new()
            }
            (None, MissingKeyPolicy::Reject) => {
                return Err(ReshapeErrors::MissingKeyField {
                    index: idx,
                    line: record.line(),
                    key_field: schema.key_field.clone(),
                });
            }
        };
        index.push(key, record);
    }
    Ok(index)
}

/// Groups the records by the value of the key field.
///
/// Groups come out in the order their key was first seen, and the members
/// of a group keep their input order.
pub fn group_records(records: &[Record], schema: &Schema) -> Result<Vec<Group>, ReshapeErrors> {
    let index = index_records(records, schema)?;
    Ok(index
        .groups
        .into_iter()
        .map(|(key, members)| Group {
            key,
            members: members.into_iter().cloned().collect(),
        })
        .collect())
}

fn pivot_group(group: &Group, schema: &Schema) -> OutputRow {
    let mut fields: Vec<(String, Value)> =
        Vec::with_capacity(1 + group.members.len() * schema.measurement_count());
    fields.push((schema.key_field.clone(), Value::Text(group.key.clone())));
    for (idx, member) in group.members.iter().enumerate() {
        for f in schema.measurement_fields.iter() {
            let v = member.get(f).cloned().unwrap_or(Value::Empty);
            fields.push((format!("{}{}", f, idx + 1), v));
        }
    }
    OutputRow { fields }
}

/// Groups the records by key and pivots every group into one wide row.
///
/// Each row holds the key (stringified) followed by `field{i}` for every
/// member position `i` (1-based) and every measurement field, so a row has
/// `1 + measurement_count * group_size` fields. Rows are not padded to the
/// widest group: see [derive_headers] for the table-wide layout.
///
/// Arguments:
/// * `records` the decoded rows, in sheet order
/// * `schema` the key field, the measurement fields and the policy for
/// records without a key
pub fn group_and_pivot(
    records: &[Record],
    schema: &Schema,
) -> Result<Vec<OutputRow>, ReshapeErrors> {
    info!(
        "group_and_pivot: Processing {:?} records, key: {:?}, fields: {:?}",
        records.len(),
        schema.key_field,
        schema.measurement_fields
    );
    let groups = group_records(records, schema)?;
    debug!("group_and_pivot: {:?} groups", groups.len());
    let rows: Vec<OutputRow> = groups.iter().map(|g| pivot_group(g, schema)).collect();
    Ok(rows)
}

/// The number of member positions a row holds.
fn group_size(row: &OutputRow, measurement_count: usize) -> usize {
    if measurement_count == 0 {
        0
    } else {
        row.field_count().saturating_sub(1) / measurement_count
    }
}

/// Computes the header list of the whole table.
///
/// The table is as wide as the largest group: `[key, f1_1, .., fm_1, f1_2, ..]`,
/// measurement fields cycling fastest. Without rows (or without measurement
/// fields) only the key remains.
pub fn derive_headers(rows: &[OutputRow], schema: &Schema) -> Vec<String> {
    let m = schema.measurement_count();
    let max_group_size = rows.iter().map(|r| group_size(r, m)).max().unwrap_or(0);
    debug!(
        "derive_headers: max group size: {:?} over {:?} rows",
        max_group_size,
        rows.len()
    );
    let mut headers = Vec::with_capacity(1 + m * max_group_size);
    headers.push(schema.key_field.clone());
    for pos in 1..=max_group_size {
        for f in schema.measurement_fields.iter() {
            headers.push(format!("{}{}", f, pos));
        }
    }
    headers
}

/// Reads the wide rows back into per-member tuples, by header position.
///
/// For every row, returns the key and the measurement values of each member
/// in order. Positions the row does not have are not reported.
pub fn unpivot(rows: &[OutputRow], schema: &Schema) -> Vec<(String, Vec<Vec<Value>>)> {
    let m = schema.measurement_count();
    rows.iter()
        .map(|row| {
            let key = row.key().map(|v| v.to_string()).unwrap_or_default();
            let members: Vec<Vec<Value>> = (1..=group_size(row, m))
                .map(|pos| {
                    schema
                        .measurement_fields
                        .iter()
                        .map(|f| {
                            row.get(&format!("{}{}", f, pos))
                                .cloned()
                                .unwrap_or(Value::Empty)
                        })
                        .collect()
                })
                .collect();
            (key, members)
        })
        .collect()
}

/// Normalizes the date fields of the schema in every record.
///
/// Absent and empty cells are left untouched. The other values are replaced
/// by the text of [dates::normalize_date]. Only measurement fields are
/// rewritten: a date field that is not measured, or that is the key, is
/// ignored.
pub fn prepare_records(records: &[Record], schema: &Schema, offset: FixedOffset) -> Vec<Record> {
    let date_fields: Vec<&String> = schema
        .date_fields
        .iter()
        .filter(|f| **f != schema.key_field && schema.measurement_fields.contains(f))
        .collect();
    if date_fields.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .map(|r| {
            let mut r = r.clone();
            for f in date_fields.iter() {
                if let Some(v) = r.get_mut(f) {
                    if !v.is_empty() {
                        *v = Value::Text(dates::normalize_date(v, offset));
                    }
                }
            }
            r
        })
        .collect()
}

/// Runs the complete reshaping: date normalization, grouping, pivoting and
/// header derivation.
///
/// ```
/// use chrono::FixedOffset;
/// use reshaping::{reshape, Record, Schema, Value};
/// # use reshaping::ReshapeErrors;
///
/// let records = vec![
///     Record::from_pairs([("Participant", Value::from("A")), ("Time", 1.0.into()), ("Rating", 5.0.into())]),
///     Record::from_pairs([("Participant", Value::from("A")), ("Time", 4.0.into()), ("Rating", 9.0.into())]),
/// ];
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let res = reshape(&records, &Schema::ratings(), utc)?;
/// assert_eq!(res.headers, vec!["Participant", "Time1", "Rating1", "Time2", "Rating2"]);
///
/// # Ok::<(), ReshapeErrors>(())
/// ```
pub fn reshape(
    records: &[Record],
    schema: &Schema,
    offset: FixedOffset,
) -> Result<Reshaped, ReshapeErrors> {
    let prepared = prepare_records(records, schema, offset);
    let rows = group_and_pivot(&prepared, schema)?;
    let headers = derive_headers(&rows, schema);
    info!(
        "reshape: {:?} records -> {:?} rows x {:?} columns",
        records.len(),
        rows.len(),
        headers.len()
    );
    Ok(Reshaped { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn rating(p: &str, time: i64, r: i64) -> Record {
        Record::from_pairs([
            ("Participant", Value::from(p)),
            ("Time", Value::from(time)),
            ("Rating", Value::from(r)),
        ])
    }

    fn sample() -> Vec<Record> {
        vec![rating("A", 1, 5), rating("B", 2, 3), rating("A", 4, 9)]
    }

    fn names(row: &OutputRow) -> Vec<&str> {
        row.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn participant_scenario() {
        init();
        let schema = Schema::ratings();
        let rows = group_and_pivot(&sample(), &schema).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(
            names(&rows[0]),
            vec!["Participant", "Time1", "Rating1", "Time2", "Rating2"]
        );
        assert_eq!(rows[0].get("Participant"), Some(&Value::from("A")));
        assert_eq!(rows[0].get("Time1"), Some(&Value::Number(1.0)));
        assert_eq!(rows[0].get("Rating1"), Some(&Value::Number(5.0)));
        assert_eq!(rows[0].get("Time2"), Some(&Value::Number(4.0)));
        assert_eq!(rows[0].get("Rating2"), Some(&Value::Number(9.0)));

        assert_eq!(names(&rows[1]), vec!["Participant", "Time1", "Rating1"]);
        assert_eq!(rows[1].get("Participant"), Some(&Value::from("B")));
        assert_eq!(rows[1].get("Time1"), Some(&Value::Number(2.0)));
        assert_eq!(rows[1].get("Rating1"), Some(&Value::Number(3.0)));
        assert_eq!(rows[1].get("Time2"), None);

        assert_eq!(
            derive_headers(&rows, &schema),
            vec!["Participant", "Time1", "Rating1", "Time2", "Rating2"]
        );
    }

    #[test]
    fn grouping_keeps_member_order() {
        let groups = group_records(&sample(), &Schema::ratings()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "A");
        assert_eq!(groups[0].members, vec![rating("A", 1, 5), rating("A", 4, 9)]);
        assert_eq!(groups[1].key, "B");
        assert_eq!(groups[1].members, vec![rating("B", 2, 3)]);
    }

    #[test]
    fn keys_in_first_seen_order() {
        let records: Vec<Record> = ["z", "a", "m", "a", "z", "b", "m", "m"]
            .iter()
            .enumerate()
            .map(|(i, p)| rating(p, i as i64, 0))
            .collect();
        let rows = group_and_pivot(&records, &Schema::ratings()).unwrap();
        let keys: Vec<String> = rows.iter().map(|r| r.key().unwrap().to_string()).collect();
        assert_eq!(keys, vec!["z", "a", "m", "b"]);
        let distinct: HashSet<&String> = keys.iter().collect();
        assert_eq!(distinct.len(), rows.len());
    }

    #[test]
    fn numeric_keys_are_stringified() {
        // 1 and "1" are the same key once stringified.
        let records = vec![
            Record::from_pairs([("Participant", Value::from(1_i64)), ("Time", 1_i64.into())]),
            Record::from_pairs([("Participant", Value::from("1")), ("Time", 2_i64.into())]),
            Record::from_pairs([("Participant", Value::from(2.5)), ("Time", 3_i64.into())]),
        ];
        let schema = Schema::new("Participant", &["Time"]);
        let rows = group_and_pivot(&records, &schema).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key(), Some(&Value::from("1")));
        assert_eq!(rows[0].field_count(), 3);
        assert_eq!(rows[1].key(), Some(&Value::from("2.5")));
    }

    #[test]
    fn unpivot_recovers_members() {
        let schema = Schema::new("id", &["a", "b", "c"]);
        let mut records = Vec::new();
        for i in 0..20_i64 {
            records.push(Record::from_pairs([
                ("id", Value::from(format!("k{}", i % 7))),
                ("a", Value::from(i)),
                ("b", Value::from(format!("b{}", i))),
                ("c", Value::from(i % 2 == 0)),
            ]));
        }
        let rows = group_and_pivot(&records, &schema).unwrap();
        let groups = group_records(&records, &schema).unwrap();
        let back = unpivot(&rows, &schema);
        assert_eq!(back.len(), groups.len());
        for ((key, members), g) in back.iter().zip(groups.iter()) {
            assert_eq!(key, &g.key);
            let expected: Vec<Vec<Value>> = g
                .members
                .iter()
                .map(|r| {
                    schema
                        .measurement_fields
                        .iter()
                        .map(|f| r.get(f).cloned().unwrap())
                        .collect()
                })
                .collect();
            assert_eq!(members, &expected);
        }
    }

    #[test]
    fn header_width_follows_largest_group() {
        let schema = Schema::phq();
        let mut records = Vec::new();
        for (id, n) in [("1", 2), ("2", 5), ("3", 1)] {
            for e in 0..n {
                records.push(Record::from_pairs([
                    ("record_id", Value::from(id)),
                    ("redcap_event_name", Value::from(format!("event_{}", e))),
                    ("phq_timestamp", Value::from(44562.0 + e as f64)),
                    ("phq_score", Value::from(e as i64)),
                ]));
            }
        }
        let rows = group_and_pivot(&records, &schema).unwrap();
        let counts: Vec<usize> = rows.iter().map(|r| r.field_count()).collect();
        assert_eq!(counts, vec![1 + 3 * 2, 1 + 3 * 5, 1 + 3]);
        let headers = derive_headers(&rows, &schema);
        assert_eq!(headers.len(), 1 + 3 * 5);
        assert_eq!(&headers[..4], &["record_id", "redcap_event_name1", "phq_timestamp1", "phq_score1"]);
        assert_eq!(headers.last().unwrap(), "phq_score5");
    }

    #[test]
    fn divisor_is_the_measurement_count() {
        // Two measurement fields: a constant divisor of 3 would report the wrong width.
        let schema = Schema::ratings();
        let records: Vec<Record> = (0..6).map(|i| rating("A", i, i)).collect();
        let rows = group_and_pivot(&records, &schema).unwrap();
        assert_eq!(rows[0].field_count(), 13);
        assert_eq!(derive_headers(&rows, &schema).len(), 13);
    }

    #[test]
    fn empty_input() {
        let schema = Schema::ratings();
        let rows = group_and_pivot(&[], &schema).unwrap();
        assert!(rows.is_empty());
        assert_eq!(derive_headers(&rows, &schema), vec!["Participant"]);
        let res = reshape(&[], &schema, utc()).unwrap();
        assert_eq!(res.headers, vec!["Participant"]);
        assert!(res.rows.is_empty());
    }

    #[test]
    fn no_measurement_fields() {
        let schema = Schema::new("Participant", &[]);
        let rows = group_and_pivot(&sample(), &schema).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.field_count() == 1));
        assert_eq!(derive_headers(&rows, &schema), vec!["Participant"]);
    }

    #[test]
    fn missing_measurement_is_blank() {
        let schema = Schema::ratings();
        let records = vec![
            rating("A", 1, 5),
            Record::from_pairs([("Participant", Value::from("A")), ("Time", Value::from(7_i64))]),
        ];
        let rows = group_and_pivot(&records, &schema).unwrap();
        assert_eq!(rows[0].field_count(), 5);
        assert_eq!(rows[0].get("Time2"), Some(&Value::Number(7.0)));
        assert_eq!(rows[0].get("Rating2"), Some(&Value::Empty));
    }

    #[test]
    fn missing_key_is_rejected_by_default() {
        let schema = Schema::ratings();
        let records = vec![
            rating("A", 1, 5),
            Record::from_pairs([("Time", Value::from(2_i64)), ("Rating", Value::from(3_i64))]),
        ];
        let err = group_and_pivot(&records, &schema).unwrap_err();
        assert_eq!(
            err,
            ReshapeErrors::MissingKeyField {
                index: 1,
                line: None,
                key_field: "Participant".to_string()
            }
        );
        assert_eq!(
            err.to_string(),
            "record 1 (0-based, blank rows excluded) is missing the key field \"Participant\""
        );
        // A blank key cell counts as missing.
        let blank = vec![Record::from_pairs([("Participant", Value::Empty)]).with_line(5)];
        let err = group_and_pivot(&blank, &schema).unwrap_err();
        assert_eq!(
            err.to_string(),
            "line 5 (record 0) is missing the key field \"Participant\""
        );
    }

    #[test]
    fn missing_key_can_use_empty_key() {
        let schema = Schema::ratings().with_missing_key(MissingKeyPolicy::EmptyKey);
        let records = vec![
            Record::from_pairs([("Time", Value::from(2_i64)), ("Rating", Value::from(3_i64))]),
            rating("A", 1, 5),
            Record::from_pairs([("Participant", Value::Empty), ("Time", Value::from(4_i64))]),
        ];
        let rows = group_and_pivot(&records, &schema).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key(), Some(&Value::from("")));
        assert_eq!(rows[0].get("Time2"), Some(&Value::Number(4.0)));
        assert_eq!(rows[1].key(), Some(&Value::from("A")));
    }

    #[test]
    fn reshape_normalizes_date_fields() {
        let schema = Schema::phq();
        let records = vec![
            Record::from_pairs([
                ("record_id", Value::from("7")),
                ("redcap_event_name", Value::from("baseline_arm_1")),
                ("phq_timestamp", Value::from(44562.0)),
                ("phq_score", Value::from(12_i64)),
            ]),
            Record::from_pairs([
                ("record_id", Value::from("7")),
                ("redcap_event_name", Value::from("week_4_arm_1")),
                ("phq_timestamp", Value::from("2/1/2022")),
                ("phq_score", Value::from(9_i64)),
            ]),
            Record::from_pairs([
                ("record_id", Value::from("7")),
                ("redcap_event_name", Value::from("week_8_arm_1")),
                ("phq_timestamp", Value::Empty),
                ("phq_score", Value::from(4_i64)),
            ]),
        ];
        let res = reshape(&records, &schema, utc()).unwrap();
        let row = &res.rows[0];
        assert_eq!(row.get("phq_timestamp1"), Some(&Value::from("2022-01-01")));
        assert_eq!(row.get("phq_timestamp2"), Some(&Value::from("2022-02-01")));
        assert_eq!(row.get("phq_timestamp3"), Some(&Value::Empty));
        assert_eq!(row.get("phq_score3"), Some(&Value::Number(4.0)));
        assert_eq!(res.headers.len(), 10);
    }

    #[test]
    fn prepare_leaves_other_fields_alone() {
        let schema = Schema::new("id", &["d", "n"]).with_date_fields(&["d"]);
        let records = vec![Record::from_pairs([
            ("id", Value::from("x")),
            ("d", Value::from("3/4/2022")),
            ("n", Value::from("3/4/2022")),
        ])];
        let prepared = prepare_records(&records, &schema, utc());
        assert_eq!(prepared[0].get("d"), Some(&Value::from("2022-03-04")));
        assert_eq!(prepared[0].get("n"), Some(&Value::from("3/4/2022")));
    }

    #[test]
    fn unmeasured_date_fields_keep_their_text() {
        // Rewriting the key would merge 3/4/2022 and 03/04/2022.
        let schema = Schema::new("visit", &["score"]).with_date_fields(&["visit", "note"]);
        let records = vec![
            Record::from_pairs([
                ("visit", Value::from("3/4/2022")),
                ("note", Value::from("1/2/2022")),
                ("score", Value::from(1_i64)),
            ]),
            Record::from_pairs([
                ("visit", Value::from("03/04/2022")),
                ("score", Value::from(2_i64)),
            ]),
        ];
        let prepared = prepare_records(&records, &schema, utc());
        assert_eq!(prepared, records);
        let res = reshape(&records, &schema, utc()).unwrap();
        assert_eq!(res.rows.len(), 2);
        assert_eq!(res.rows[0].key(), Some(&Value::from("3/4/2022")));
    }
}
