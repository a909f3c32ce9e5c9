// On-screen rendering of the reshaped table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use serde_json::{json, Map};

use crate::rpv::*;

/// One line per key, listing the measurement fields of each member in order.
///
/// Members that lack a field are shown with a blank value.
pub fn summary_lines(res: &Reshaped, schema: &Schema) -> Vec<String> {
    unpivot(&res.rows, schema)
        .into_iter()
        .map(|(key, members)| {
            let parts: Vec<String> = members
                .iter()
                .flat_map(|values| {
                    schema
                        .measurement_fields
                        .iter()
                        .zip(values.iter())
                        .map(|(f, v)| format!("{}: {}", f, v))
                })
                .collect();
            format!("{} {}: {}", schema.key_field, key, parts.join(", "))
        })
        .collect()
}

pub fn render_table(res: &Reshaped) -> Table {
    let mut table = Table::new();
    table.set_header(res.headers.iter().map(|h| header_cell(h)));
    apply_table_style(&mut table);
    for row in res.rows.iter() {
        table.add_row(res.headers.iter().map(|h| match row.get(h) {
            Some(Value::Number(n)) => Cell::new(n).set_alignment(CellAlignment::Right),
            Some(v) => Cell::new(v),
            None => Cell::new(""),
        }));
    }
    table
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

/// The table as JSON. The `headers` array gives the column order, each row
/// only holds the fields it has.
pub fn rows_to_json(res: &Reshaped) -> JSValue {
    let rows: Vec<JSValue> = res
        .rows
        .iter()
        .map(|row| {
            let mut m = Map::new();
            for (name, v) in row.fields.iter() {
                m.insert(name.clone(), json!(v));
            }
            JSValue::Object(m)
        })
        .collect();
    json!({
        "headers": res.headers,
        "rows": rows,
    })
}
