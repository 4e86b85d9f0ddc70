//! Client-side sorting of loaded rows by a single typed column.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::column::ColumnType;
use super::value;
use super::Row;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// Header arrow for this direction.
    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

/// The active sort of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub column: String,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// The config after the user picks `column`: same column flips
    /// direction, a different column starts ascending.
    pub fn next_for(current: Option<&SortConfig>, column: &str) -> SortConfig {
        match current {
            Some(active) if active.column == column => {
                SortConfig::new(column, active.direction.toggled())
            }
            _ => SortConfig::new(column, SortDirection::Asc),
        }
    }
}

/// Compare two cells under a column type, ascending.
pub fn compare_values(
    column_type: ColumnType,
    a: Option<&serde_json::Value>,
    b: Option<&serde_json::Value>,
) -> Ordering {
    match column_type {
        ColumnType::Number => {
            let (x, y) = (value::coerce_number(a), value::coerce_number(b));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        ColumnType::Boolean => value::coerce_bool(a).cmp(&value::coerce_bool(b)),
        ColumnType::Date => value::coerce_timestamp(a).cmp(&value::coerce_timestamp(b)),
        ColumnType::Time => value::coerce_time(a).cmp(&value::coerce_time(b)),
        ColumnType::String => {
            let (x, y) = (value::to_text(a), value::to_text(b));
            value::fold_text(&x)
                .cmp(&value::fold_text(&y))
                .then_with(|| x.to_lowercase().cmp(&y.to_lowercase()))
        }
    }
}

/// Indices of `rows` in sorted order. Stable: ties keep input order in
/// both directions.
pub fn sort_indices(
    rows: &[Row],
    indices: &mut [usize],
    column: &str,
    direction: SortDirection,
    column_type: ColumnType,
) {
    indices.sort_by(|&i, &j| {
        let ordering = compare_values(column_type, rows[i].get(column), rows[j].get(column));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Return a sorted copy of `rows`; the input is left untouched.
pub fn sort_rows(
    rows: &[Row],
    column: &str,
    direction: SortDirection,
    column_type: ColumnType,
) -> Vec<Row> {
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    sort_indices(rows, &mut indices, column, direction, column_type);
    indices.into_iter().map(|i| rows[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows(values: Vec<Value>, field: &str) -> Vec<Row> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let mut row = Row::new();
                row.insert("ID".to_string(), json!(i));
                row.insert(field.to_string(), v);
                row
            })
            .collect()
    }

    fn ids(rows: &[Row]) -> Vec<u64> {
        rows.iter().map(|r| r["ID"].as_u64().unwrap()).collect()
    }

    #[test]
    fn test_boolean_sort_null_is_falsy() {
        // [{ANULADO:1},{ANULADO:0},{ANULADO:null}] ascending
        let input = rows(vec![json!(1), json!(0), Value::Null], "ANULADO");
        let sorted = sort_rows(&input, "ANULADO", SortDirection::Asc, ColumnType::Boolean);
        assert_eq!(ids(&sorted), vec![1, 2, 0]);
        // Input untouched
        assert_eq!(ids(&input), vec![0, 1, 2]);
    }

    #[test]
    fn test_boolean_sort_descending() {
        let input = rows(vec![json!(0), json!(1), Value::Null], "ANULADO");
        let sorted = sort_rows(&input, "ANULADO", SortDirection::Desc, ColumnType::Boolean);
        assert_eq!(ids(&sorted), vec![1, 0, 2]);
    }

    #[test]
    fn test_number_sort_parses_strings() {
        let input = rows(vec![json!("10"), json!(2), json!("abc"), json!(-1.5)], "PRECIO");
        let sorted = sort_rows(&input, "PRECIO", SortDirection::Asc, ColumnType::Number);
        // "abc" coerces to 0
        assert_eq!(ids(&sorted), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_date_sort_missing_is_epoch() {
        let mut input = rows(
            vec![json!("2024-02-01"), json!("01/01/2023"), json!("2024-01-15T08:00:00Z")],
            "FECHA",
        );
        input[1].remove("FECHA");
        let sorted = sort_rows(&input, "FECHA", SortDirection::Asc, ColumnType::Date);
        assert_eq!(ids(&sorted), vec![1, 2, 0]);
    }

    #[test]
    fn test_time_sort() {
        let input = rows(vec![json!("14:00"), json!("09:30:00"), Value::Null], "HORA");
        let sorted = sort_rows(&input, "HORA", SortDirection::Asc, ColumnType::Time);
        assert_eq!(ids(&sorted), vec![2, 1, 0]);
    }

    #[test]
    fn test_string_sort_is_case_and_accent_insensitive() {
        let input = rows(
            vec![json!("zaragoza"), json!("Ávila"), json!("barcelona"), Value::Null],
            "PROVINCIA",
        );
        let sorted = sort_rows(&input, "PROVINCIA", SortDirection::Asc, ColumnType::String);
        assert_eq!(ids(&sorted), vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let input = rows(vec![json!("a"), json!("b"), json!("A"), json!("a")], "N");
        let sorted = sort_rows(&input, "N", SortDirection::Asc, ColumnType::String);
        assert_eq!(ids(&sorted), vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let input = rows(
            vec![json!(3), json!(1), json!(2), json!(1), Value::Null],
            "N",
        );
        let once = sort_rows(&input, "N", SortDirection::Desc, ColumnType::Number);
        let twice = sort_rows(&once, "N", SortDirection::Desc, ColumnType::Number);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_sort_config_next_for() {
        let first = SortConfig::next_for(None, "NOMBRE");
        assert_eq!(first, SortConfig::new("NOMBRE", SortDirection::Asc));

        let second = SortConfig::next_for(Some(&first), "NOMBRE");
        assert_eq!(second.direction, SortDirection::Desc);

        let other = SortConfig::next_for(Some(&second), "ID");
        assert_eq!(other, SortConfig::new("ID", SortDirection::Asc));
    }

    #[test]
    fn test_sort_direction_serialization() {
        let json = serde_json::to_string(&SortConfig::new("ID", SortDirection::Desc)).unwrap();
        assert_eq!(json, r#"{"column":"ID","direction":"desc"}"#);
    }
}
