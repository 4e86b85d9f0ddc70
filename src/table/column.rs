//! Column catalogs and the merge of persisted overrides.
//!
//! A catalog is the fixed, ordered list of [`ColumnDescriptor`]s for one
//! entity. Users may only override a column's width, visibility and (for
//! reorderable tables) position; everything else comes from the catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::value;

/// Minimum width a column can be resized to, in layout units.
pub const DEFAULT_MIN_WIDTH: u32 = 80;

/// The value type of a column, which drives sorting and formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    #[default]
    String,
    Boolean,
    Date,
    Time,
}

impl ColumnType {
    /// Format a cell value for display.
    pub fn format(&self, value: Option<&Value>) -> String {
        if matches!(value, None | Some(Value::Null)) {
            return String::new();
        }
        match self {
            ColumnType::Boolean => {
                if value::coerce_bool(value) {
                    "Sí".to_string()
                } else {
                    "No".to_string()
                }
            }
            ColumnType::Number => {
                let n = value::coerce_number(value);
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", n as i64)
                } else {
                    format!("{:.2}", n)
                }
            }
            ColumnType::Date => {
                let raw = value::to_text(value);
                // Dates are shown the way the lab writes them: DD/MM/YYYY
                value::parse_date_time(&raw)
                    .map(|dt| dt.format("%d/%m/%Y").to_string())
                    .unwrap_or(raw)
            }
            ColumnType::Time => {
                let raw = value::to_text(value);
                value::parse_time(&raw)
                    .map(|time| time.format("%H:%M").to_string())
                    .unwrap_or(raw)
            }
            ColumnType::String => value::to_text(value),
        }
    }
}

/// An immutable catalog entry describing one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Field name in the row; unique within a catalog.
    pub id: &'static str,
    /// Header label.
    pub label: &'static str,
    /// Width used when nothing is persisted.
    pub default_width: u32,
    /// Lower resize bound; [`DEFAULT_MIN_WIDTH`] when unset.
    pub min_width: Option<u32>,
    /// Whether the column can be sorted.
    pub sortable: bool,
    /// Default visibility.
    pub visible: bool,
    /// Value type.
    pub column_type: ColumnType,
    /// Responsive priority: 1 is essential, larger numbers drop out first.
    pub priority: u8,
}

impl ColumnDescriptor {
    /// A visible, sortable column with priority 3.
    pub const fn new(
        id: &'static str,
        label: &'static str,
        column_type: ColumnType,
        default_width: u32,
    ) -> Self {
        Self {
            id,
            label,
            default_width,
            min_width: None,
            sortable: true,
            visible: true,
            column_type,
            priority: 3,
        }
    }

    /// Hide the column until the user shows it.
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Disable sorting on this column.
    pub const fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Set the responsive priority (1 is essential).
    pub const fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Override [`DEFAULT_MIN_WIDTH`].
    pub const fn min_width(mut self, width: u32) -> Self {
        self.min_width = Some(width);
        self
    }

    /// The effective minimum width.
    pub fn effective_min_width(&self) -> u32 {
        self.min_width.unwrap_or(DEFAULT_MIN_WIDTH)
    }
}

/// A persisted per-column override. Missing fields fall back to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

/// A catalog column with its user-adjustable state applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub descriptor: ColumnDescriptor,
    pub width: u32,
    pub visible: bool,
}

impl Column {
    /// A column in its catalog-default state.
    pub fn from_descriptor(descriptor: &ColumnDescriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
            width: descriptor.default_width,
            visible: descriptor.visible,
        }
    }

    pub fn id(&self) -> &'static str {
        self.descriptor.id
    }

    pub fn label(&self) -> &'static str {
        self.descriptor.label
    }

    pub fn min_width(&self) -> u32 {
        self.descriptor.effective_min_width()
    }

    /// Format this column's cell in `row`.
    pub fn format_cell(&self, row: &super::Row) -> String {
        self.descriptor.column_type.format(row.get(self.id()))
    }

    /// The persisted form of this column's state.
    pub fn to_config(&self) -> ColumnConfig {
        ColumnConfig {
            id: self.id().to_string(),
            width: Some(self.width),
            visible: Some(self.visible),
        }
    }
}

/// Merge persisted overrides onto a catalog.
///
/// The result has exactly the catalog's ids in catalog order. Overrides with
/// unknown ids are ignored; catalog columns without an override keep their
/// defaults. Persisted widths below a column's minimum are raised to it.
pub fn merge(catalog: &[ColumnDescriptor], overrides: &[ColumnConfig]) -> Vec<Column> {
    catalog
        .iter()
        .map(|descriptor| {
            let mut column = Column::from_descriptor(descriptor);
            if let Some(saved) = overrides.iter().find(|c| c.id == descriptor.id) {
                if let Some(width) = saved.width {
                    column.width = width.max(descriptor.effective_min_width());
                }
                if let Some(visible) = saved.visible {
                    column.visible = visible;
                }
            }
            column
        })
        .collect()
}

/// Reorder columns by a persisted id list.
///
/// Known ids are placed first in the persisted order; columns the list does
/// not mention follow in their existing order. Unknown and duplicate ids are
/// skipped.
pub fn apply_order(columns: Vec<Column>, order: &[String]) -> Vec<Column> {
    let mut remaining: Vec<Option<Column>> = columns.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(remaining.len());

    for id in order {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().map(|c| c.id() == id).unwrap_or(false))
        {
            if let Some(column) = slot.take() {
                ordered.push(column);
            }
        }
    }

    ordered.extend(remaining.into_iter().flatten());
    ordered
}

/// Sum of the widths of all visible columns.
pub fn total_visible_width(columns: &[Column]) -> u32 {
    columns.iter().filter(|c| c.visible).map(|c| c.width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("ID", "Id", ColumnType::Number, 80),
            ColumnDescriptor::new("NOMBRE", "Nombre", ColumnType::String, 250),
            ColumnDescriptor::new("ESTADO", "Estado", ColumnType::String, 120).hidden(),
            ColumnDescriptor::new("ANULADO", "Anulado", ColumnType::Boolean, 100),
        ]
    }

    fn config(id: &str, width: Option<u32>, visible: Option<bool>) -> ColumnConfig {
        ColumnConfig {
            id: id.to_string(),
            width,
            visible,
        }
    }

    #[test]
    fn test_merge_without_overrides_uses_catalog() {
        let columns = merge(&catalog(), &[]);
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[1].width, 250);
        assert!(!columns[2].visible);
    }

    #[test]
    fn test_merge_keeps_catalog_ids_and_order() {
        let overrides = vec![
            config("ANULADO", Some(140), Some(false)),
            config("ID", None, Some(false)),
        ];
        let columns = merge(&catalog(), &overrides);
        let ids: Vec<&str> = columns.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["ID", "NOMBRE", "ESTADO", "ANULADO"]);

        assert_eq!(columns[3].width, 140);
        assert!(!columns[3].visible);
        // Missing width falls back to the catalog default
        assert_eq!(columns[0].width, 80);
        assert!(!columns[0].visible);
        // Untouched columns keep full defaults
        assert_eq!(columns[1].width, 250);
        assert!(columns[1].visible);
    }

    #[test]
    fn test_merge_ignores_unknown_ids() {
        let overrides = vec![config("BORRADO", Some(300), Some(true))];
        let columns = merge(&catalog(), &overrides);
        assert_eq!(columns.len(), 4);
        assert!(columns.iter().all(|c| c.id() != "BORRADO"));
    }

    #[test]
    fn test_merge_clamps_persisted_width_to_minimum() {
        let overrides = vec![config("NOMBRE", Some(10), None)];
        let columns = merge(&catalog(), &overrides);
        assert_eq!(columns[1].width, DEFAULT_MIN_WIDTH);
    }

    #[test]
    fn test_apply_order() {
        let columns = merge(&catalog(), &[]);
        let order = vec![
            "ANULADO".to_string(),
            "UNKNOWN".to_string(),
            "NOMBRE".to_string(),
            "ANULADO".to_string(),
        ];
        let ordered = apply_order(columns, &order);
        let ids: Vec<&str> = ordered.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["ANULADO", "NOMBRE", "ID", "ESTADO"]);
    }

    #[test]
    fn test_total_visible_width() {
        let columns = merge(&catalog(), &[]);
        assert_eq!(total_visible_width(&columns), 80 + 250 + 100);
    }

    #[test]
    fn test_format_values() {
        assert_eq!(ColumnType::Boolean.format(Some(&json!(1))), "Sí");
        assert_eq!(ColumnType::Boolean.format(Some(&json!(0))), "No");
        assert_eq!(ColumnType::Boolean.format(Some(&Value::Null)), "");
        assert_eq!(ColumnType::Number.format(Some(&json!(12))), "12");
        assert_eq!(ColumnType::Number.format(Some(&json!(12.5))), "12.50");
        assert_eq!(ColumnType::Date.format(Some(&json!("2024-03-07T10:00:00Z"))), "07/03/2024");
        assert_eq!(ColumnType::Date.format(Some(&json!("07/03/2024"))), "07/03/2024");
        assert_eq!(ColumnType::Time.format(Some(&json!("09:15:00"))), "09:15");
        // Unparseable values are shown as received
        assert_eq!(ColumnType::Date.format(Some(&json!("2024-02-31"))), "2024-02-31");
        assert_eq!(ColumnType::Time.format(Some(&json!("pronto"))), "pronto");
        assert_eq!(ColumnType::String.format(None), "");
    }

    #[test]
    fn test_column_config_serialization_skips_none() {
        let json = serde_json::to_string(&config("ID", Some(90), None)).unwrap();
        assert_eq!(json, r#"{"id":"ID","width":90}"#);
    }
}
