//! Request and response types for the CANAGROSA REST API.
//!
//! Records are kept as opaque JSON objects ([`Row`]); only the paging
//! envelope and catalog lookups are typed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ApiError, Result};
use crate::table::Row;

/// One page of a `GET /<group>/list` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// The 1-based page number this response answers.
    pub page: u32,
    pub page_size: u32,
    pub rows: Vec<Row>,
    /// Total record count, when the server reports it.
    pub total: Option<u64>,
    pub has_more: bool,
}

impl Page {
    /// Parse a list response.
    ///
    /// Accepts either `{ "data": [...], "total"?, "page"?, "hasMore"? }` or
    /// a bare array. When the server does not say whether more data exists,
    /// a full page is taken to mean there is more.
    pub fn from_value(value: Value, page: u32, page_size: u32) -> Result<Self> {
        let (items, total, server_page, has_more) = match value {
            Value::Array(items) => (items, None, None, None),
            Value::Object(mut object) => {
                let items = match object.remove("data") {
                    Some(Value::Array(items)) => items,
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => {
                        return Err(ApiError::InvalidResponse(format!(
                            "expected 'data' to be an array, got {}",
                            type_name(&other)
                        )))
                    }
                };
                let total = object.get("total").and_then(Value::as_u64);
                let server_page = object
                    .get("page")
                    .and_then(Value::as_u64)
                    .map(|p| p as u32);
                let has_more = object.get("hasMore").and_then(Value::as_bool);
                (items, total, server_page, has_more)
            }
            other => {
                return Err(ApiError::InvalidResponse(format!(
                    "expected a list or an object, got {}",
                    type_name(&other)
                )))
            }
        };

        let rows: Vec<Row> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect();

        let page = server_page.unwrap_or(page);
        let has_more = has_more.unwrap_or_else(|| match total {
            Some(total) => (page as u64) * (page_size as u64) < total,
            None => rows.len() as u32 >= page_size && page_size > 0,
        });

        Ok(Self {
            page,
            page_size,
            rows,
            total,
            has_more,
        })
    }
}

/// An entry of a read-only lookup list (`/paises/list`, `/provincias/list`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(alias = "ID", deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(alias = "NOMBRE", alias = "nombre")]
    pub name: String,
}

/// Read-only lookup lists used to populate choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Countries,
    Provinces,
}

impl Lookup {
    pub fn path(self) -> &'static str {
        match self {
            Lookup::Countries => "paises",
            Lookup::Provinces => "provincias",
        }
    }
}

fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "invalid id: {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_from_envelope() {
        let value = json!({
            "data": [{"ID": 1}, {"ID": 2}],
            "total": 5,
            "page": 1
        });
        let page = Page::from_value(value, 1, 2).unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total, Some(5));
        assert!(page.has_more);
    }

    #[test]
    fn test_page_from_envelope_last_page() {
        let value = json!({"data": [{"ID": 5}], "total": 5, "page": 3});
        let page = Page::from_value(value, 3, 2).unwrap();
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_explicit_has_more_wins() {
        let value = json!({"data": [{"ID": 1}], "hasMore": true});
        assert!(Page::from_value(value, 1, 50).unwrap().has_more);
    }

    #[test]
    fn test_page_from_bare_array() {
        let full = json!([{"ID": 1}, {"ID": 2}]);
        assert!(Page::from_value(full, 1, 2).unwrap().has_more);

        let short = json!([{"ID": 1}]);
        let page = Page::from_value(short, 4, 2).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.page, 4);
    }

    #[test]
    fn test_page_skips_non_object_items() {
        let value = json!([{"ID": 1}, 7, "x"]);
        assert_eq!(Page::from_value(value, 1, 50).unwrap().rows.len(), 1);
    }

    #[test]
    fn test_page_rejects_scalar() {
        assert!(matches!(
            Page::from_value(json!("nope"), 1, 50),
            Err(ApiError::InvalidResponse(_))
        ));
        assert!(Page::from_value(json!({"data": 3}), 1, 50).is_err());
    }

    #[test]
    fn test_catalog_item_accepts_numeric_ids() {
        let item: CatalogItem = serde_json::from_value(json!({"ID": 28, "NOMBRE": "Madrid"})).unwrap();
        assert_eq!(item.id, "28");
        assert_eq!(item.name, "Madrid");

        let item: CatalogItem = serde_json::from_value(json!({"id": "ES", "name": "España"})).unwrap();
        assert_eq!(item.id, "ES");
    }
}
