//! Output formats for triple queries.

use std::fmt;
use std::str::FromStr;

use crate::error::GeoDataError;
use crate::table::Table;

/// Shape of a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Normalized [`Table`].
    #[default]
    Table,
    /// JSON array string.
    Json,
}

impl OutputFormat {
    /// Accepted spellings, for error messages.
    pub const ACCEPTED: [&'static str; 2] = ["table", "json"];
}

impl FromStr for OutputFormat {
    type Err = GeoDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" | "pd" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(GeoDataError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Result of a triple query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Normalized table.
    Table(Table),
    /// Serialized JSON array.
    Json(String),
}

impl QueryOutput {
    /// Output format of this value.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        match self {
            Self::Table(_) => OutputFormat::Table,
            Self::Json(_) => OutputFormat::Json,
        }
    }

    /// Table, if this is a table result.
    #[must_use]
    pub const fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            Self::Json(_) => None,
        }
    }

    /// JSON text, if this is a JSON result.
    #[must_use]
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Self::Json(json) => Some(json),
            Self::Table(_) => None,
        }
    }
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(table) => fmt::Display::fmt(table, f),
            Self::Json(json) => writeln!(f, "{json}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!("table".parse::<OutputFormat>().ok(), Some(OutputFormat::Table));
        assert_eq!("pd".parse::<OutputFormat>().ok(), Some(OutputFormat::Table));
        assert_eq!("json".parse::<OutputFormat>().ok(), Some(OutputFormat::Json));
    }

    #[test]
    fn rejects_unknown_formats() {
        let err = "xml".parse::<OutputFormat>().expect_err("xml");
        assert_eq!(
            err.to_string(),
            "invalid output format `xml`, accepted values are: table, json"
        );
        assert!("JSON".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn accessors_match_variant() {
        let json = QueryOutput::Json("[]".into());
        assert_eq!(json.format(), OutputFormat::Json);
        assert_eq!(json.as_json(), Some("[]"));
        assert!(json.as_table().is_none());
        assert_eq!(json.to_string(), "[]\n");

        let rows = [serde_json::json!({"id": "0x01"})];
        let table = Table::from_nested("triples", &[geo_graphql::FieldPath::new("id")], &rows)
            .expect("table");
        let output = QueryOutput::Table(table);
        assert_eq!(output.format().to_string(), "table");
        assert!(output.as_json().is_none());
        assert_eq!(output.to_string(), "triples_id\n0x01\n");
    }
}
