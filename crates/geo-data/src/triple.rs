//! Triple entity: query construction, projection and normalization.

use std::collections::BTreeMap;

use arrow::array::{Array, StringArray};
use arrow::error::ArrowError;
use geo_graphql::{EntityQuery, FieldPath};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::table::Table;

/// Schema type of triple entities.
pub const TRIPLE_ENTITY: &str = "Triple";

/// Root query field for triple collections.
pub const TRIPLES_FIELD: &str = "triples";

/// Default `first`: large enough to mean "everything".
pub const DEFAULT_FIRST: u64 = 1_000_000_000;

/// Token stripped from table column names during cleanup.
const COLUMN_PREFIX: &str = "triples_";

/// Fields every triple query selects, relative to the triple.
const PROJECTED_FIELDS: [&str; 3] = ["entity.name", "attribute.name", "stringValue"];

/// Fields the `Triple` entity must expose for the projection to resolve.
pub const REQUIRED_FIELDS: [&str; 3] = ["entity", "attribute", "stringValue"];

/// JSON Schema for the `data` of a triple page.
const TRIPLES_RESPONSE_SCHEMA: &str = r#"{
    "type": "object",
    "required": ["triples"],
    "properties": {
        "triples": {
            "type": "array",
            "items": {
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": {"type": "string"},
                    "entity": {
                        "type": ["object", "null"],
                        "properties": {"name": {"type": ["string", "null"]}}
                    },
                    "attribute": {
                        "type": ["object", "null"],
                        "properties": {"name": {"type": ["string", "null"]}}
                    },
                    "stringValue": {"type": ["string", "null"]}
                }
            }
        }
    }
}"#;

/// A bounded triple query. Consumed when turned into an engine query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleQuerySpec {
    first: u64,
    attribute_name: Option<String>,
}

impl TripleQuerySpec {
    /// Result limit.
    #[must_use]
    pub const fn first(&self) -> u64 {
        self.first
    }

    /// Attribute name filter.
    #[must_use]
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute_name.as_deref()
    }

    /// `where` filter: exact match on the related attribute's name, or empty.
    #[must_use]
    pub fn filter(&self) -> Map<String, Value> {
        let mut filter = Map::new();
        if let Some(name) = &self.attribute_name {
            let mut attribute = Map::new();
            attribute.insert("name".to_string(), Value::String(name.clone()));
            filter.insert("attribute_".to_string(), Value::Object(attribute));
        }
        filter
    }

    /// Engine query selecting `projection`.
    #[must_use]
    pub fn into_entity_query(self, projection: &FieldProjection, validate: bool) -> EntityQuery {
        let filter = self.filter();
        let mut query = EntityQuery::new(TRIPLE_ENTITY, TRIPLES_FIELD)
            .with_first(self.first)
            .with_filter(filter);
        for path in projection.paths() {
            query = query.select(path.clone());
        }
        if validate {
            query = query.with_response_schema(TRIPLES_RESPONSE_SCHEMA);
        }
        query
    }
}

/// The fixed, ordered set of triple fields every query retrieves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjection {
    paths: Vec<FieldPath>,
}

impl Default for FieldProjection {
    fn default() -> Self {
        Self {
            paths: PROJECTED_FIELDS.iter().map(|path| FieldPath::new(path)).collect(),
        }
    }
}

impl FieldProjection {
    /// Field paths in order.
    #[must_use]
    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    /// Raw column names as produced by flattening.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.paths
            .iter()
            .map(|path| path.column_name(TRIPLES_FIELD))
            .collect()
    }
}

/// One normalized table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Name of the subject entity
    pub entity_name: Option<String>,
    /// Name of the attribute
    pub attribute_name: Option<String>,
    /// String value, when the triple carries one
    pub string_value: Option<String>,
}

impl ResultRecord {
    /// Read records back from a table normalized with the default renames.
    /// Columns that are missing or not `Utf8` read as `None`.
    #[must_use]
    pub fn from_table(table: &Table) -> Vec<Self> {
        let batch = table.record_batch();
        let column = |name: &str| {
            batch
                .column_by_name(name)
                .and_then(|array| array.as_any().downcast_ref::<StringArray>())
        };
        let entity = column("entity_name");
        let attribute = column("attribute_name");
        let value = column("string_value");
        (0..batch.num_rows())
            .map(|row| Self {
                entity_name: cell(entity, row),
                attribute_name: cell(attribute, row),
                string_value: cell(value, row),
            })
            .collect()
    }
}

fn cell(values: Option<&StringArray>, row: usize) -> Option<String> {
    values
        .filter(|values| values.is_valid(row))
        .map(|values| values.value(row).to_string())
}

/// Flat JSON record. Keeps the wire name `stringValue`, unlike the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTriple {
    /// `entity.name`
    pub entity: Value,
    /// `attribute.name`
    pub attribute: Value,
    /// `stringValue`
    #[serde(rename = "stringValue")]
    pub string_value: Value,
}

impl JsonTriple {
    /// Flatten one nested triple row.
    #[must_use]
    pub fn from_row(row: &Value) -> Self {
        let pick = |path: &str| {
            FieldPath::new(path)
                .extract(row)
                .cloned()
                .unwrap_or(Value::Null)
        };
        Self {
            entity: pick("entity.name"),
            attribute: pick("attribute.name"),
            string_value: pick("stringValue"),
        }
    }
}

/// Helper for querying triples: builds specs and normalizes results.
#[derive(Debug, Clone, Default)]
pub struct TripleEntity {
    projection: FieldProjection,
}

impl TripleEntity {
    /// Helper with the standard projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a query spec for up to `first` triples, optionally filtered by
    /// attribute name.
    #[must_use]
    pub fn build_query(&self, first: u64, attribute_name: Option<&str>) -> TripleQuerySpec {
        TripleQuerySpec {
            first,
            attribute_name: attribute_name.map(str::to_string),
        }
    }

    /// Fields selected by every query.
    #[must_use]
    pub const fn fields(&self) -> &FieldProjection {
        &self.projection
    }

    /// Rename map applied when the caller supplies none.
    #[must_use]
    pub fn default_renames() -> BTreeMap<String, String> {
        BTreeMap::from([(
            format!("{TRIPLES_FIELD}_stringValue"),
            "string_value".to_string(),
        )])
    }

    /// Flatten rows, rename columns, then strip the `triples_` token.
    pub fn to_table(
        &self,
        rows: &[Value],
        renames: Option<&BTreeMap<String, String>>,
    ) -> Result<Table, ArrowError> {
        let table = Table::from_nested(TRIPLES_FIELD, self.projection.paths(), rows)?;
        let table = match renames {
            Some(renames) => table.rename(renames)?,
            None => table.rename(&Self::default_renames())?,
        };
        Self::clean(table)
    }

    /// Column cleanup pass.
    pub fn clean(table: Table) -> Result<Table, ArrowError> {
        table.strip_column_token(COLUMN_PREFIX)
    }

    /// Flatten rows into JSON records.
    #[must_use]
    pub fn to_json_records(rows: &[Value]) -> Vec<JsonTriple> {
        rows.iter().map(JsonTriple::from_row).collect()
    }
}
