//! Column-oriented result table backed by an Arrow `RecordBatch`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use geo_graphql::FieldPath;
use serde_json::Value;

/// Nullable UTF-8 columns under named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    /// Flatten nested rows: one `Utf8` column per field path, named under
    /// `root`. Missing values become nulls; non-string scalars keep their
    /// JSON text.
    pub fn from_nested(
        root: &str,
        paths: &[FieldPath],
        rows: &[Value],
    ) -> Result<Self, ArrowError> {
        let fields: Vec<Field> = paths
            .iter()
            .map(|path| Field::new(path.column_name(root), DataType::Utf8, true))
            .collect();
        let columns: Vec<ArrayRef> = paths
            .iter()
            .map(|path| {
                let cells: Vec<Option<String>> =
                    rows.iter().map(|row| cell_text(path.extract(row))).collect();
                Arc::new(StringArray::from(cells)) as ArrayRef
            })
            .collect();

        let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;
        Ok(Self { batch })
    }

    /// Underlying record batch.
    #[must_use]
    pub const fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Position of a column.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.batch.schema_ref().index_of(column).ok()
    }

    /// Cell at `row`, `column`; `None` for nulls and out-of-range lookups.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let values = self
            .batch
            .column(self.column_index(column)?)
            .as_any()
            .downcast_ref::<StringArray>()?;
        (row < values.len() && values.is_valid(row)).then(|| values.value(row))
    }

    /// Rename columns found in `renames`; other columns are left alone.
    pub fn rename(self, renames: &BTreeMap<String, String>) -> Result<Self, ArrowError> {
        self.map_field_names(|name| {
            renames
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string())
        })
    }

    /// Remove every occurrence of `token` from every column name.
    pub fn strip_column_token(self, token: &str) -> Result<Self, ArrowError> {
        if token.is_empty() {
            return Ok(self);
        }
        self.map_field_names(|name| name.replace(token, ""))
    }

    fn map_field_names(self, rename: impl Fn(&str) -> String) -> Result<Self, ArrowError> {
        let fields: Vec<Field> = self
            .batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| field.as_ref().clone().with_name(rename(field.name())))
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.batch.num_rows()));
        let batch = RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            self.batch.columns().to_vec(),
            &options,
        )?;
        Ok(Self { batch })
    }

    /// Tab-separated text, header first, nulls as empty cells.
    pub fn to_tsv(&self) -> Result<String, ArrowError> {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(b'\t')
            .build(Vec::new());
        writer.write(&self.batch)?;
        String::from_utf8(writer.into_inner())
            .map_err(|err| ArrowError::ExternalError(Box::new(err)))
    }
}

fn cell_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tsv().map_err(|_| fmt::Error)?)
    }
}
