//! Entity queries assembled at runtime.
//!
//! Subgraph entities are queried through a plural root field
//! (`triples`, `spaces`, ...) that accepts `first`, `skip`, `where`,
//! `orderBy` and `orderDirection`. [`EntityQuery`] captures the parts of
//! such a query that stay fixed across pages; [`PageWindow`] carries the
//! parts that change per page.

use std::fmt;

use serde_json::{Map, Value};

use crate::operation::{GraphqlQuery, GraphqlRequest};

/// Dotted path to a field, relative to the queried entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path such as `entity.name`.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Flattened column name under a root query field, e.g.
    /// `triples_entity_name`.
    #[must_use]
    pub fn column_name(&self, root: &str) -> String {
        let mut name = root.to_string();
        for segment in &self.segments {
            name.push('_');
            name.push_str(segment);
        }
        name
    }

    /// Follow the path through a nested JSON row.
    #[must_use]
    pub fn extract<'a>(&self, row: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(row, |value, segment| value.get(segment.as_str()))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Window of one page request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageWindow {
    /// Page size.
    pub first: u64,
    /// Offset from the start of the ordered result set.
    pub skip: u64,
    /// Only return entities whose id sorts after this cursor.
    pub id_gt: Option<String>,
}

impl PageWindow {
    /// Offset-based window.
    #[must_use]
    pub const fn offset(first: u64, skip: u64) -> Self {
        Self {
            first,
            skip,
            id_gt: None,
        }
    }

    /// Cursor-based window.
    #[must_use]
    pub const fn cursor(first: u64, id_gt: Option<String>) -> Self {
        Self {
            first,
            skip: 0,
            id_gt,
        }
    }
}

/// Query over one entity collection of a subgraph.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    entity: String,
    field: String,
    first: u64,
    filter: Map<String, Value>,
    selection: Vec<FieldPath>,
    response_schema: Option<&'static str>,
}

impl EntityQuery {
    /// Start a query for `entity` (schema type, e.g. `Triple`) through the
    /// root field `field` (e.g. `triples`).
    #[must_use]
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
            first: 100,
            filter: Map::new(),
            selection: Vec::new(),
            response_schema: None,
        }
    }

    /// Maximum number of entities to return across all pages.
    #[must_use]
    pub const fn with_first(mut self, first: u64) -> Self {
        self.first = first;
        self
    }

    /// Replace the `where` filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Map<String, Value>) -> Self {
        self.filter = filter;
        self
    }

    /// Add a field to the selection.
    #[must_use]
    pub fn select(mut self, path: FieldPath) -> Self {
        self.selection.push(path);
        self
    }

    /// Attach a JSON Schema the response `data` must satisfy.
    #[must_use]
    pub const fn with_response_schema(mut self, schema: &'static str) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Schema type name.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Root query field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Result limit.
    #[must_use]
    pub const fn first(&self) -> u64 {
        self.first
    }

    /// `where` filter.
    #[must_use]
    pub const fn filter(&self) -> &Map<String, Value> {
        &self.filter
    }

    /// Selected field paths (without the implicit `id`).
    #[must_use]
    pub fn selection(&self) -> &[FieldPath] {
        &self.selection
    }

    /// Response JSON Schema, if any.
    #[must_use]
    pub const fn response_schema(&self) -> Option<&'static str> {
        self.response_schema
    }

    /// Operation name derived from the root field (`triples` -> `Triples`).
    #[must_use]
    pub fn operation_name(&self) -> String {
        let mut chars = self.field.chars();
        chars.next().map_or_else(String::new, |head| {
            head.to_uppercase().chain(chars).collect()
        })
    }

    /// GraphQL text shared by every page. `id` is always selected so pages
    /// can be keyed and ordered.
    #[must_use]
    pub fn query_text(&self) -> String {
        let mut root = SelectionNode::default();
        root.insert(&["id".to_string()]);
        for path in &self.selection {
            root.insert(path.segments());
        }
        format!(
            "query {op}($first: Int!, $skip: Int!, $where: {entity}_filter) {{ {field}(first: $first, skip: $skip, where: $where, orderBy: id, orderDirection: asc) {{ {selection} }} }}",
            op = self.operation_name(),
            entity = self.entity,
            field = self.field,
            selection = root.render(),
        )
    }

    /// Request for one page.
    #[must_use]
    pub fn page_request(&self, window: &PageWindow) -> GraphqlRequest<Value> {
        let mut filter = self.filter.clone();
        if let Some(cursor) = &window.id_gt {
            filter.insert("id_gt".to_string(), Value::String(cursor.clone()));
        }
        let mut variables = Map::new();
        variables.insert("first".to_string(), Value::from(window.first));
        variables.insert("skip".to_string(), Value::from(window.skip));
        variables.insert("where".to_string(), Value::Object(filter));

        GraphqlRequest::new(GraphqlQuery::new(self.query_text()), Value::Object(variables))
            .with_operation_name(self.operation_name())
    }
}

#[derive(Debug, Default)]
struct SelectionNode {
    children: Vec<(String, SelectionNode)>,
}

impl SelectionNode {
    fn insert(&mut self, segments: &[String]) {
        let Some((head, rest)) = segments.split_first() else {
            return;
        };
        let index = match self.children.iter().position(|(name, _)| name == head) {
            Some(index) => index,
            None => {
                self.children.push((head.clone(), Self::default()));
                self.children.len() - 1
            }
        };
        self.children[index].1.insert(rest);
    }

    fn render(&self) -> String {
        self.children
            .iter()
            .map(|(name, node)| {
                if node.children.is_empty() {
                    name.clone()
                } else {
                    format!("{name} {{ {} }}", node.render())
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn triples() -> EntityQuery {
        EntityQuery::new("Triple", "triples")
            .with_first(5)
            .select(FieldPath::new("entity.name"))
            .select(FieldPath::new("attribute.name"))
            .select(FieldPath::new("stringValue"))
    }

    #[test]
    fn field_path_column_names() {
        assert_eq!(
            FieldPath::new("entity.name").column_name("triples"),
            "triples_entity_name"
        );
        assert_eq!(
            FieldPath::new("stringValue").column_name("triples"),
            "triples_stringValue"
        );
        assert_eq!(FieldPath::new("entity.name").to_string(), "entity.name");
    }

    #[test]
    fn field_path_extracts_nested_values() {
        let row = json!({"entity": {"name": "Law"}, "stringValue": null});
        assert_eq!(
            FieldPath::new("entity.name").extract(&row),
            Some(&json!("Law"))
        );
        assert_eq!(
            FieldPath::new("stringValue").extract(&row),
            Some(&Value::Null)
        );
        assert_eq!(FieldPath::new("attribute.name").extract(&row), None);
    }

    #[test]
    fn query_text_merges_nested_selections() {
        let query = triples().select(FieldPath::new("entity.id"));
        assert_eq!(
            query.query_text(),
            "query Triples($first: Int!, $skip: Int!, $where: Triple_filter) { triples(first: $first, skip: $skip, where: $where, orderBy: id, orderDirection: asc) { id entity { name id } attribute { name } stringValue } }"
        );
    }

    #[test]
    fn cursor_window_extends_filter() {
        let mut filter = Map::new();
        filter.insert("attribute_".to_string(), json!({"name": "Description"}));
        let query = triples().with_filter(filter);

        let request = query.page_request(&PageWindow::cursor(2, Some("0xabc".to_string())));
        assert_eq!(request.operation_name.as_deref(), Some("Triples"));
        assert_eq!(
            request.variables,
            json!({
                "first": 2,
                "skip": 0,
                "where": {"attribute_": {"name": "Description"}, "id_gt": "0xabc"}
            })
        );
        assert!(!query.filter().contains_key("id_gt"));
    }

    #[test]
    fn offset_window_sets_skip() {
        let request = triples().page_request(&PageWindow::offset(3, 6));
        assert_eq!(
            request.variables,
            json!({"first": 3, "skip": 6, "where": {}})
        );
    }
}
