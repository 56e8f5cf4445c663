//! Remote schema introspection and JSON Schema response validation.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphqlClientError;
use crate::operation::{GraphqlOperation, NoVariables};

/// Introspection operation used to load a subgraph schema.
pub struct IntrospectSchema;

impl GraphqlOperation for IntrospectSchema {
    type Variables = NoVariables;
    type ResponseData = IntrospectionData;

    const QUERY: &'static str = "query IntrospectSchema { __schema { queryType { name } types { name kind fields { name } } } }";
    const OPERATION_NAME: &'static str = "IntrospectSchema";
}

/// Raw `data` payload of the introspection query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionData {
    #[serde(rename = "__schema")]
    schema: RawSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
    query_type: Option<RawTypeRef>,
    #[serde(default)]
    types: Vec<RawType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTypeRef {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawType {
    name: Option<String>,
    kind: String,
    #[serde(default)]
    fields: Option<Vec<RawField>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawField {
    name: String,
}

/// An object type exposed by the remote schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectType {
    /// Type name, e.g. `Triple`.
    pub name: String,
    /// Field names in declaration order.
    pub fields: Vec<String>,
}

impl ObjectType {
    /// Returns `true` if the type declares `field`.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|name| name == field)
    }
}

/// Introspected view of a subgraph schema.
///
/// Only object types are kept; introspection meta types (`__Type` and
/// friends) are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubgraphSchema {
    query_type: String,
    objects: BTreeMap<String, ObjectType>,
}

impl SubgraphSchema {
    /// Build from the introspection payload.
    #[must_use]
    pub fn from_introspection(data: IntrospectionData) -> Self {
        let query_type = data
            .schema
            .query_type
            .map_or_else(|| "Query".to_string(), |ty| ty.name);
        let objects = data
            .schema
            .types
            .into_iter()
            .filter(|ty| ty.kind == "OBJECT")
            .filter_map(|ty| {
                let name = ty.name?;
                if name.starts_with("__") {
                    return None;
                }
                let fields = ty
                    .fields
                    .unwrap_or_default()
                    .into_iter()
                    .map(|field| field.name)
                    .collect();
                Some((name.clone(), ObjectType { name, fields }))
            })
            .collect();
        Self {
            query_type,
            objects,
        }
    }

    /// Name of the root query type.
    #[must_use]
    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    /// Look up an object type by name.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.objects.get(name)
    }

    /// Object types other than the root query type, sorted by name.
    pub fn entities(&self) -> impl Iterator<Item = &ObjectType> {
        self.objects
            .values()
            .filter(|ty| ty.name != self.query_type && ty.name != "Subscription")
    }

    /// Returns `true` if `entity` exists and declares every field in `fields`.
    #[must_use]
    pub fn has_entity_fields(&self, entity: &str, fields: &[&str]) -> bool {
        self.object(entity)
            .is_some_and(|ty| fields.iter().all(|field| ty.has_field(field)))
    }
}

/// Compiled JSON Schema validators keyed by schema text.
#[derive(Debug, Default)]
pub struct SchemaCache {
    inner: Mutex<HashMap<u64, Arc<Validator>>>,
}

impl SchemaCache {
    /// Fetch or compile a schema validator.
    pub fn get_or_compile(&self, schema: &str) -> Result<Arc<Validator>, GraphqlClientError> {
        let mut hasher = DefaultHasher::new();
        schema.hash(&mut hasher);
        let key = hasher.finish();

        let mut guard = self
            .inner
            .lock()
            .map_err(|_| GraphqlClientError::Protocol {
                message: "schema cache lock poisoned".to_string(),
            })?;
        if let Some(existing) = guard.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let value: Value = serde_json::from_str(schema)?;
        let validator =
            Validator::new(&value).map_err(|err| GraphqlClientError::SchemaValidation {
                message: "invalid JSON Schema".to_string(),
                errors: vec![err.to_string()],
            })?;
        let validator = Arc::new(validator);
        guard.insert(key, Arc::clone(&validator));
        drop(guard);

        Ok(validator)
    }

    /// Validate a JSON value against a schema.
    pub fn validate(&self, schema: &str, value: &Value) -> Result<(), GraphqlClientError> {
        let validator = self.get_or_compile(schema)?;
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|error| error.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GraphqlClientError::SchemaValidation {
                message: "schema validation failed".to_string(),
                errors,
            })
        }
    }

    /// Number of compiled validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |guard| guard.len())
    }

    /// Returns `true` if nothing has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
