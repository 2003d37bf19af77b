//! Features and the record capability used by property lookups.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::schema::Schema;
use super::value::Value;
use crate::geom::Geometry;

/// Anything that exposes named attributes.
///
/// Property expressions evaluate against this capability; a missing name is
/// reported as `None`, never as an error.
pub trait Record {
    fn get(&self, name: &str) -> Option<&Value>;
}

/// A value is not a record: every lookup is absent.
impl Record for Value {
    fn get(&self, _name: &str) -> Option<&Value> {
        None
    }
}

impl Record for BTreeMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        BTreeMap::get(self, name)
    }
}

impl Record for HashMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        HashMap::get(self, name)
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn get(&self, name: &str) -> Option<&Value> {
        (**self).get(name)
    }
}

/// A single feature: an identifier plus one value per schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: String,
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Feature {
    /// Creates a feature with every attribute null
    pub fn new(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        let values = vec![Value::Null; schema.len()];
        Self {
            id: id.into(),
            schema,
            values,
        }
    }

    /// Creates a feature from values listed in schema order.
    ///
    /// Missing trailing values are null; extra values are dropped.
    pub fn from_values(id: impl Into<String>, schema: Arc<Schema>, values: Vec<Value>) -> Self {
        let mut values = values;
        values.resize(schema.len(), Value::Null);
        Self {
            id: id.into(),
            schema,
            values,
        }
    }

    /// Creates a feature by pulling schema fields out of a JSON object.
    pub fn from_json(id: impl Into<String>, schema: Arc<Schema>, body: serde_json::Value) -> Self {
        let mut feature = Self::new(id, schema);
        if let serde_json::Value::Object(map) = body {
            for (k, v) in map {
                feature.set(&k, Value::from(v));
            }
        }
        feature
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Sets a named attribute. Returns false if the schema has no such field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.schema.index_of(name) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => false,
        }
    }

    /// The value of the default geometry field, if it holds a geometry
    pub fn geometry(&self) -> Option<&Geometry<f64>> {
        let field = self.schema.default_geometry()?;
        self.get(&field.name).and_then(Value::as_geometry)
    }

    /// Replaces the value of the default geometry field
    pub fn set_geometry(&mut self, geometry: Geometry<f64>) -> bool {
        let name = match self.schema.default_geometry() {
            Some(f) => f.name.clone(),
            None => return false,
        };
        self.set(&name, Value::Geometry(geometry))
    }

    /// Applies `f` to every geometry-valued attribute, in schema order
    pub fn try_map_geometries<E>(
        mut self,
        mut f: impl FnMut(&Geometry<f64>) -> Result<Geometry<f64>, E>,
    ) -> Result<Self, E> {
        for (field, value) in self.schema.fields().iter().zip(self.values.iter_mut()) {
            if !field.is_geometry() {
                continue;
            }
            if let Value::Geometry(g) = value {
                *value = Value::Geometry(f(g)?);
            }
        }
        Ok(self)
    }

    /// Swaps the schema, keeping values positionally. Used when only field
    /// metadata (such as the CRS) changes.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.values.resize(schema.len(), Value::Null);
        self.schema = schema;
        self
    }

    /// Name/value pairs in schema order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.values.iter())
    }
}

impl Record for Feature {
    fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }
}

/// Retypes a feature to a narrower schema by pulling each of the schema's
/// fields out of the original.
pub fn retype(feature: &Feature, schema: Arc<Schema>) -> Feature {
    let values = schema
        .fields()
        .iter()
        .map(|f| feature.get(&f.name).cloned().unwrap_or(Value::Null))
        .collect();
    Feature::from_values(feature.id(), schema, values)
}
