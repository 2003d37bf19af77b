//! Feature schemas: ordered, typed field lists.

use serde::{Deserialize, Serialize};

use crate::proj::Crs;

/// Field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    Int,
    Float,
    String,
    Geometry,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Geometry => "geometry",
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Declared reference system, geometry fields only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            crs: None,
        }
    }

    /// Create a geometry field with an optional declared CRS
    pub fn geometry(name: impl Into<String>, crs: Option<Crs>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Geometry,
            crs,
        }
    }

    pub fn is_geometry(&self) -> bool {
        self.field_type == FieldType::Geometry
    }
}

/// Named, ordered list of fields describing a feature type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Creates an empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field, replacing any existing field of the same name
    pub fn with_field(mut self, field: Field) -> Self {
        match self.index_of(&field.name) {
            Some(i) => self.fields[i] = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Appends a non-geometry field
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_field(Field::new(name, field_type))
    }

    /// Appends a geometry field
    pub fn geometry(self, name: impl Into<String>, crs: Option<Crs>) -> Self {
        self.with_field(Field::geometry(name, crs))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the named field
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Looks up a field by name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The default geometry field: the first one declared
    pub fn default_geometry(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_geometry())
    }

    /// The CRS of the default geometry field
    pub fn crs(&self) -> Option<&Crs> {
        self.default_geometry().and_then(|f| f.crs.as_ref())
    }

    /// Narrows the schema to the named fields, in the order given.
    ///
    /// Names the schema does not declare are skipped.
    pub fn retype(&self, names: &[String]) -> Schema {
        let fields = names
            .iter()
            .filter_map(|n| self.get(n).cloned())
            .collect();
        Schema {
            name: self.name.clone(),
            fields,
        }
    }

    /// Copy of the schema with every geometry field declared in `crs`
    pub fn with_crs(&self, crs: &Crs) -> Schema {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                let mut f = f.clone();
                if f.is_geometry() {
                    f.crs = Some(crs.clone());
                }
                f
            })
            .collect();
        Schema {
            name: self.name.clone(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities() -> Schema {
        Schema::new("cities")
            .geometry("geom", Some(Crs::epsg(4326)))
            .field("name", FieldType::String)
            .field("pop", FieldType::Int)
    }

    #[test]
    fn test_default_geometry_and_crs() {
        let schema = cities();
        assert_eq!(schema.default_geometry().unwrap().name, "geom");
        assert_eq!(schema.crs(), Some(&Crs::epsg(4326)));
    }

    #[test]
    fn test_retype_keeps_requested_order() {
        let schema = cities();
        let narrowed = schema.retype(&["pop".to_string(), "missing".to_string(), "name".to_string()]);
        let names: Vec<_> = narrowed.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["pop", "name"]);
    }

    #[test]
    fn test_with_field_replaces_same_name() {
        let schema = cities().field("pop", FieldType::Float);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.get("pop").unwrap().field_type, FieldType::Float);
    }

    #[test]
    fn test_with_crs_rewrites_geometry_fields_only() {
        let schema = cities().with_crs(&Crs::epsg(3857));
        assert_eq!(schema.crs(), Some(&Crs::epsg(3857)));
        assert!(schema.get("name").unwrap().crs.is_none());
    }

    #[test]
    fn test_schema_json() {
        let json = serde_json::to_value(cities()).unwrap();
        assert_eq!(json["fields"][1]["type"], "string");
    }
}
