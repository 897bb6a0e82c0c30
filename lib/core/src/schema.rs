use crate::{DataType, Error, IndexParams, Result};
use serde::{Deserialize, Serialize};

/// Declaration of one field: name, data type, nullability, vector dimension
/// (0 when not applicable) and optional index parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub dimension: u32,
    pub index_params: Option<IndexParams>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            dimension: 0,
            index_params: None,
        }
    }

    pub fn with_dimension(name: impl Into<String>, data_type: DataType, dimension: u32) -> Self {
        Self {
            dimension,
            ..Self::new(name, data_type)
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn index(mut self, params: IndexParams) -> Self {
        self.index_params = Some(params);
        self
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        self.data_type.is_vector()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("field name must not be empty".to_string()));
        }
        if self.data_type == DataType::Undefined {
            return Err(Error::InvalidArgument(format!(
                "field '{}' has an undefined data type",
                self.name
            )));
        }
        if !self.data_type.is_storable() {
            return Err(Error::NotSupported(format!(
                "data type {} of field '{}' is not supported",
                self.data_type, self.name
            )));
        }
        if self.data_type.is_dense_vector() && self.dimension == 0 {
            return Err(Error::InvalidArgument(format!(
                "vector field '{}' requires a dimension",
                self.name
            )));
        }
        if self.data_type.is_binary_vector() {
            let width = if self.data_type == DataType::VectorBinary32 { 32 } else { 64 };
            if self.dimension % width != 0 {
                return Err(Error::InvalidArgument(format!(
                    "binary vector field '{}' dimension must be a multiple of {}",
                    self.name, width
                )));
            }
        }
        if let Some(params) = &self.index_params {
            params.validate_for(&self.name, self.data_type)?;
        }
        Ok(())
    }
}

/// Named, ordered set of fields with unique names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    name: String,
    fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a copy of `field`. A duplicate name leaves the schema untouched.
    pub fn add_field(&mut self, field: FieldSchema) -> Result<()> {
        if field.name.is_empty() {
            return Err(Error::InvalidArgument("field name must not be empty".to_string()));
        }
        if self.has_field(&field.name) {
            return Err(Error::AlreadyExists(format!(
                "field '{}' already exists in schema '{}'",
                field.name, self.name
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Attach index parameters to an existing column.
    pub fn add_index(&mut self, column: &str, params: IndexParams) -> Result<()> {
        let field = self.field_mut(column).ok_or_else(|| {
            Error::NotFound(format!("column '{}' does not exist", column))
        })?;
        params.validate_for(column, field.data_type)?;
        field.index_params = Some(params);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut FieldSchema> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub(crate) fn remove_field(&mut self, name: &str) -> Option<FieldSchema> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos))
    }

    #[inline]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Names of dense and sparse vector fields, in declaration order.
    pub fn vector_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_vector())
            .map(|f| f.name.clone())
            .collect()
    }

    /// Full validation, run before a collection is created from this schema.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument("schema name must not be empty".to_string()));
        }
        if self.fields.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "schema '{}' has no fields",
                self.name
            )));
        }
        for field in &self.fields {
            field.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MetricType, QuantizeType, StatusCode};

    fn sample() -> CollectionSchema {
        let mut schema = CollectionSchema::new("docs");
        schema.add_field(FieldSchema::new("title", DataType::String)).unwrap();
        schema
            .add_field(FieldSchema::with_dimension("emb", DataType::VectorFp32, 4))
            .unwrap();
        schema
            .add_field(FieldSchema::new("sparse", DataType::SparseVectorFp32))
            .unwrap();
        schema
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut schema = sample();
        let err = schema
            .add_field(FieldSchema::new("title", DataType::Int64))
            .unwrap_err();
        assert_eq!(err.code(), StatusCode::AlreadyExists);
        assert_eq!(schema.field("title").unwrap().data_type, DataType::String);
        assert_eq!(schema.fields().len(), 3);
    }

    #[test]
    fn test_vector_field_names_view() {
        let schema = sample();
        assert_eq!(schema.vector_field_names(), vec!["emb", "sparse"]);
        assert_eq!(schema.field_names(), vec!["title", "emb", "sparse"]);
    }

    #[test]
    fn test_add_index() {
        let mut schema = sample();
        let hnsw = IndexParams::hnsw(MetricType::Cosine, 16, 200, QuantizeType::Undefined);

        let err = schema.add_index("nope", hnsw.clone()).unwrap_err();
        assert_eq!(err.code(), StatusCode::NotFound);

        let err = schema.add_index("title", hnsw.clone()).unwrap_err();
        assert_eq!(err.code(), StatusCode::InvalidArgument);
        assert!(schema.field("title").unwrap().index_params.is_none());

        schema.add_index("emb", hnsw.clone()).unwrap();
        assert_eq!(schema.field("emb").unwrap().index_params, Some(hnsw));
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());
        assert!(CollectionSchema::new("empty").validate().is_err());

        let mut schema = CollectionSchema::new("bad");
        schema.add_field(FieldSchema::new("emb", DataType::VectorFp32)).unwrap();
        assert_eq!(schema.validate().unwrap_err().code(), StatusCode::InvalidArgument);

        let mut schema = CollectionSchema::new("bad");
        schema.add_field(FieldSchema::new("flags", DataType::ArrayBool)).unwrap();
        assert_eq!(schema.validate().unwrap_err().code(), StatusCode::NotSupported);
    }
}
