//! Schema catalog: table names, columns, primary and foreign keys per entity.
//!
//! The catalog is built once at startup, either by registering
//! [`EntityDescriptor`]s in code or by loading a TOML document:
//!
//! ```toml
//! [[entities]]
//! name = "Order"
//! table = "Orders"
//!
//! [[entities.fields]]
//! name = "Id"
//! type = "int"
//!
//! [[entities.fields]]
//! name = "UserId"
//! type = "int"
//! foreign_key = "User"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{QueryError, SqbResult};

/// Primary-key field name used when an entity does not declare one.
pub const DEFAULT_PRIMARY_KEY: &str = "Id";

/// Logical type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    BigInt,
    SmallInt,
    TinyInt,
    Text,
    DateTime,
    Date,
    Bool,
    Decimal,
    Float,
    Double,
    Uuid,
}

impl FromStr for FieldType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "int" | "i32" | "integer" => FieldType::Int,
            "bigint" | "i64" | "long" => FieldType::BigInt,
            "smallint" | "i16" | "short" => FieldType::SmallInt,
            "tinyint" | "u8" | "byte" => FieldType::TinyInt,
            "text" | "string" | "str" => FieldType::Text,
            "datetime" | "timestamp" => FieldType::DateTime,
            "date" => FieldType::Date,
            "bool" | "boolean" => FieldType::Bool,
            "decimal" => FieldType::Decimal,
            "float" | "f32" => FieldType::Float,
            "double" | "f64" => FieldType::Double,
            "uuid" | "guid" => FieldType::Uuid,
            _ => return Err(QueryError::UnmappedType(s.to_string())),
        };
        Ok(ty)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Int => "int",
            FieldType::BigInt => "bigint",
            FieldType::SmallInt => "smallint",
            FieldType::TinyInt => "tinyint",
            FieldType::Text => "text",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::Bool => "bool",
            FieldType::Decimal => "decimal",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// One scalar field of an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub column: String,
    pub field_type: FieldType,
    /// Target entity when this field is a foreign key.
    pub foreign_key: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            field_type,
            foreign_key: None,
        }
    }

    /// Map the field to a differently named column.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Declare the field as a foreign key to `target`.
    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.foreign_key = Some(target.into());
        self
    }
}

/// Read-only description of one entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub table: String,
    pub primary_key: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// New entity whose table name defaults to the entity name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            primary_key: None,
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_field(FieldDescriptor::new(name, field_type))
    }

    pub fn foreign_key(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        target: impl Into<String>,
    ) -> Self {
        self.with_field(FieldDescriptor::new(name, field_type).references(target))
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Primary-key field name, falling back to [`DEFAULT_PRIMARY_KEY`].
    pub fn primary_key_field(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    /// Column holding the primary key.
    pub fn primary_key_column(&self) -> &str {
        let pk = self.primary_key_field();
        self.get_field(pk).map(|f| f.column.as_str()).unwrap_or(pk)
    }
}

/// Metadata provider consumed by the query compiler.
pub trait SchemaCatalog {
    /// Look up an entity by name.
    fn entity(&self, name: &str) -> Option<&EntityDescriptor>;

    fn describe(&self, name: &str) -> SqbResult<&EntityDescriptor> {
        self.entity(name)
            .ok_or_else(|| QueryError::UnknownEntity(name.to_string()))
    }

    fn table_name(&self, entity: &str) -> SqbResult<&str> {
        Ok(self.describe(entity)?.table.as_str())
    }

    fn primary_key_field(&self, entity: &str) -> SqbResult<&str> {
        Ok(self.describe(entity)?.primary_key_field())
    }

    /// Target entity of a foreign-key field; `None` if the field is missing
    /// or declares no foreign key.
    fn foreign_key_target(&self, entity: &str, field: &str) -> SqbResult<Option<&str>> {
        Ok(self
            .describe(entity)?
            .get_field(field)
            .and_then(|f| f.foreign_key.as_deref()))
    }

    /// Scalar fields in declaration order.
    fn scalar_columns(&self, entity: &str) -> SqbResult<&[FieldDescriptor]> {
        Ok(self.describe(entity)?.fields.as_slice())
    }

    /// Resolve a field of an entity.
    fn column_of(&self, entity: &str, field: &str) -> SqbResult<&FieldDescriptor> {
        self.describe(entity)?
            .get_field(field)
            .ok_or_else(|| QueryError::unresolved(entity, field, "no such field"))
    }
}

/// In-memory schema catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: BTreeMap<String, EntityDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a validated catalog from a set of descriptors.
    pub fn from_entities(entities: impl IntoIterator<Item = EntityDescriptor>) -> SqbResult<Self> {
        let mut catalog = Self::new();
        for entity in entities {
            catalog.register(entity)?;
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Register one entity. Duplicate names are rejected.
    pub fn register(&mut self, entity: EntityDescriptor) -> SqbResult<()> {
        if self.entities.contains_key(&entity.name) {
            return Err(QueryError::Config(format!(
                "entity '{}' is registered twice",
                entity.name
            )));
        }
        tracing::debug!("Registered entity {} -> [{}]", entity.name, entity.table);
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Check that every foreign key targets a registered entity.
    pub fn validate(&self) -> SqbResult<()> {
        for entity in self.entities.values() {
            for field in &entity.fields {
                if let Some(target) = &field.foreign_key {
                    if !self.entities.contains_key(target) {
                        return Err(QueryError::Config(format!(
                            "foreign key {}.{} targets unknown entity '{}'",
                            entity.name, field.name, target
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Parse a catalog from a TOML document.
    pub fn from_toml_str(content: &str) -> SqbResult<Self> {
        let doc: CatalogDocument = toml::from_str(content)
            .map_err(|e| QueryError::Config(format!("Failed to parse catalog: {}", e)))?;

        let mut entities = Vec::with_capacity(doc.entities.len());
        for entity in doc.entities {
            entities.push(entity.into_descriptor()?);
        }
        Self::from_entities(entities)
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SqbResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded {} entities from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }
}

impl SchemaCatalog for Catalog {
    fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    entities: Vec<EntityDocument>,
}

#[derive(Debug, Deserialize)]
struct EntityDocument {
    name: String,
    table: Option<String>,
    primary_key: Option<String>,
    #[serde(default)]
    fields: Vec<FieldDocument>,
}

#[derive(Debug, Deserialize)]
struct FieldDocument {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    column: Option<String>,
    foreign_key: Option<String>,
}

impl EntityDocument {
    fn into_descriptor(self) -> SqbResult<EntityDescriptor> {
        let mut entity = EntityDescriptor::new(self.name);
        if let Some(table) = self.table {
            entity = entity.table(table);
        }
        entity.primary_key = self.primary_key;

        for doc in self.fields {
            let field_type = doc.field_type.parse::<FieldType>()?;
            let mut field = FieldDescriptor::new(doc.name, field_type);
            if let Some(column) = doc.column {
                field = field.column(column);
            }
            field.foreign_key = doc.foreign_key;
            entity = entity.with_field(field);
        }
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[[entities]]
name = "User"
table = "Users"

[[entities.fields]]
name = "Id"
type = "int"

[[entities.fields]]
name = "Username"
type = "string"
column = "user_name"

[[entities]]
name = "Order"
table = "Orders"

[[entities.fields]]
name = "Id"
type = "int"

[[entities.fields]]
name = "UserId"
type = "int"
foreign_key = "User"
"#;

    #[test]
    fn test_load_from_toml() {
        let catalog = Catalog::from_toml_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.table_name("Order").unwrap(), "Orders");
        assert_eq!(catalog.primary_key_field("User").unwrap(), "Id");
        assert_eq!(
            catalog.foreign_key_target("Order", "UserId").unwrap(),
            Some("User")
        );
        assert_eq!(catalog.foreign_key_target("Order", "Id").unwrap(), None);
        assert_eq!(catalog.column_of("User", "Username").unwrap().column, "user_name");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let doc = r#"
[[entities]]
name = "Blob"

[[entities.fields]]
name = "Data"
type = "varbinary"
"#;
        let err = Catalog::from_toml_str(doc).unwrap_err();
        assert!(matches!(err, QueryError::UnmappedType(ref t) if t == "varbinary"));
    }

    #[test]
    fn test_dangling_foreign_key_is_rejected() {
        let err = Catalog::from_entities([EntityDescriptor::new("Order")
            .field("Id", FieldType::Int)
            .foreign_key("UserId", FieldType::Int, "User")])
        .unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_duplicate_entity_is_rejected() {
        let mut catalog = Catalog::new();
        catalog.register(EntityDescriptor::new("User")).unwrap();
        assert!(catalog.register(EntityDescriptor::new("User")).is_err());
    }

    #[test]
    fn test_primary_key_column_follows_mapping() {
        let entity = EntityDescriptor::new("Tag")
            .primary_key("TagId")
            .with_field(FieldDescriptor::new("TagId", FieldType::Int).column("tag_id"));
        assert_eq!(entity.primary_key_column(), "tag_id");
        assert_eq!(EntityDescriptor::new("Bare").primary_key_column(), "Id");
    }

    #[test]
    fn test_unknown_entity() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.table_name("Ghost"),
            Err(QueryError::UnknownEntity(_))
        ));
    }
}
