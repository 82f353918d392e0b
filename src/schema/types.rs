use crate::error::SteleError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The closed set of scalar column types. Extending it means adding a
/// variant and its wire name here; nothing is ever inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int,
    Float,
    Text,
    Uuid,
    Boolean,
    Timestamp,
}

impl ScalarType {
    pub fn wire_name(self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Text => "varchar",
            ScalarType::Uuid => "uuid",
            ScalarType::Boolean => "boolean",
            ScalarType::Timestamp => "timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Set,
    Tuple,
}

impl CollectionKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Set => "set",
            CollectionKind::Tuple => "tuple",
        }
    }
}

/// A declared field type: scalar, collection of further declared types, or
/// a reference to a composite type. Matched exhaustively everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    Collection {
        kind: CollectionKind,
        params: Vec<FieldType>,
    },
    Udt(Arc<UdtDef>),
}

impl FieldType {
    pub fn list(element: FieldType) -> Self {
        FieldType::Collection {
            kind: CollectionKind::List,
            params: vec![element],
        }
    }

    pub fn set(element: FieldType) -> Self {
        FieldType::Collection {
            kind: CollectionKind::Set,
            params: vec![element],
        }
    }

    pub fn tuple(params: Vec<FieldType>) -> Self {
        FieldType::Collection {
            kind: CollectionKind::Tuple,
            params,
        }
    }

    pub fn udt(def: UdtDef) -> Self {
        FieldType::Udt(Arc::new(def))
    }
}

impl From<ScalarType> for FieldType {
    fn from(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }
}

impl From<Arc<UdtDef>> for FieldType {
    fn from(def: Arc<UdtDef>) -> Self {
        FieldType::Udt(def)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    None,
    Partition,
    Clustering,
}

/// One declared field: name, type, verbatim schema constraints and its role
/// in the primary key. Declaration order is significant and preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub constraints: Vec<String>,
    pub key: KeyRole,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            constraints: Vec::new(),
            key: KeyRole::None,
        }
    }

    /// Appends a constraint rendered verbatim after the column type.
    pub fn constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn partition_key(mut self) -> Self {
        self.key = KeyRole::Partition;
        self
    }

    pub fn clustering_key(mut self) -> Self {
        self.key = KeyRole::Clustering;
        self
    }
}

/// A named composite type: an ordered field list that may reference other
/// composite types. References must form a DAG; cycles are rejected at
/// registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl UdtDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.fields.push(FieldDef::new(name, ty));
        self
    }
}

/// A declared table shape: an ordered field list with key roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn partition_key(mut self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.fields.push(FieldDef::new(name, ty).partition_key());
        self
    }

    pub fn clustering_key(mut self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.fields.push(FieldDef::new(name, ty).clustering_key());
        self
    }

    pub fn column(mut self, name: impl Into<String>, ty: impl Into<FieldType>) -> Self {
        self.fields.push(FieldDef::new(name, ty));
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn validate(&self) -> Result<(), SteleError> {
        if self.fields.is_empty() {
            return Err(SteleError::Schema(format!(
                "table '{}' must declare at least one field",
                self.name
            )));
        }

        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SteleError::Schema(format!(
                    "table '{}' declares field '{}' more than once",
                    self.name, field.name
                )));
            }
        }

        let mut partition_keys = 0usize;
        for field in &self.fields {
            if field.key == KeyRole::None {
                continue;
            }
            if field.key == KeyRole::Partition {
                partition_keys += 1;
            }
            if !matches!(field.ty, FieldType::Scalar(_)) {
                return Err(SteleError::Schema(format!(
                    "table '{}' key field '{}' must be a scalar type",
                    self.name, field.name
                )));
            }
        }
        if partition_keys == 0 {
            return Err(SteleError::Schema(format!(
                "table '{}' must declare at least one partition key field",
                self.name
            )));
        }

        Ok(())
    }
}
