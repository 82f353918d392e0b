use crate::error::SteleError;
use crate::schema::registry::TableLayout;
use crate::schema::types::{CollectionKind, FieldType, TableDef, UdtDef};
use std::collections::HashSet;

/// A composite-type creation statement scheduled by the compiler. The order
/// of the pending list is the execution order: a type always appears after
/// every type it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingType {
    pub name: String,
    pub ddl: String,
}

/// Compiles declared field types into wire type names.
///
/// Resolution is a pure, synchronous pass: no statement is issued while it
/// runs. Composite types not yet present in `registered` are scheduled as
/// [`PendingType`] entries, dependency-first, for the caller to execute.
pub struct TypeResolver<'a> {
    registered: &'a HashSet<String>,
    scheduled: HashSet<String>,
    visiting: Vec<String>,
    pending: Vec<PendingType>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registered: &'a HashSet<String>) -> Self {
        Self {
            registered,
            scheduled: HashSet::new(),
            visiting: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Resolves a declared type at column or composite-field position.
    pub fn resolve(&mut self, ty: &FieldType) -> Result<String, SteleError> {
        match ty {
            FieldType::Scalar(scalar) => Ok(scalar.wire_name().to_string()),
            FieldType::Collection { kind, params } => self.collection_declaration(*kind, params),
            FieldType::Udt(def) => Ok(format!("frozen<{}>", self.udt_name(def)?)),
        }
    }

    /// Statements scheduled so far, in the order they must be executed.
    pub fn into_pending(self) -> Vec<PendingType> {
        self.pending
    }

    fn collection_declaration(
        &mut self,
        kind: CollectionKind,
        params: &[FieldType],
    ) -> Result<String, SteleError> {
        if params.is_empty() {
            return Err(SteleError::UnresolvedType(format!(
                "{} collection declared without element types",
                kind.wire_name()
            )));
        }

        let mut declared = Vec::with_capacity(params.len());
        for param in params {
            let declaration = match param {
                FieldType::Scalar(scalar) => scalar.wire_name().to_string(),
                // Nested collections and composite elements must be frozen.
                FieldType::Collection { kind, params } => {
                    format!("frozen<{}>", self.collection_declaration(*kind, params)?)
                }
                FieldType::Udt(def) => format!("frozen<{}>", self.udt_name(def)?),
            };
            declared.push(declaration);
        }

        let parameters = match kind {
            CollectionKind::Tuple => declared.join(", "),
            CollectionKind::List | CollectionKind::Set => declared.swap_remove(0),
        };
        Ok(format!("{}<{}>", kind.wire_name(), parameters))
    }

    fn udt_name(&mut self, def: &UdtDef) -> Result<String, SteleError> {
        if self.visiting.iter().any(|name| name == &def.name) {
            let mut path = self.visiting.join(" -> ");
            path.push_str(" -> ");
            path.push_str(&def.name);
            return Err(SteleError::CyclicType { path });
        }
        if self.registered.contains(&def.name) || self.scheduled.contains(&def.name) {
            return Ok(def.name.clone());
        }

        self.visiting.push(def.name.clone());
        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let declaration = self.resolve(&field.ty)?;
            fields.push(format!("{} {}", field.name, declaration));
        }
        self.visiting.pop();

        self.scheduled.insert(def.name.clone());
        self.pending.push(PendingType {
            name: def.name.clone(),
            ddl: format!(
                "CREATE TYPE IF NOT EXISTS {} ({})",
                def.name,
                fields.join(", ")
            ),
        });
        Ok(def.name.clone())
    }
}

/// Renders the table-creation statement for a declared table, resolving
/// every column type through `resolver` (which schedules any composite
/// types the table depends on).
pub fn table_declaration(
    def: &TableDef,
    resolver: &mut TypeResolver<'_>,
) -> Result<String, SteleError> {
    def.validate()?;

    let mut columns = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
        let mut column = format!("{} {}", field.name, resolver.resolve(&field.ty)?);
        if !field.constraints.is_empty() {
            column.push(' ');
            column.push_str(&field.constraints.join(" "));
        }
        columns.push(column);
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {}({}, PRIMARY KEY ({}))",
        def.name,
        columns.join(", "),
        TableLayout::from_table(def).key_clause()
    ))
}
