use crate::error::SteleError;
use crate::schema::types::ScalarType;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// A runtime value carried through the gateway: record fields, bound
/// parameters and fetched columns all use this closed set.
///
/// `Tuple` is the positional form a nested [`Record`] flattens into for
/// binding against a composite-type literal; callers normally never build
/// one by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Boolean(bool),
    Timestamp(i64),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Record(Record),
    Null,
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Record(_) => "record",
            Value::Null => "null",
        }
    }

    /// Coerces the value through a key column's declared scalar type before
    /// it is used as a predicate parameter. Textual forms parse into the
    /// declared type; anything else must already match it.
    pub fn coerce(self, ty: ScalarType) -> Result<Value, SteleError> {
        match (self, ty) {
            (v @ Value::Int(_), ScalarType::Int) => Ok(v),
            (Value::Text(s), ScalarType::Int) => s
                .trim()
                .parse()
                .map(Value::Int)
                .map_err(|err| coercion_error("text", ty, &err.to_string())),
            (v @ Value::Float(_), ScalarType::Float) => Ok(v),
            (Value::Int(v), ScalarType::Float) => Ok(Value::Float(v as f64)),
            (Value::Text(s), ScalarType::Float) => s
                .trim()
                .parse()
                .map(Value::Float)
                .map_err(|err| coercion_error("text", ty, &err.to_string())),
            (v @ Value::Text(_), ScalarType::Text) => Ok(v),
            (v @ Value::Uuid(_), ScalarType::Uuid) => Ok(v),
            (Value::Text(s), ScalarType::Uuid) => Uuid::parse_str(s.trim())
                .map(Value::Uuid)
                .map_err(|err| coercion_error("text", ty, &err.to_string())),
            (v @ Value::Boolean(_), ScalarType::Boolean) => Ok(v),
            (v @ Value::Timestamp(_), ScalarType::Timestamp) => Ok(v),
            (Value::Int(v), ScalarType::Timestamp) => Ok(Value::Timestamp(v)),
            (other, ty) => Err(coercion_error(other.kind_name(), ty, "no conversion")),
        }
    }
}

fn coercion_error(from: &str, ty: ScalarType, reason: &str) -> SteleError {
    SteleError::Schema(format!(
        "cannot coerce {from} value into {} key column: {reason}",
        ty.wire_name()
    ))
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Uuid(v) => serializer.serialize_str(&v.to_string()),
            Value::Boolean(v) => serializer.serialize_bool(*v),
            Value::Timestamp(v) => serializer.serialize_i64(*v),
            Value::List(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(rec) => rec.serialize(serializer),
            Value::Null => serializer.serialize_unit(),
        }
    }
}

/// An ordered field map. Field order is significant: it is the order fields
/// appear in generated SET clauses and in flattened composite literals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field, replacing an existing one in place. Names stay unique.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Removes a field and returns its value, preserving the order of the
    /// remaining fields.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Flattens a value into the positional shape a prepared statement binds:
/// a nested record becomes a tuple of its field values in field order,
/// recursively; a non-empty list whose first element is a record is
/// flattened element-wise; everything else passes through unchanged.
pub fn flatten_value(value: Value) -> Value {
    match value {
        Value::Record(record) => Value::Tuple(
            record
                .into_fields()
                .into_iter()
                .map(|(_, v)| flatten_value(v))
                .collect(),
        ),
        Value::List(items) if matches!(items.first(), Some(Value::Record(_))) => {
            Value::List(items.into_iter().map(flatten_value).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{flatten_value, Record, Value};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn nested_record() -> Record {
        Record::new()
            .with("code", Value::Int(1))
            .with("label", Value::Text("running".into()))
    }

    #[test]
    fn record_preserves_declaration_order_and_replaces_in_place() {
        let mut record = Record::new()
            .with("a", Value::Int(1))
            .with("b", Value::Int(2))
            .with("c", Value::Int(3));
        record.insert("b", Value::Int(20));
        assert_eq!(record.field_names(), vec!["a", "b", "c"]);
        assert_eq!(record.get("b"), Some(&Value::Int(20)));

        assert_eq!(record.remove("b"), Some(Value::Int(20)));
        assert_eq!(record.field_names(), vec!["a", "c"]);
        assert_eq!(record.remove("b"), None);
    }

    #[test]
    fn flatten_turns_nested_records_into_positional_tuples() {
        let flattened = flatten_value(Value::Record(nested_record()));
        assert_eq!(
            flattened,
            Value::Tuple(vec![Value::Int(1), Value::Text("running".into())])
        );
    }

    #[test]
    fn flatten_handles_lists_of_records_element_wise() {
        let value = Value::List(vec![
            Value::Record(nested_record()),
            Value::Record(nested_record().with("code", Value::Int(2))),
        ]);
        let flattened = flatten_value(value);
        assert_eq!(
            flattened,
            Value::List(vec![
                Value::Tuple(vec![Value::Int(1), Value::Text("running".into())]),
                Value::Tuple(vec![Value::Int(2), Value::Text("running".into())]),
            ])
        );
    }

    #[test]
    fn flatten_passes_scalar_lists_through() {
        let value = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(flatten_value(value.clone()), value);
        assert_eq!(flatten_value(Value::Null), Value::Null);
    }

    #[test]
    fn record_serializes_as_a_json_document() {
        let id = Uuid::new_v4();
        let record = Record::new()
            .with("id", Value::Uuid(id))
            .with("status", Value::Record(nested_record()))
            .with("tags", Value::List(vec![Value::Text("smoke".into())]));
        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["id"], serde_json::json!(id.to_string()));
        assert_eq!(json["status"]["label"], serde_json::json!("running"));
        assert_eq!(json["tags"][0], serde_json::json!("smoke"));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Value::Int),
            any::<bool>().prop_map(Value::Boolean),
            "\\PC{0,16}".prop_map(Value::Text),
            Just(Value::Null),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
                prop::collection::vec(("[a-z]{1,8}", inner), 0..4)
                    .prop_map(|fields| Value::Record(fields.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn flattening_is_pure(value in arb_value()) {
            let first = flatten_value(value.clone());
            let second = flatten_value(value);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn flattened_records_keep_arity(fields in prop::collection::vec(("[a-z]{1,8}", arb_value()), 0..6)) {
            let record: Record = fields.into_iter().collect();
            let arity = record.len();
            match flatten_value(Value::Record(record)) {
                Value::Tuple(items) => prop_assert_eq!(items.len(), arity),
                other => prop_assert!(false, "expected tuple, got {:?}", other),
            }
        }
    }
}
