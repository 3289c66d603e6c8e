use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

// ── Data type ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Timestamp,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Value ──

/// A single typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// The type of this value, `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Int(_) => Some(DataType::Int),
            Self::Long(_) => Some(DataType::Long),
            Self::Float(_) => Some(DataType::Float),
            Self::Double(_) => Some(DataType::Double),
            Self::String(_) => Some(DataType::String),
            Self::Timestamp(_) => Some(DataType::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Order two values. Integers compare with integers and floats with floats;
    /// any other mix, a null, or a NaN yields `None`.
    pub fn try_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Long(a), Self::Long(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Long(b)) => Some(i64::from(*a).cmp(b)),
            (Self::Long(a), Self::Int(b)) => Some(a.cmp(&i64::from(*b))),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Double(b)) => f64::from(*a).partial_cmp(b),
            (Self::Double(a), Self::Float(b)) => a.partial_cmp(&f64::from(*b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality for change detection. Unlike `==`, a NaN equals a NaN of the
    /// same variant, so replaying an unchanged record stays a no-op.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Double(a), Self::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    /// Coerce a JSON value into `data_type`.
    pub fn from_json(json: &serde_json::Value, data_type: DataType) -> Result<Value> {
        if json.is_null() {
            return Ok(Self::Null);
        }
        let coerced = match data_type {
            DataType::Boolean => json.as_bool().map(Self::Boolean),
            DataType::Int => json
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Self::Int),
            DataType::Long => json.as_i64().map(Self::Long),
            DataType::Float => json.as_f64().map(|n| Self::Float(n as f32)),
            DataType::Double => json.as_f64().map(Self::Double),
            DataType::String => json.as_str().map(|s| Self::String(s.to_string())),
            DataType::Timestamp => json
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|ts| Self::Timestamp(ts.with_timezone(&Utc))),
        };
        coerced.ok_or_else(|| Error::malformed(format!("cannot read {json} as {data_type}")))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::Number((*n).into()),
            Self::Long(n) => serde_json::Value::Number((*n).into()),
            Self::Float(n) => serde_json::Number::from_f64(f64::from(*n))
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Double(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Timestamp(ts) => {
                serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Double(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Timestamp(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

// ── Schema ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Ordered, uniquely named fields shared by every record of one set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::malformed(format!(
                    "duplicate field \"{}\" in schema",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
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

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

// ── Record ──

/// A row of typed values conforming to its schema. Conformance is checked once,
/// at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(Error::malformed(format!(
                "record has {} values but its schema has {} fields",
                values.len(),
                schema.len()
            )));
        }
        for (field, value) in schema.fields().iter().zip(&values) {
            check_conforms(field, value)?;
        }
        Ok(Self { schema, values })
    }

    /// Build a record from a JSON object, coercing each field to its schema type.
    /// Fields absent from the object are read as null.
    pub fn from_json(
        schema: Arc<Schema>,
        json: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let values = schema
            .fields()
            .iter()
            .map(|f| {
                json.get(&f.name)
                    .map(|v| Value::from_json(v, f.data_type))
                    .unwrap_or(Ok(Value::Null))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(schema, values)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    /// Like [`Record::get`], but a missing field is malformed input.
    pub fn require(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| Error::malformed(format!("record has no field \"{name}\"")))
    }

    /// New record holding only `names`, in that order.
    pub fn project(&self, names: &[String]) -> Result<Record> {
        let mut fields = Vec::with_capacity(names.len());
        let mut values = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .schema
                .index_of(name)
                .ok_or_else(|| Error::malformed(format!("record has no field \"{name}\"")))?;
            fields.push(self.schema.fields()[idx].clone());
            values.push(self.values[idx].clone());
        }
        Ok(Record {
            schema: Arc::new(Schema::new(fields)?),
            values,
        })
    }

    /// New record with one extra trailing field.
    pub fn append(&self, field: Field, value: Value) -> Result<Record> {
        if self.schema.contains(&field.name) {
            return Err(Error::malformed(format!(
                "record already has a field \"{}\"",
                field.name
            )));
        }
        check_conforms(&field, &value)?;
        let mut fields = self.schema.fields().to_vec();
        fields.push(field);
        let mut values = self.values.clone();
        values.push(value);
        Ok(Record {
            schema: Arc::new(Schema { fields }),
            values,
        })
    }

    /// JSON object for a downstream sink. Keys follow the schema's field order.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(f, v)| (f.name.clone(), v.to_json()))
            .collect()
    }
}

fn check_conforms(field: &Field, value: &Value) -> Result<()> {
    match value.data_type() {
        None if field.nullable => Ok(()),
        None => Err(Error::malformed(format!(
            "field \"{}\" is not nullable but holds null",
            field.name
        ))),
        Some(t) if t == field.data_type => Ok(()),
        Some(t) => Err(Error::malformed(format!(
            "field \"{}\" is declared {} but holds a {} value",
            field.name, field.data_type, t
        ))),
    }
}

// ── Key ──

/// The projection of a record onto its key fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Key(pub Vec<Value>);

impl Key {
    pub fn of(record: &Record, key_fields: &[String]) -> Result<Key> {
        key_fields
            .iter()
            .map(|name| record.require(name).cloned())
            .collect::<Result<Vec<_>>>()
            .map(Key)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "({})", parts.join(", "))
    }
}

// ── Event time ──

/// Comparable forms of a record's timestamp fields, in configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTime(pub Vec<Value>);

impl EventTime {
    /// Lexicographic comparison. Fails when a position holds values that
    /// cannot be ordered against each other.
    pub fn compare(&self, other: &EventTime) -> Result<Ordering> {
        for (a, b) in self.0.iter().zip(&other.0) {
            let ord = a.try_cmp(b).ok_or_else(|| {
                Error::malformed(format!("event time values {a} and {b} are not comparable"))
            })?;
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(self.0.len().cmp(&other.0.len()))
    }
}
