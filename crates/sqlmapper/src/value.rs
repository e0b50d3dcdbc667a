//! Dialect-neutral SQL values.
//!
//! [`Value`] is what the renderers inline into SQL text and what drivers
//! receive as positional arguments.

use crate::error::DbResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::Value as Json;

/// JSON form of a datetime, readable by chrono's serde impls.
pub(crate) const DATETIME_TEXT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single SQL argument or result cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
    Json(Json),
    List(Vec<Value>),
}

impl Value {
    /// Convert any serializable value through its JSON form.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> DbResult<Self> {
        Ok(Value::from(serde_json::to_value(value)?))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// JSON form of the value, used when decoding rows.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(v) => Json::from(*v),
            Value::UInt(v) => Json::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::DateTime(dt) => Json::String(dt.format(DATETIME_TEXT).to_string()),
            Value::Bytes(b) => Json::Array(b.iter().map(|v| Json::from(*v)).collect()),
            Value::Json(v) => v.clone(),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(s) => serializer.serialize_str(s),
            Value::DateTime(dt) => serializer.collect_str(&dt.format(DATETIME_TEXT)),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Json(v) => v.serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        Value::from(&value)
    }
}

impl From<&Json> for Value {
    fn from(value: &Json) -> Self {
        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::Int(v)
                } else if let Some(v) = n.as_u64() {
                    Value::UInt(v)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            Json::Object(_) => Value::Json(value.clone()),
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

impl_from_int!(Int, i64: i8, i16, i32, i64);
impl_from_int!(UInt, u64: u8, u16, u32, u64);
impl_from_int!(Float, f64: f32, f64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::DateTime(value.and_hms_opt(0, 0, 0).unwrap_or_default())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(value: DateTime<Tz>) -> Self {
        Value::DateTime(value.naive_utc())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(value: uuid::Uuid) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Value {
    /// Build a list value, e.g. for `IN (...)` or the `list` helper.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Build a positional argument list from heterogeneous values.
///
/// ```ignore
/// let args = sqlmapper::args![1_i64, "alice", None::<String>];
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::Value::from($value)),+]
    };
}
