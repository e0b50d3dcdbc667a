//! Result rows and decoding.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

/// One result row: column names and values in select order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row; `columns` and `values` must have the same length.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
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

    /// Value of a column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Decode a single column.
    pub fn try_get<T: DeserializeOwned>(&self, column: &str) -> DbResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| DbError::decode(column, "column not found"))?;
        serde_json::from_value(value.to_json()).map_err(|e| DbError::decode(column, e.to_string()))
    }

    /// Column name → JSON value object.
    pub fn to_json(&self) -> Json {
        let map: Map<String, Json> = self
            .columns
            .iter()
            .cloned()
            .zip(self.values.iter().map(Value::to_json))
            .collect();
        Json::Object(map)
    }

    /// Decode the row into `T`.
    ///
    /// A single-column row is first tried as a scalar (`SELECT COUNT(*)`
    /// into `i64`), then as an object keyed by column name.
    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<T> {
        if let [value] = self.values.as_slice() {
            if let Ok(decoded) = serde_json::from_value(value.to_json()) {
                return Ok(decoded);
            }
        }
        serde_json::from_value(self.to_json()).map_err(|e| {
            let column = self.columns.join(",");
            DbError::decode(column, e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
        email: Option<String>,
    }

    #[test]
    fn decode_struct() {
        let row = Row::from_pairs([
            ("id", Value::from(1)),
            ("name", Value::from("bob")),
            ("email", Value::Null),
        ]);
        let user: User = row.decode().unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "bob".into(),
                email: None
            }
        );
    }

    #[test]
    fn decode_scalar() {
        let row = Row::from_pairs([("count", Value::from(42))]);
        assert_eq!(row.decode::<i64>().unwrap(), 42);
    }

    #[test]
    fn decode_single_field_struct() {
        #[derive(Debug, Deserialize)]
        struct Count {
            count: i64,
        }
        let row = Row::from_pairs([("count", Value::from(42))]);
        assert_eq!(row.decode::<Count>().unwrap().count, 42);
    }

    #[test]
    fn decode_error_names_columns() {
        let row = Row::from_pairs([("id", Value::from("x")), ("name", Value::from("y"))]);
        match row.decode::<User>() {
            Err(DbError::Decode { column, .. }) => assert_eq!(column, "id,name"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn try_get_by_name() {
        let row = Row::from_pairs([("id", Value::from(7))]);
        assert_eq!(row.try_get::<i64>("id").unwrap(), 7);
        assert!(row.try_get::<i64>("missing").is_err());
    }
}
