//! MySQL row to JSON conversion
//!
//! Values are decoded by the column's reported type name. Types without a
//! dedicated mapping, and typed decodes that fail (zero dates, negative
//! TIME), fall back to the raw column bytes: UTF-8 text when valid,
//! base64 otherwise.

use crate::error::DatabaseError;
use crate::types::Row;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::mysql::{MySql, MySqlRow};
use sqlx::{Column, Decode, Row as _, Type, TypeInfo};

/// Column names of a row in select order
pub fn column_names(row: &MySqlRow) -> Vec<String> {
    row.columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

/// Convert a row to an ordered column -> value map
///
/// # Errors
/// Returns error if a column of a mapped type cannot be decoded
pub fn row_to_json(row: &MySqlRow) -> Result<Row, DatabaseError> {
    let mut map = Row::new();

    for column in row.columns() {
        let ordinal = column.ordinal();
        let name = column.name();
        let type_name = column.type_info().name();

        let value = match type_name {
            "BOOLEAN" => typed::<bool>(row, ordinal, name, type_name)?.map(Value::Bool),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                typed::<i64>(row, ordinal, name, type_name)?.map(Value::from)
            }
            t if t.ends_with(" UNSIGNED") && !t.starts_with("DECIMAL") => {
                typed::<u64>(row, ordinal, name, type_name)?.map(Value::from)
            }
            "DOUBLE" => typed::<f64>(row, ordinal, name, type_name)?.map(float_value),
            // f32 -> f64 widening would leak representation noise
            "FLOAT" => typed::<f32>(row, ordinal, name, type_name)?
                .map(|v| float_value(v.to_string().parse().unwrap_or(f64::from(v)))),
            "DECIMAL" | "DECIMAL UNSIGNED" => match row.try_get::<Option<Decimal>, _>(ordinal) {
                Ok(v) => v.map(|d| Value::String(d.to_string())),
                Err(_) => raw(row, ordinal),
            },
            "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" => typed::<String>(row, ordinal, name, type_name)?.map(Value::String),
            "JSON" => typed::<String>(row, ordinal, name, type_name)?
                .map(|s| serde_json::from_str(&s).unwrap_or(Value::String(s))),
            "DATE" => match row.try_get::<Option<NaiveDate>, _>(ordinal) {
                Ok(v) => v.map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
                Err(_) => raw(row, ordinal),
            },
            "DATETIME" => match row.try_get::<Option<NaiveDateTime>, _>(ordinal) {
                Ok(v) => v.map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
                Err(_) => raw(row, ordinal),
            },
            "TIMESTAMP" => match row.try_get::<Option<DateTime<Utc>>, _>(ordinal) {
                Ok(v) => v.map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
                Err(_) => raw(row, ordinal),
            },
            _ => raw(row, ordinal),
        };

        map.insert(name.to_string(), value.unwrap_or(Value::Null));
    }

    Ok(map)
}

fn typed<'r, T>(
    row: &'r MySqlRow,
    ordinal: usize,
    name: &str,
    type_name: &str,
) -> Result<Option<T>, DatabaseError>
where
    T: Decode<'r, MySql> + Type<MySql>,
{
    row.try_get::<Option<T>, _>(ordinal).map_err(|e| {
        DatabaseError::QueryError(format!(
            "Failed to extract column '{}' as {}: {}",
            name, type_name, e
        ))
    })
}

fn raw(row: &MySqlRow, ordinal: usize) -> Option<Value> {
    match row.try_get_unchecked::<Option<Vec<u8>>, _>(ordinal) {
        Ok(bytes) => bytes.map(bytes_value),
        Err(e) => {
            log::debug!("Column {} not decodable as bytes: {}", ordinal, e);
            None
        }
    }
}

/// UTF-8 text when valid, base64 otherwise
pub fn bytes_value(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(e) => Value::String(BASE64.encode(e.into_bytes())),
    }
}

/// NaN and infinities have no JSON number form
fn float_value(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}
