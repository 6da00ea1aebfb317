use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::errdata;
use crate::error::{Error, Result};

/// A primitive data type.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum DataType {
    /// A boolean: true or false.
    Boolean,
    /// A 64-bit signed integer.
    Integer,
    /// A 64-bit floating point number.
    Float,
    /// A UTF-8 encoded string.
    String,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::String => "STRING",
        })
    }
}

/// A primitive value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// An unknown value of unknown type.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A UTF-8 encoded string.
    String(String),
}

impl Value {
    /// Returns the value's datatype, or None for null values.
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Integer(_) => Some(DataType::Integer),
            Self::Float(_) => Some(DataType::Float),
            Self::String(_) => Some(DataType::String),
        }
    }

    /// Returns true if the value is NULL.
    pub fn is_null(&self) -> bool {
        *self == Self::Null
    }

    /// Compares two values for sorting. Unlike SQL comparison this is a total
    /// order: NULL sorts first, integers and floats compare numerically, and
    /// values of otherwise incomparable types are ordered by type.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
        }
    }

    /// Converts the value to the given datatype. NULL is kept as is. In strict
    /// mode only lossless conversions between numbers are allowed; otherwise
    /// values are converted the way MySQL does in non-strict mode, e.g. an
    /// unparseable string becomes 0 and an out-of-range number is clamped to
    /// the integer range.
    pub fn coerce(self, datatype: DataType, strict: bool) -> Result<Value> {
        use Value::*;
        Ok(match (self, datatype) {
            (Null, _) => Null,
            (v @ Boolean(_), DataType::Boolean) => v,
            (v @ Integer(_), DataType::Integer) => v,
            (v @ Float(_), DataType::Float) => v,
            (v @ String(_), DataType::String) => v,

            (Integer(i), DataType::Float) => Float(i as f64),
            (Float(f), DataType::Integer) if is_exact_integer(f) => Integer(f as i64),
            (Integer(i), DataType::Boolean) if i == 0 || i == 1 => Boolean(i == 1),

            (value, datatype) if strict => {
                return errdata!("invalid {datatype} value {}", value.to_sql())
            }

            (Boolean(b), DataType::Integer) => Integer(b as i64),
            (Boolean(b), DataType::Float) => Float(b as i64 as f64),
            (Boolean(b), DataType::String) => String(if b { "1" } else { "0" }.to_string()),
            (Integer(i), DataType::Boolean) => Boolean(i != 0),
            (Integer(i), DataType::String) => String(i.to_string()),
            (Float(f), DataType::Boolean) => Boolean(f != 0.0),
            (Float(f), DataType::Integer) => Integer(clamp_integer(f)),
            (Float(f), DataType::String) => String(f.to_string()),
            (String(s), DataType::Boolean) => {
                Boolean(s.trim().parse::<f64>().unwrap_or(0.0) != 0.0)
            }
            (String(s), DataType::Integer) => Integer(
                s.trim()
                    .parse::<i64>()
                    .or_else(|_| s.trim().parse::<f64>().map(clamp_integer))
                    .unwrap_or(0),
            ),
            (String(s), DataType::Float) => Float(s.trim().parse().unwrap_or(0.0)),
        })
    }

    /// Formats the value as a SQL literal, quoting strings.
    pub fn to_sql(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            value => value.to_string(),
        }
    }
}

/// Returns true if the float is whole and within the i64 range. i64::MAX as
/// f64 rounds up to 2^63, so the upper bound is exclusive.
fn is_exact_integer(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Rounds the float to the nearest integer, clamped to the i64 range. NaN
/// becomes 0.
fn clamp_integer(f: f64) -> i64 {
    f.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Integer(integer) => write!(f, "{integer}"),
            Self::Float(float) => write!(f, "{float}"),
            Self::String(string) => f.write_str(string),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Boolean(b) = value else { return errdata!("not boolean: {value}") };
        Ok(b)
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Float(f) = value else { return errdata!("not float: {value}") };
        Ok(f)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Integer(i) = value else { return errdata!("not integer: {value}") };
        Ok(i)
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let Value::String(s) = value else { return errdata!("not string: {value}") };
        Ok(s)
    }
}

/// A row, mapping column names to values in column order.
pub type Row = IndexMap<String, Value>;

/// A query result: an ordered sequence of rows.
pub type Dataset = Vec<Row>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    macro_rules! test_coerce {
        ( $( $name:ident: $value:expr, $datatype:expr, $strict:expr => $expect:expr, )* ) => {
        $(
            #[test]
            fn $name() {
                let value: Value = $value.into();
                assert_eq!(value.coerce($datatype, $strict).ok(), $expect);
            }
        )*
        };
    }

    test_coerce! {
        coerce_null: Value::Null, DataType::Integer, true => Some(Value::Null),
        coerce_same: 7i64, DataType::Integer, true => Some(Value::Integer(7)),
        coerce_int_float: 7i64, DataType::Float, true => Some(Value::Float(7.0)),
        coerce_whole_float_int: 7.0, DataType::Integer, true => Some(Value::Integer(7)),
        coerce_fract_float_strict: 7.5, DataType::Integer, true => None,
        coerce_fract_float_lax: 7.5, DataType::Integer, false => Some(Value::Integer(8)),
        coerce_string_int_strict: "42", DataType::Integer, true => None,
        coerce_string_int_lax: "42", DataType::Integer, false => Some(Value::Integer(42)),
        coerce_garbage_int_lax: "abc", DataType::Integer, false => Some(Value::Integer(0)),
        coerce_int_string_lax: 42i64, DataType::String, false => Some(Value::from("42")),
        coerce_bool_int_lax: true, DataType::Integer, false => Some(Value::Integer(1)),
        coerce_int_bool_strict: 1i64, DataType::Boolean, true => Some(Value::Boolean(true)),
        coerce_huge_float_strict: 1e30, DataType::Integer, true => None,
        coerce_edge_float_strict: i64::MAX as f64, DataType::Integer, true => None,
        coerce_min_float_strict: i64::MIN as f64, DataType::Integer, true =>
            Some(Value::Integer(i64::MIN)),
        coerce_huge_float_lax: 1e30, DataType::Integer, false => Some(Value::Integer(i64::MAX)),
        coerce_huge_negative_lax: -1e30, DataType::Integer, false =>
            Some(Value::Integer(i64::MIN)),
        coerce_huge_string_lax: "1e30", DataType::Integer, false =>
            Some(Value::Integer(i64::MAX)),
        coerce_nan_lax: f64::NAN, DataType::Integer, false => Some(Value::Integer(0)),
    }

    #[test]
    fn sort_cmp() {
        let mut values = vec![
            Value::from("b"),
            Value::Integer(3),
            Value::Null,
            Value::Float(2.5),
            Value::from("a"),
            Value::Boolean(true),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Boolean(true),
                Value::Float(2.5),
                Value::Integer(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn to_sql() {
        assert_eq!(Value::from("it's").to_sql(), "'it''s'");
        assert_eq!(Value::Integer(1).to_sql(), "1");
        assert_eq!(Value::Null.to_sql(), "NULL");
    }
}
