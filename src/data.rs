use std::{cmp::Ordering, fmt};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Separator used when several cells are folded into one hash key.
pub const KEY_SEPARATOR: &str = "\u{1f}";
const NULL_KEY: &str = "\u{0}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Eq for Value {}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Total ordering across variants: numbers compare numerically with each
    /// other, everything else falls back to the rendered text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.as_display().cmp(&other.as_display()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Orders cells with nulls first, as an ascending SQL sort does.
pub fn compare_cells(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b),
    }
}

/// Hash-friendly rendering of a cell. Integer and integral float cells render
/// identically so that `2009` and `2009.0` join.
pub fn key_fragment(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.as_display(),
        None => NULL_KEY.to_string(),
    }
}

pub fn composite_key<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    values
        .into_iter()
        .map(key_fragment)
        .join(KEY_SEPARATOR)
}

/// Casts a cell to a double. Anything that is not a finite number yields
/// `None`; a bad cell never aborts the pipeline.
pub fn coerce_float(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
    };
    parsed.is_finite().then_some(parsed)
}

pub fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        Value::Float(_) => None,
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
        };
        f.write_str(label)
    }
}

/// Narrows a column's type as cells are observed: integer, then float, then
/// string. Empty cells do not vote.
#[derive(Debug, Clone, Copy)]
pub struct TypeCandidate {
    integer: bool,
    float: bool,
    seen: bool,
}

impl Default for TypeCandidate {
    fn default() -> Self {
        Self {
            integer: true,
            float: true,
            seen: false,
        }
    }
}

impl TypeCandidate {
    pub fn observe(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        self.seen = true;
        if self.integer && trimmed.parse::<i64>().is_err() {
            self.integer = false;
        }
        if self.float && !trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
            self.float = false;
        }
    }

    pub fn decide(&self) -> ColumnType {
        if !self.seen {
            ColumnType::String
        } else if self.integer {
            ColumnType::Integer
        } else if self.float {
            ColumnType::Float
        } else {
            ColumnType::String
        }
    }
}

/// Parses a raw text cell according to an inferred column type. Empty text is
/// null; a cell that does not fit the type is kept as text.
pub fn parse_typed_value(raw: &str, ty: ColumnType) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    let trimmed = raw.trim();
    let parsed = match ty {
        ColumnType::Integer => trimmed.parse().ok().map(Value::Integer),
        ColumnType::Float => trimmed.parse().ok().map(Value::Float),
        ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Boolean(true)),
            "false" => Some(Value::Boolean(false)),
            _ => None,
        },
        ColumnType::String => None,
    };
    Some(parsed.unwrap_or_else(|| Value::String(raw.to_string())))
}

pub fn type_of(value: &Value) -> ColumnType {
    match value {
        Value::String(_) => ColumnType::String,
        Value::Integer(_) => ColumnType::Integer,
        Value::Float(_) => ColumnType::Float,
        Value::Boolean(_) => ColumnType::Boolean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_float_accepts_numbers_and_numeric_text() {
        assert_eq!(coerce_float(Some(&Value::from("237000000"))), Some(237e6));
        assert_eq!(coerce_float(Some(&Value::from(" 7.5 "))), Some(7.5));
        assert_eq!(coerce_float(Some(&Value::Integer(12))), Some(12.0));
    }

    #[test]
    fn coerce_float_nulls_bad_cells() {
        assert_eq!(coerce_float(Some(&Value::from("$1,000"))), None);
        assert_eq!(coerce_float(Some(&Value::from(""))), None);
        assert_eq!(coerce_float(Some(&Value::from("NaN"))), None);
        assert_eq!(coerce_float(None), None);
    }

    #[test]
    fn coerce_int_handles_integral_floats() {
        assert_eq!(coerce_int(Some(&Value::Float(2009.0))), Some(2009));
        assert_eq!(coerce_int(Some(&Value::from("2009"))), Some(2009));
        assert_eq!(coerce_int(Some(&Value::Float(2009.5))), None);
    }

    #[test]
    fn key_fragment_unifies_integral_numbers() {
        assert_eq!(
            key_fragment(Some(&Value::Integer(2009))),
            key_fragment(Some(&Value::Float(2009.0)))
        );
        assert_ne!(key_fragment(None), key_fragment(Some(&Value::from(""))));
    }

    #[test]
    fn type_candidate_widens_to_float_then_string() {
        let mut candidate = TypeCandidate::default();
        candidate.observe("1");
        candidate.observe("");
        assert_eq!(candidate.decide(), ColumnType::Integer);
        candidate.observe("2.5");
        assert_eq!(candidate.decide(), ColumnType::Float);
        candidate.observe("tt0001");
        assert_eq!(candidate.decide(), ColumnType::String);
    }

    #[test]
    fn compare_cells_orders_nulls_first_and_mixes_numbers() {
        assert_eq!(compare_cells(None, Some(&Value::Integer(0))), Ordering::Less);
        assert_eq!(
            compare_cells(Some(&Value::Integer(2)), Some(&Value::Float(1.5))),
            Ordering::Greater
        );
    }
}
