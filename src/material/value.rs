//! Parameter values carried through standardization.

use std::fmt;

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shader parameter value.
///
/// Serialized through its natural JSON form: scalars stay scalars, vectors
/// and colors become number arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum ParamValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i32),
    /// Float value.
    Float(f32),
    /// Double value.
    Double(f64),
    /// String value.
    String(String),
    /// Vec2 value.
    Vec2(Vec2),
    /// Vec3 value.
    Vec3(Vec3),
    /// Vec4 value.
    Vec4(Vec4),
    /// Color3 value (RGB).
    Color3(Vec3),
    /// Color4 value (RGBA).
    Color4(Vec4),
    /// Array of floats.
    FloatArray(Vec<f32>),
    /// Array of integers.
    IntArray(Vec<i32>),
    /// Array of strings.
    StringArray(Vec<String>),
}

impl ParamValue {
    /// Get as float if possible.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Double(v) => Some(*v as f32),
            ParamValue::Int(v) => Some(*v as f32),
            ParamValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Get as string if possible.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as vec3 if possible.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            ParamValue::Vec3(v) | ParamValue::Color3(v) => Some(*v),
            _ => None,
        }
    }

    /// Truthiness the way Houdini toggles read: non-zero numbers, `true`,
    /// and non-empty strings.
    pub fn is_truthy(&self) -> bool {
        match self {
            ParamValue::Bool(v) => *v,
            ParamValue::Int(v) => *v != 0,
            ParamValue::Float(v) => *v != 0.0,
            ParamValue::Double(v) => *v != 0.0,
            ParamValue::String(s) => !s.is_empty() && s != "0",
            _ => true,
        }
    }

    /// USD `Sdf` value type name for this value.
    pub fn usd_type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Double(_) => "double",
            ParamValue::String(_) => "string",
            ParamValue::Vec2(_) => "float2",
            ParamValue::Vec3(_) => "float3",
            ParamValue::Vec4(_) => "float4",
            ParamValue::Color3(_) => "color3f",
            ParamValue::Color4(_) => "color4f",
            ParamValue::FloatArray(_) => "float[]",
            ParamValue::IntArray(_) => "int[]",
            ParamValue::StringArray(_) => "string[]",
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<Vec3> for ParamValue {
    fn from(v: Vec3) -> Self {
        ParamValue::Vec3(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::from(self.clone()))
    }
}

/// Error produced when a JSON value has no parameter representation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValueError(String);

impl fmt::Display for ParamValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported parameter value: {}", self.0)
    }
}

impl std::error::Error for ParamValueError {}

impl TryFrom<Value> for ParamValue {
    type Error = ParamValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(ParamValue::Bool(b)),
            Value::Number(n) => Ok(number_value(&n)),
            Value::String(s) => Ok(ParamValue::String(s)),
            Value::Array(mut items) => {
                // One-element tuples collapse to their element.
                if items.len() == 1 {
                    return ParamValue::try_from(items.remove(0));
                }
                array_value(items)
            }
            other => Err(ParamValueError(other.to_string())),
        }
    }
}

fn number_value(n: &serde_json::Number) -> ParamValue {
    if let Some(i) = n.as_i64() {
        if let Ok(i) = i32::try_from(i) {
            return ParamValue::Int(i);
        }
    }
    let f = n.as_f64().unwrap_or_default();
    if f.is_finite() && f.abs() > f32::MAX as f64 {
        ParamValue::Double(f)
    } else {
        ParamValue::Float(f as f32)
    }
}

fn array_value(items: Vec<Value>) -> Result<ParamValue, ParamValueError> {
    if items.iter().all(Value::is_string) {
        let strings = items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect::<Vec<_>>();
        // An empty array lands here too; treat it as an empty float list.
        if strings.is_empty() {
            return Ok(ParamValue::FloatArray(Vec::new()));
        }
        return Ok(ParamValue::StringArray(strings));
    }

    if !items.iter().all(Value::is_number) {
        return Err(ParamValueError(Value::Array(items).to_string()));
    }

    let floats: Vec<f32> = items
        .iter()
        .map(|v| v.as_f64().unwrap_or_default() as f32)
        .collect();
    match floats.len() {
        2 => Ok(ParamValue::Vec2(Vec2::new(floats[0], floats[1]))),
        3 => Ok(ParamValue::Vec3(Vec3::new(floats[0], floats[1], floats[2]))),
        4 => Ok(ParamValue::Vec4(Vec4::new(floats[0], floats[1], floats[2], floats[3]))),
        _ => {
            let ints: Option<Vec<i32>> = items
                .iter()
                .map(|v| v.as_i64().and_then(|i| i32::try_from(i).ok()))
                .collect();
            Ok(match ints {
                Some(ints) => ParamValue::IntArray(ints),
                None => ParamValue::FloatArray(floats),
            })
        }
    }
}

/// Widen an f32 through its shortest decimal form so 0.8 stays 0.8 in JSON.
pub(crate) fn widen(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(v as f64)
}

fn float_json(v: f32) -> Value {
    serde_json::Number::from_f64(widen(v))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

impl From<ParamValue> for Value {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Bool(b) => Value::Bool(b),
            ParamValue::Int(i) => Value::from(i),
            ParamValue::Float(f) => float_json(f),
            ParamValue::Double(d) => serde_json::Number::from_f64(d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ParamValue::String(s) => Value::String(s),
            ParamValue::Vec2(v) => Value::Array(v.to_array().into_iter().map(float_json).collect()),
            ParamValue::Vec3(v) | ParamValue::Color3(v) => {
                Value::Array(v.to_array().into_iter().map(float_json).collect())
            }
            ParamValue::Vec4(v) | ParamValue::Color4(v) => {
                Value::Array(v.to_array().into_iter().map(float_json).collect())
            }
            ParamValue::FloatArray(a) => Value::Array(a.into_iter().map(float_json).collect()),
            ParamValue::IntArray(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            ParamValue::StringArray(a) => Value::Array(a.into_iter().map(Value::String).collect()),
        }
    }
}
