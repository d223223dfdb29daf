use crate::domain::model::{Element, PortType};
use crate::utils::error::{IrError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 描述樹與封存檔共用的基本值
///
/// Serialized as `{"type": <type name>, "value": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[serde(rename = "bool")]
    Bool(bool),
    #[serde(rename = "int")]
    Int(i64),
    #[serde(rename = "real")]
    Real(#[serde(with = "real_text")] f64),
    #[serde(rename = "string")]
    Text(String),
    #[serde(rename = "bool[]")]
    BoolArray(Vec<bool>),
    #[serde(rename = "int[]")]
    IntArray(Vec<i64>),
    #[serde(rename = "real[]")]
    RealArray(#[serde(with = "real_text::vec")] Vec<f64>),
}

/// 浮點數的序列化方式：有限值寫成數字，NaN 與無限大寫成字串
///
/// JSON has no literal for them and `serde_json` would write `null`, which
/// cannot be read back.
pub(crate) mod real_text {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Real {
        Number(f64),
        Text(String),
    }

    fn encode(value: f64) -> Real {
        if value.is_finite() {
            Real::Number(value)
        } else if value.is_nan() {
            Real::Text("NaN".to_string())
        } else if value > 0.0 {
            Real::Text("inf".to_string())
        } else {
            Real::Text("-inf".to_string())
        }
    }

    fn decode(real: Real) -> Result<f64, String> {
        match real {
            Real::Number(value) => Ok(value),
            Real::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(format!("invalid real value '{}'", other)),
            },
        }
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        encode(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        decode(Real::deserialize(deserializer)?).map_err(D::Error::custom)
    }

    pub mod vec {
        use super::{decode, encode, Real};
        use serde::de::Error;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| encode(*v)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            Vec::<Real>::deserialize(deserializer)?
                .into_iter()
                .map(decode)
                .collect::<Result<_, _>>()
                .map_err(D::Error::custom)
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Text(_) => "string",
            Value::BoolArray(_) => "bool[]",
            Value::IntArray(_) => "int[]",
            Value::RealArray(_) => "real[]",
        }
    }

    /// 依預期型別取值，型別不符時回傳 TypeMismatch
    pub fn get<T: Primitive>(&self) -> Result<T> {
        T::from_value(self).ok_or_else(|| IrError::type_mismatch(T::type_name(), self.type_name()))
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::BoolArray(v) => write_list(f, v),
            Value::IntArray(v) => write_list(f, v),
            Value::RealArray(v) => write_list(f, v),
        }
    }
}

/// Types that can be stored directly in a [`Value`].
pub trait Primitive: Sized {
    fn type_name() -> &'static str;
    fn to_value(&self) -> Result<Value>;
    fn from_value(value: &Value) -> Option<Self>;
}

impl Primitive for bool {
    fn type_name() -> &'static str {
        "bool"
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

// 整數型別共用 "int"，超出範圍視為型別不符
macro_rules! impl_int_primitive {
    ($($ty:ty),*) => {
        $(
            impl Primitive for $ty {
                fn type_name() -> &'static str {
                    "int"
                }

                fn to_value(&self) -> Result<Value> {
                    i64::try_from(*self)
                        .map(Value::Int)
                        .map_err(|_| IrError::out_of_range(self, "int"))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_int_primitive!(i32, i64, u32, usize);

impl Primitive for f64 {
    fn type_name() -> &'static str {
        "real"
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Real(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl Primitive for String {
    fn type_name() -> &'static str {
        "string"
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T: Element> Primitive for Vec<T> {
    fn type_name() -> &'static str {
        match T::PORT_TYPE {
            PortType::Real => "real[]",
            PortType::Integer => "int[]",
            PortType::Boolean => "bool[]",
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(T::wrap_value(self.clone()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        T::unwrap_value(value)
    }
}

/// 判斷型別名稱是否為基本值型別
pub fn is_primitive_type_name(type_name: &str) -> bool {
    matches!(
        type_name,
        "bool" | "int" | "real" | "string" | "bool[]" | "int[]" | "real[]"
    )
}
