//! Port value types.

use crate::error::{TwError, TwResult};

/// A value carried on a port.
///
/// Most ports carry a scalar. Small fixed-size tuples (e.g. a supply/return pair)
/// are carried as vectors and combined element-wise.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Value {
    pub fn scalar(value: f64) -> Self {
        Self::Scalar(value)
    }

    /// Number of elements (1 for scalars).
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn port_type(&self) -> PortType {
        match self {
            Self::Scalar(_) => PortType::Scalar,
            Self::Vector(_) => PortType::Vector,
        }
    }

    pub fn as_scalar(&self) -> TwResult<f64> {
        match self {
            Self::Scalar(v) => Ok(*v),
            Self::Vector(_) => Err(TwError::TypeMismatch {
                expected: "scalar",
                found: "vector",
            }),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Self::Scalar(v) => core::slice::from_ref(v),
            Self::Vector(v) => v,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.as_slice().iter().all(|v| v.is_finite())
    }

    /// Combine two values element-wise. Both must have the same shape.
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> TwResult<Value> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Ok(Self::Scalar(f(*a, *b))),
            (Self::Vector(a), Self::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(TwError::ShapeMismatch {
                        expected: a.len(),
                        found: b.len(),
                    });
                }
                Ok(Self::Vector(
                    a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect(),
                ))
            }
            _ => Err(TwError::ShapeMismatch {
                expected: self.len(),
                found: other.len(),
            }),
        }
    }

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Self::Scalar(v) => Self::Scalar(f(*v)),
            Self::Vector(v) => Self::Vector(v.iter().map(|x| f(*x)).collect()),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Self::Vector(value)
    }
}

/// Declared type of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortType {
    #[default]
    Scalar,
    Vector,
    Any,
}

impl PortType {
    /// Whether an output of type `self` may feed an input of type `input`.
    pub fn compatible_with(self, input: PortType) -> bool {
        self == input || self == PortType::Any || input == PortType::Any
    }

    /// Whether a concrete value is acceptable on a port of this type.
    pub fn accepts(self, value: &Value) -> bool {
        self == PortType::Any || self == value.port_type()
    }
}
