//! Loosely typed input values for array construction.
//!
//! The generic entry point accepts a [`Value`]: a scalar, a nested sequence,
//! an existing array, or a foreign object probed through the fixed, ordered
//! capability set in [`Foreign`].

use std::fmt;
use std::sync::Arc;

use num_complex::Complex;
use num_traits::NumCast;

use crate::descriptor::Descr;
use crate::error::ArrayError;
use crate::Array;

/// One input value for array construction.
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex<f64>),
    Str(String),
    Bytes(Vec<u8>),
    /// A record-like group; dimension discovery can be told to stop at these.
    Tuple(Vec<Value>),
    /// A nested sequence contributing one axis per level.
    Seq(Vec<Value>),
    /// An existing array used as a construction operand.
    Array(Array),
    /// A foreign object exposing interchange capabilities.
    Foreign(Arc<dyn Foreign>),
}

/// Interchange capabilities a foreign object may expose, probed in a fixed
/// priority order: buffer export, struct export, dict export, as-array
/// callable. A default implementation exposes nothing.
pub trait Foreign {
    /// Expose the object's memory as a buffer view.
    fn buffer(&self) -> Option<BufferExport> {
        None
    }

    /// Expose the fixed-layout struct capsule.
    fn struct_export(&self) -> Option<StructCapsule> {
        None
    }

    /// Expose the interchange dictionary.
    fn dict_export(&self) -> Option<InterfaceDict> {
        None
    }

    /// Convert the object itself; `None` from a call with a context value
    /// means the signature rejects the context and the caller retries
    /// without it.
    fn as_array(&self, descr: Option<&Descr>, context: Option<&Value>) -> Option<Result<Value, ArrayError>> {
        let _ = (descr, context);
        None
    }
}

/// A borrowed memory view exported by a foreign object.
pub struct BufferExport {
    pub ptr: *const u8,
    /// Total length in bytes.
    pub len: usize,
    pub readonly: bool,
    /// Interchange type string; absent means opaque bytes of `itemsize`.
    pub format: Option<String>,
    pub itemsize: usize,
    pub shape: Option<Vec<usize>>,
    pub strides: Option<Vec<isize>>,
}

/// The version tag a struct capsule must carry.
pub const STRUCT_CAPSULE_VERSION: u32 = 2;

/// The fixed-layout export capsule: raw pointers into storage owned by the
/// exporting object, which the resulting array keeps alive as its base.
pub struct StructCapsule {
    /// Version tag; must equal [`STRUCT_CAPSULE_VERSION`].
    pub two: u32,
    pub nd: usize,
    /// Type kind letter: `b`, `i`, `u`, `f`, `c`, `S` or `U`.
    pub typekind: u8,
    pub itemsize: usize,
    /// Flag word; the `NOTSWAPPED` bit unset means the data is in
    /// opposite-of-native byte order.
    pub flags: u32,
    pub shape: *const isize,
    pub strides: *const isize,
    pub data: *mut u8,
}

/// The interchange dictionary: loosely typed key/value pairs so malformed
/// entries can be represented and handled per the protocol.
#[derive(Default)]
pub struct InterfaceDict {
    entries: Vec<(String, Value)>,
}

impl InterfaceDict {
    pub fn new() -> InterfaceDict {
        InterfaceDict::default()
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.entries.push((key.to_owned(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl Value {
    /// Sequence length, counting characters for text leaves.
    pub fn seq_len(&self) -> Option<usize> {
        match self {
            Value::Seq(v) | Value::Tuple(v) => Some(v.len()),
            Value::Str(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            _ => None,
        }
    }

    /// Element access for plain sequences and tuples.
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Seq(v) | Value::Tuple(v) => v.get(index),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_)
                | Value::Int(_)
                | Value::UInt(_)
                | Value::Float(_)
                | Value::Complex(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            Value::Int(i) => Some(i != 0),
            Value::UInt(u) => Some(u != 0),
            Value::Float(f) => Some(f != 0.0),
            Value::Complex(c) => Some(c.re != 0.0 || c.im != 0.0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Bool(b) => Some(b as i64),
            Value::Int(i) => Some(i),
            Value::UInt(u) => i64::try_from(u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Bool(b) => Some(b as u64),
            Value::Int(i) => u64::try_from(i).ok(),
            Value::UInt(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Bool(b) => Some(b as u8 as f64),
            Value::Int(i) => Some(i as f64),
            Value::UInt(u) => Some(u as f64),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<Complex<f64>> {
        match *self {
            Value::Complex(c) => Some(c),
            _ => self.as_f64().map(|f| Complex::new(f, 0.0)),
        }
    }

    /// Numeric conversion into any primitive via `NumCast`; `None` when the
    /// value is non-numeric or does not fit.
    pub fn cast<T: NumCast>(&self) -> Option<T> {
        match *self {
            Value::Bool(b) => NumCast::from(b as i64),
            Value::Int(i) => NumCast::from(i),
            Value::UInt(u) => NumCast::from(u),
            Value::Float(f) => NumCast::from(f),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Value {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<Complex<f64>> for Value {
    fn from(v: Complex<f64>) -> Value {
        Value::Complex(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Value {
        Value::Array(v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Complex(a), Complex(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Tuple(a), Tuple(b)) | (Seq(a), Seq(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Value::*;
        match self {
            Bool(v) => write!(f, "Bool({:?})", v),
            Int(v) => write!(f, "Int({:?})", v),
            UInt(v) => write!(f, "UInt({:?})", v),
            Float(v) => write!(f, "Float({:?})", v),
            Complex(v) => write!(f, "Complex({:?})", v),
            Str(v) => write!(f, "Str({:?})", v),
            Bytes(v) => write!(f, "Bytes({:?})", v),
            Tuple(v) => f.debug_tuple("Tuple").field(v).finish(),
            Seq(v) => f.debug_tuple("Seq").field(v).finish(),
            Array(a) => write!(f, "Array(shape {:?})", a.shape()),
            Foreign(_) => f.write_str("Foreign(..)"),
        }
    }
}

/// Create a [`Value::Seq`] with one, two or more nesting levels.
///
/// ```
/// use ndcore::seq;
/// let flat = seq![1, 2, 3];
/// let nested = seq![[1, 2], [3, 4]];
/// ```
#[macro_export]
macro_rules! seq {
    ($([$($inner:tt)*]),+ $(,)?) => {
        $crate::Value::Seq(vec![$($crate::seq![$($inner)*]),+])
    };
    ($($x:expr),* $(,)?) => {
        $crate::Value::Seq(vec![$($crate::Value::from($x)),*])
    };
}
