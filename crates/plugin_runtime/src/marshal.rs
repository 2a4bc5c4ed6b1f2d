//! Type descriptors and type-erased argument vectors.
//!
//! Events and services declare their payload shape with a [`TypeDescriptor`]
//! built from stringified type names (`"int"`, `"char*"`, `"uint16_t"` ...).
//! Callers then build an [`ArgumentVector`] against that descriptor, either
//! from Rust values or from string tokens, and handlers pull typed values back
//! out of it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Closed set of primitive types understood by the marshaling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    Unknown,
    None,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    IntPtr,
    UIntPtr,
    Float,
    Double,
    String,
    WString,
}

impl ArgType {
    /// Maps a stringified type name onto the closed enumeration.
    ///
    /// Integer names are classified by width substring and an unsigned `u`
    /// marker, defaulting to 32 bits. `char*` and `wchar_t*` are strings;
    /// any other pointer type is [`ArgType::Unknown`].
    pub fn from_type_name(name: &str) -> Self {
        let pointers = name.matches('*').count();

        if name.contains("int") {
            if pointers > 0 {
                return Self::Unknown;
            }
            let unsigned = name.contains('u');
            let signed_width = if name.contains("intptr") {
                Self::IntPtr
            } else if name.contains('8') {
                Self::Int8
            } else if name.contains("16") {
                Self::Int16
            } else if name.contains("32") {
                Self::Int32
            } else if name.contains("64") {
                Self::Int64
            } else {
                Self::Int32
            };
            return if unsigned {
                signed_width.to_unsigned()
            } else {
                signed_width
            };
        }

        if name.contains("wchar_t") {
            return match pointers {
                1 => Self::WString,
                _ => Self::Unknown,
            };
        }

        if name.contains("char") {
            return match pointers {
                0 if name.contains('u') => Self::UInt8,
                0 => Self::Int8,
                1 => Self::String,
                _ => Self::Unknown,
            };
        }

        let bare = |ty: Self| if pointers > 0 { Self::Unknown } else { ty };
        if name.contains("float") {
            bare(Self::Float)
        } else if name.contains("double") {
            bare(Self::Double)
        } else if name.contains("void") {
            bare(Self::None)
        } else {
            Self::Unknown
        }
    }

    fn to_unsigned(self) -> Self {
        match self {
            Self::Int8 => Self::UInt8,
            Self::Int16 => Self::UInt16,
            Self::Int32 => Self::UInt32,
            Self::Int64 => Self::UInt64,
            Self::IntPtr => Self::UIntPtr,
            other => other,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::UInt8
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::IntPtr
                | Self::UIntPtr
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::None => "void",
            Self::Int8 => "int8_t",
            Self::UInt8 => "uint8_t",
            Self::Int16 => "int16_t",
            Self::UInt16 => "uint16_t",
            Self::Int32 => "int32_t",
            Self::UInt32 => "uint32_t",
            Self::Int64 => "int64_t",
            Self::UInt64 => "uint64_t",
            Self::IntPtr => "intptr_t",
            Self::UIntPtr => "uintptr_t",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "char*",
            Self::WString => "wchar_t*",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while building or reading argument vectors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshalError {
    /// Wrong number of arguments for the descriptor
    #[error("Wrong number of arguments: required {expected}, provided {provided}")]
    ArgumentCount { expected: usize, provided: usize },

    /// The declared type cannot carry a value
    #[error("Cannot create argument {index}: unsupported type {ty}")]
    UnsupportedType { index: usize, ty: ArgType },

    /// A string token could not be parsed as the declared type
    #[error("Cannot parse argument {index} ({token:?}) as {ty}")]
    Parse {
        index: usize,
        token: String,
        ty: ArgType,
    },

    /// A value of the wrong kind was supplied or requested
    #[error("Argument {index}: expected {expected}, found {found}")]
    TypeMismatch {
        index: usize,
        expected: ArgType,
        found: ArgType,
    },

    /// An integer does not fit the declared width
    #[error("Argument {index} is out of range for {ty}")]
    OutOfRange { index: usize, ty: ArgType },

    /// No argument at this index
    #[error("No argument at index {0}")]
    IndexOutOfBounds(usize),
}

/// Return type plus ordered argument types of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    ret: ArgType,
    args: Vec<ArgType>,
    has_unknown_types: bool,
}

impl TypeDescriptor {
    /// Builds a descriptor from stringified type names.
    ///
    /// ```rust
    /// use plugin_runtime::marshal::{ArgType, TypeDescriptor};
    ///
    /// let add = TypeDescriptor::new("int", &["int", "int"]);
    /// assert_eq!(add.ret(), ArgType::Int32);
    /// assert!(!add.has_unknown_types());
    /// ```
    pub fn new(ret: &str, args: &[&str]) -> Self {
        Self::from_types(
            ArgType::from_type_name(ret),
            args.iter().map(|name| ArgType::from_type_name(name)).collect(),
        )
    }

    pub fn from_types(ret: ArgType, args: Vec<ArgType>) -> Self {
        let has_unknown_types =
            ret == ArgType::Unknown || args.iter().any(|ty| *ty == ArgType::Unknown);
        Self {
            ret,
            args,
            has_unknown_types,
        }
    }

    /// `void` return, no arguments.
    pub fn void() -> Self {
        Self::from_types(ArgType::None, Vec::new())
    }

    pub fn ret(&self) -> ArgType {
        self.ret
    }

    pub fn args(&self) -> &[ArgType] {
        &self.args
    }

    pub fn argc(&self) -> usize {
        self.args.len()
    }

    pub fn has_unknown_types(&self) -> bool {
        self.has_unknown_types
    }

    /// Checks a caller's view of the signature against this descriptor.
    pub fn typecheck(&self, ret: &str, args: &[&str]) -> bool {
        ArgType::from_type_name(ret) == self.ret
            && args.len() == self.args.len()
            && args
                .iter()
                .zip(&self.args)
                .all(|(name, ty)| ArgType::from_type_name(name) == *ty)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.ret)?;
        for (i, ty) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(")")
    }
}

/// One marshaled value.
#[derive(Clone)]
pub enum ArgValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    IPtr(isize),
    UPtr(usize),
    F32(f32),
    F64(f64),
    Str(String),
    WStr(String),
    /// Value of a type the descriptor could not name; passed through untouched.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl ArgValue {
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Arc::new(value))
    }

    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::I8(_) => ArgType::Int8,
            Self::U8(_) => ArgType::UInt8,
            Self::I16(_) => ArgType::Int16,
            Self::U16(_) => ArgType::UInt16,
            Self::I32(_) => ArgType::Int32,
            Self::U32(_) => ArgType::UInt32,
            Self::I64(_) => ArgType::Int64,
            Self::U64(_) => ArgType::UInt64,
            Self::IPtr(_) => ArgType::IntPtr,
            Self::UPtr(_) => ArgType::UIntPtr,
            Self::F32(_) => ArgType::Float,
            Self::F64(_) => ArgType::Double,
            Self::Str(_) => ArgType::String,
            Self::WStr(_) => ArgType::WString,
            Self::Opaque(_) => ArgType::Unknown,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            Self::I8(v) => v.into(),
            Self::U8(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::I32(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::I64(v) => v.into(),
            Self::U64(v) => v.into(),
            Self::IPtr(v) => v as i128,
            Self::UPtr(v) => v as i128,
            _ => return None,
        })
    }

    /// Converts a caller-supplied value to the declared slot type, promoting
    /// integers between widths when the value fits.
    pub fn coerce(self, ty: ArgType, index: usize) -> Result<Self, MarshalError> {
        let mismatch = |found: ArgType| MarshalError::TypeMismatch {
            index,
            expected: ty,
            found,
        };
        let found = self.arg_type();
        match ty {
            ArgType::None => Err(MarshalError::UnsupportedType { index, ty }),
            ArgType::Unknown => Ok(self),
            ArgType::Float => match self {
                Self::F32(v) => Ok(Self::F32(v)),
                Self::F64(v) => Ok(Self::F32(v as f32)),
                _ => Err(mismatch(found)),
            },
            ArgType::Double => match self {
                Self::F32(v) => Ok(Self::F64(v.into())),
                Self::F64(v) => Ok(Self::F64(v)),
                _ => Err(mismatch(found)),
            },
            ArgType::String => match self {
                Self::Str(s) | Self::WStr(s) => Ok(Self::Str(s)),
                _ => Err(mismatch(found)),
            },
            ArgType::WString => match self {
                Self::Str(s) | Self::WStr(s) => Ok(Self::WStr(s)),
                _ => Err(mismatch(found)),
            },
            integer => {
                let wide = self.as_i128().ok_or_else(|| mismatch(found))?;
                Self::integer(integer, wide).ok_or(MarshalError::OutOfRange { index, ty })
            }
        }
    }

    fn integer(ty: ArgType, v: i128) -> Option<Self> {
        Some(match ty {
            ArgType::Int8 => Self::I8(v.try_into().ok()?),
            ArgType::UInt8 => Self::U8(v.try_into().ok()?),
            ArgType::Int16 => Self::I16(v.try_into().ok()?),
            ArgType::UInt16 => Self::U16(v.try_into().ok()?),
            ArgType::Int32 => Self::I32(v.try_into().ok()?),
            ArgType::UInt32 => Self::U32(v.try_into().ok()?),
            ArgType::Int64 => Self::I64(v.try_into().ok()?),
            ArgType::UInt64 => Self::U64(v.try_into().ok()?),
            ArgType::IntPtr => Self::IPtr(v.try_into().ok()?),
            ArgType::UIntPtr => Self::UPtr(v.try_into().ok()?),
            _ => return None,
        })
    }

    /// Parses a string token as the declared slot type.
    pub fn parse(token: &str, ty: ArgType, index: usize) -> Result<Self, MarshalError> {
        let bad = || MarshalError::Parse {
            index,
            token: token.to_string(),
            ty,
        };
        let t = token.trim();
        Ok(match ty {
            ArgType::Int8 => Self::I8(t.parse().map_err(|_| bad())?),
            ArgType::UInt8 => Self::U8(t.parse().map_err(|_| bad())?),
            ArgType::Int16 => Self::I16(t.parse().map_err(|_| bad())?),
            ArgType::UInt16 => Self::U16(t.parse().map_err(|_| bad())?),
            ArgType::Int32 => Self::I32(t.parse().map_err(|_| bad())?),
            ArgType::UInt32 => Self::U32(t.parse().map_err(|_| bad())?),
            ArgType::Int64 => Self::I64(t.parse().map_err(|_| bad())?),
            ArgType::UInt64 => Self::U64(t.parse().map_err(|_| bad())?),
            ArgType::IntPtr => Self::IPtr(t.parse().map_err(|_| bad())?),
            ArgType::UIntPtr => Self::UPtr(t.parse().map_err(|_| bad())?),
            ArgType::Float => Self::F32(t.parse().map_err(|_| bad())?),
            ArgType::Double => Self::F64(t.parse().map_err(|_| bad())?),
            ArgType::String => Self::Str(token.to_string()),
            ArgType::WString => Self::WStr(token.to_string()),
            ArgType::None | ArgType::Unknown => {
                return Err(MarshalError::UnsupportedType { index, ty })
            }
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::WStr(s) => Some(s),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(value) => value.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I8(v) => write!(f, "I8({v})"),
            Self::U8(v) => write!(f, "U8({v})"),
            Self::I16(v) => write!(f, "I16({v})"),
            Self::U16(v) => write!(f, "U16({v})"),
            Self::I32(v) => write!(f, "I32({v})"),
            Self::U32(v) => write!(f, "U32({v})"),
            Self::I64(v) => write!(f, "I64({v})"),
            Self::U64(v) => write!(f, "U64({v})"),
            Self::IPtr(v) => write!(f, "IPtr({v})"),
            Self::UPtr(v) => write!(f, "UPtr({v})"),
            Self::F32(v) => write!(f, "F32({v})"),
            Self::F64(v) => write!(f, "F64({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::WStr(v) => write!(f, "WStr({v:?})"),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

/// Typed extraction out of an [`ArgValue`].
pub trait FromArg: Sized {
    /// Slot type this Rust type is read from.
    const TYPE: ArgType;

    fn from_arg(value: &ArgValue) -> Option<Self>;
}

macro_rules! arg_conversions {
    ($($ty:ty => $variant:ident : $arg:ident),* $(,)?) => {
        $(
            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    ArgValue::$variant(value)
                }
            }

            impl FromArg for $ty {
                const TYPE: ArgType = ArgType::$arg;

                fn from_arg(value: &ArgValue) -> Option<Self> {
                    match value {
                        ArgValue::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

arg_conversions! {
    i8 => I8: Int8,
    u8 => U8: UInt8,
    i16 => I16: Int16,
    u16 => U16: UInt16,
    i32 => I32: Int32,
    u32 => U32: UInt32,
    i64 => I64: Int64,
    u64 => U64: UInt64,
    isize => IPtr: IntPtr,
    usize => UPtr: UIntPtr,
    f32 => F32: Float,
    f64 => F64: Double,
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl FromArg for String {
    const TYPE: ArgType = ArgType::String;

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// Builds a `Vec<ArgValue>` from a list of convertible values.
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::marshal::ArgValue>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::marshal::ArgValue::from($value)),+]
    };
}

/// Arguments for one call, shaped by a [`TypeDescriptor`].
#[derive(Debug, Clone, Default)]
pub struct ArgumentVector {
    values: Vec<ArgValue>,
}

impl ArgumentVector {
    /// Empty vector, for callables declared without arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a vector from Rust values, converting each one to its slot type.
    /// Any failure discards everything built so far.
    pub fn from_values(
        descriptor: &TypeDescriptor,
        values: impl IntoIterator<Item = ArgValue>,
    ) -> Result<Self, MarshalError> {
        let values: Vec<ArgValue> = values.into_iter().collect();
        check_count(descriptor, values.len())?;
        let values = values
            .into_iter()
            .zip(descriptor.args())
            .enumerate()
            .map(|(index, (value, ty))| value.coerce(*ty, index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    /// Builds a vector by parsing one string token per argument.
    pub fn from_strings<S: AsRef<str>>(
        descriptor: &TypeDescriptor,
        tokens: &[S],
    ) -> Result<Self, MarshalError> {
        check_count(descriptor, tokens.len())?;
        let values = tokens
            .iter()
            .zip(descriptor.args())
            .enumerate()
            .map(|(index, (token, ty))| ArgValue::parse(token.as_ref(), *ty, index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArgValue> {
        self.values.iter()
    }

    /// Reads argument `index` as `T`.
    pub fn extract<T: FromArg>(&self, index: usize) -> Result<T, MarshalError> {
        let value = self.get(index).ok_or(MarshalError::IndexOutOfBounds(index))?;
        T::from_arg(value).ok_or_else(|| MarshalError::TypeMismatch {
            index,
            expected: T::TYPE,
            found: value.arg_type(),
        })
    }

    pub fn into_values(self) -> Vec<ArgValue> {
        self.values
    }
}

fn check_count(descriptor: &TypeDescriptor, provided: usize) -> Result<(), MarshalError> {
    if descriptor.argc() != provided {
        warn!(
            "⚠️ Wrong number of arguments: required {}, provided {}",
            descriptor.argc(),
            provided
        );
        return Err(MarshalError::ArgumentCount {
            expected: descriptor.argc(),
            provided,
        });
    }
    Ok(())
}
