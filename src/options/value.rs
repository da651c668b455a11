//! Value kinds an option can hold
//!
//! [`Scalar`] covers non-null kinds with a text representation.
//! [`OptionValue`] is what an option is declared with: a scalar (required)
//! or `Option<S>` (nullable).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

use super::transformer::Transformer;

/// A non-null value kind that can be persisted as text
pub trait Scalar: Clone + Send + Sync + 'static {
    /// Set for kinds that support numeric mutation
    const NUMERIC: bool = false;

    /// Converter used when the option does not supply its own
    fn builtin_transformer() -> Option<Transformer<Self>> {
        None
    }

    fn to_number(&self) -> Option<Number> {
        None
    }

    fn from_number(_number: Number) -> Option<Self> {
        None
    }
}

/// The declared value type of an option
pub trait OptionValue: Clone + Send + Sync + 'static {
    type Scalar: Scalar;

    /// Nullable options are never tracked as required
    const NULLABLE: bool;

    /// `None` means "store null"
    fn into_scalar(self) -> Option<Self::Scalar>;

    fn as_scalar(&self) -> Option<&Self::Scalar>;

    fn from_scalar(value: Self::Scalar) -> Self;

    /// The unset value, for types that have one
    fn null() -> Option<Self>;
}

impl<S: Scalar> OptionValue for Option<S> {
    type Scalar = S;

    const NULLABLE: bool = true;

    fn into_scalar(self) -> Option<S> {
        self
    }

    fn as_scalar(&self) -> Option<&S> {
        self.as_ref()
    }

    fn from_scalar(value: S) -> Self {
        Some(value)
    }

    fn null() -> Option<Self> {
        Some(None)
    }
}

/// Implement [`OptionValue`] for scalar types used directly (non-nullable)
#[macro_export]
macro_rules! impl_option_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::OptionValue for $ty {
                type Scalar = $ty;

                const NULLABLE: bool = false;

                fn into_scalar(self) -> ::std::option::Option<$ty> {
                    ::std::option::Option::Some(self)
                }

                fn as_scalar(&self) -> ::std::option::Option<&$ty> {
                    ::std::option::Option::Some(self)
                }

                fn from_scalar(value: $ty) -> Self {
                    value
                }

                fn null() -> ::std::option::Option<Self> {
                    ::std::option::Option::None
                }
            }
        )+
    };
}

/// Mark a custom type as a scalar without a built-in transformer
///
/// Options of such types must be declared with an explicit transformer.
///
/// ```rust
/// #[derive(Clone)]
/// struct Palette(Vec<String>);
///
/// optstore::option_scalar!(Palette);
/// ```
#[macro_export]
macro_rules! option_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Scalar for $ty {}
        )+
        $crate::impl_option_value!($($ty),+);
    };
}

/// Declare an enum stored by its exact variant name
///
/// ```rust
/// optstore::option_enum! {
///     pub enum Theme { Light, Dark }
/// }
///
/// assert_eq!(Theme::Dark.name(), "Dark");
/// ```
#[macro_export]
macro_rules! option_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const VARIANTS: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl $crate::Scalar for $name {
            fn builtin_transformer() -> ::std::option::Option<$crate::Transformer<Self>> {
                ::std::option::Option::Some($crate::Transformer::enumeration(
                    $name::VARIANTS,
                    $name::name,
                ))
            }
        }

        $crate::impl_option_value!($name);
    };
}

/// Numeric value tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
}

/// Compound-assignment operators supported by numeric options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl NumericOp {
    pub fn name(self) -> &'static str {
        match self {
            NumericOp::Add => "add",
            NumericOp::Sub => "subtract",
            NumericOp::Mul => "multiply",
            NumericOp::Div => "divide",
            NumericOp::Rem => "remainder",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    /// Operands are different kinds; kinds are never coerced
    KindMismatch,
    /// Overflow or division by zero
    OutOfRange,
}

macro_rules! checked_int_op {
    ($op:expr, $a:expr, $b:expr) => {
        match $op {
            NumericOp::Add => $a.checked_add($b),
            NumericOp::Sub => $a.checked_sub($b),
            NumericOp::Mul => $a.checked_mul($b),
            NumericOp::Div => $a.checked_div($b),
            NumericOp::Rem => $a.checked_rem($b),
        }
        .ok_or(ArithmeticError::OutOfRange)
    };
}

macro_rules! float_op {
    ($op:expr, $a:expr, $b:expr) => {
        match $op {
            NumericOp::Add => $a + $b,
            NumericOp::Sub => $a - $b,
            NumericOp::Mul => $a * $b,
            NumericOp::Div => $a / $b,
            NumericOp::Rem => $a % $b,
        }
    };
}

impl Number {
    /// One, in the same kind as `self`
    pub fn one_like(self) -> Number {
        match self {
            Number::I8(_) => Number::I8(1),
            Number::I16(_) => Number::I16(1),
            Number::I32(_) => Number::I32(1),
            Number::I64(_) => Number::I64(1),
            Number::U8(_) => Number::U8(1),
            Number::U16(_) => Number::U16(1),
            Number::U32(_) => Number::U32(1),
            Number::U64(_) => Number::U64(1),
            Number::F32(_) => Number::F32(1.0),
            Number::F64(_) => Number::F64(1.0),
            Number::Decimal(_) => Number::Decimal(Decimal::ONE),
        }
    }

    pub fn apply(self, op: NumericOp, rhs: Number) -> Result<Number, ArithmeticError> {
        match (self, rhs) {
            (Number::I8(a), Number::I8(b)) => checked_int_op!(op, a, b).map(Number::I8),
            (Number::I16(a), Number::I16(b)) => checked_int_op!(op, a, b).map(Number::I16),
            (Number::I32(a), Number::I32(b)) => checked_int_op!(op, a, b).map(Number::I32),
            (Number::I64(a), Number::I64(b)) => checked_int_op!(op, a, b).map(Number::I64),
            (Number::U8(a), Number::U8(b)) => checked_int_op!(op, a, b).map(Number::U8),
            (Number::U16(a), Number::U16(b)) => checked_int_op!(op, a, b).map(Number::U16),
            (Number::U32(a), Number::U32(b)) => checked_int_op!(op, a, b).map(Number::U32),
            (Number::U64(a), Number::U64(b)) => checked_int_op!(op, a, b).map(Number::U64),
            (Number::Decimal(a), Number::Decimal(b)) => {
                checked_int_op!(op, a, b).map(Number::Decimal)
            }
            (Number::F32(a), Number::F32(b)) => Ok(Number::F32(float_op!(op, a, b))),
            (Number::F64(a), Number::F64(b)) => Ok(Number::F64(float_op!(op, a, b))),
            _ => Err(ArithmeticError::KindMismatch),
        }
    }
}

macro_rules! numeric_scalar {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                const NUMERIC: bool = true;

                fn builtin_transformer() -> Option<Transformer<Self>> {
                    Some(Transformer::parsed())
                }

                fn to_number(&self) -> Option<Number> {
                    Some(Number::$variant(*self))
                }

                fn from_number(number: Number) -> Option<Self> {
                    match number {
                        Number::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }

            crate::impl_option_value!($ty);
        )+
    };
}

numeric_scalar! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
}

impl Scalar for bool {
    fn builtin_transformer() -> Option<Transformer<Self>> {
        Some(Transformer::parsed())
    }
}

impl Scalar for String {
    fn builtin_transformer() -> Option<Transformer<Self>> {
        Some(Transformer::new(|value: &String| value.clone(), |raw| Ok(raw.to_string())))
    }
}

impl Scalar for char {
    fn builtin_transformer() -> Option<Transformer<Self>> {
        Some(Transformer::parsed())
    }
}

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";
pub(crate) const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

impl Scalar for NaiveDate {
    fn builtin_transformer() -> Option<Transformer<Self>> {
        Some(Transformer::new(
            |value: &NaiveDate| value.format(DATE_FORMAT).to_string(),
            |raw| {
                NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .map_err(|e| crate::TransformError::new::<NaiveDate>(raw, e))
            },
        ))
    }
}

impl Scalar for NaiveTime {
    fn builtin_transformer() -> Option<Transformer<Self>> {
        Some(Transformer::new(
            |value: &NaiveTime| value.format(TIME_FORMAT).to_string(),
            |raw| {
                NaiveTime::parse_from_str(raw, TIME_FORMAT)
                    .map_err(|e| crate::TransformError::new::<NaiveTime>(raw, e))
            },
        ))
    }
}

impl Scalar for NaiveDateTime {
    fn builtin_transformer() -> Option<Transformer<Self>> {
        Some(Transformer::new(
            |value: &NaiveDateTime| value.format(DATE_TIME_FORMAT).to_string(),
            |raw| {
                NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
                    .map_err(|e| crate::TransformError::new::<NaiveDateTime>(raw, e))
            },
        ))
    }
}

impl Scalar for DateTime<Utc> {
    fn builtin_transformer() -> Option<Transformer<Self>> {
        Some(Transformer::new(
            |value: &DateTime<Utc>| value.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            |raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .map_err(|e| crate::TransformError::new::<DateTime<Utc>>(raw, e))
            },
        ))
    }
}

crate::impl_option_value!(bool, String, char, NaiveDate, NaiveTime, NaiveDateTime, DateTime<Utc>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullability_flags() {
        assert!(!<i32 as OptionValue>::NULLABLE);
        assert!(<Option<i32> as OptionValue>::NULLABLE);
        assert_eq!(<i32 as OptionValue>::null(), None);
        assert_eq!(<Option<i32> as OptionValue>::null(), Some(None));
        assert_eq!(Some(3).into_scalar(), Some(3));
        assert_eq!(<Option<i32> as OptionValue>::as_scalar(&None), None);
        assert_eq!(7i32.as_scalar(), Some(&7));
        assert_eq!(<Option<String> as OptionValue>::from_scalar("a".into()), Some("a".to_string()));
    }

    #[test]
    fn test_numeric_tags() {
        assert!(<i16 as Scalar>::NUMERIC);
        assert!(<Decimal as Scalar>::NUMERIC);
        assert!(!<String as Scalar>::NUMERIC);
        assert!(!<bool as Scalar>::NUMERIC);
        assert_eq!(5u8.to_number(), Some(Number::U8(5)));
        assert_eq!(i64::from_number(Number::I64(9)), Some(9));
        assert_eq!(i64::from_number(Number::I32(9)), None);
    }

    #[test]
    fn test_integer_arithmetic() {
        let five = Number::I32(5);
        assert_eq!(five.apply(NumericOp::Add, five.one_like()), Ok(Number::I32(6)));
        assert_eq!(five.apply(NumericOp::Add, Number::I32(10)), Ok(Number::I32(15)));
        assert_eq!(five.apply(NumericOp::Sub, Number::I32(7)), Ok(Number::I32(-2)));
        assert_eq!(five.apply(NumericOp::Mul, Number::I32(3)), Ok(Number::I32(15)));
        assert_eq!(five.apply(NumericOp::Div, Number::I32(2)), Ok(Number::I32(2)));
        assert_eq!(five.apply(NumericOp::Rem, Number::I32(2)), Ok(Number::I32(1)));
    }

    #[test]
    fn test_checked_failures() {
        assert_eq!(
            Number::I8(i8::MAX).apply(NumericOp::Add, Number::I8(1)),
            Err(ArithmeticError::OutOfRange)
        );
        assert_eq!(
            Number::U32(0).apply(NumericOp::Sub, Number::U32(1)),
            Err(ArithmeticError::OutOfRange)
        );
        assert_eq!(
            Number::I64(10).apply(NumericOp::Div, Number::I64(0)),
            Err(ArithmeticError::OutOfRange)
        );
        assert_eq!(
            Number::Decimal(Decimal::ONE).apply(NumericOp::Rem, Number::Decimal(Decimal::ZERO)),
            Err(ArithmeticError::OutOfRange)
        );
        assert_eq!(
            Number::I32(1).apply(NumericOp::Add, Number::I64(1)),
            Err(ArithmeticError::KindMismatch)
        );
    }

    #[test]
    fn test_float_and_decimal_arithmetic() {
        assert_eq!(
            Number::F64(100.0).apply(NumericOp::Add, Number::F64(1.0)),
            Ok(Number::F64(101.0))
        );
        assert_eq!(
            Number::F32(1.0).apply(NumericOp::Div, Number::F32(0.0)),
            Ok(Number::F32(f32::INFINITY))
        );

        let a: Decimal = "123.456".parse().unwrap();
        let b: Decimal = "0.544".parse().unwrap();
        assert_eq!(
            Number::Decimal(a).apply(NumericOp::Add, Number::Decimal(b)),
            Ok(Number::Decimal("124.000".parse().unwrap()))
        );
    }
}
