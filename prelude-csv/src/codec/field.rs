//! Conversion of row values into field text.

use serde_json::Value;
use std::borrow::Cow;

/// A value that can be written as a CSV field.
///
/// `None` means null and is written as an empty field.
pub trait CsvField {
    fn to_field(&self) -> Option<Cow<'_, str>>;
}

impl CsvField for str {
    fn to_field(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl CsvField for String {
    fn to_field(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

impl CsvField for Cow<'_, str> {
    fn to_field(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_ref()))
    }
}

impl<T: CsvField> CsvField for Option<T> {
    fn to_field(&self) -> Option<Cow<'_, str>> {
        self.as_ref().and_then(|value| value.to_field())
    }
}

impl<T: CsvField + ?Sized> CsvField for &T {
    fn to_field(&self) -> Option<Cow<'_, str>> {
        (**self).to_field()
    }
}

impl<T: CsvField + ?Sized> CsvField for Box<T> {
    fn to_field(&self) -> Option<Cow<'_, str>> {
        (**self).to_field()
    }
}

/// Strings are written raw, other scalars through their JSON text,
/// arrays and objects as compact JSON.
impl CsvField for Value {
    fn to_field(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

macro_rules! display_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CsvField for $ty {
                fn to_field(&self) -> Option<Cow<'_, str>> {
                    Some(Cow::Owned(self.to_string()))
                }
            }
        )*
    };
}

display_field!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(42u32.to_field().as_deref(), Some("42"));
        assert_eq!(1.5f64.to_field().as_deref(), Some("1.5"));
        assert_eq!(true.to_field().as_deref(), Some("true"));
        assert_eq!("x".to_field().as_deref(), Some("x"));
    }

    #[test]
    fn test_null_values() {
        let none: Option<&str> = None;
        assert_eq!(none.to_field(), None);
        assert_eq!(Value::Null.to_field(), None);
        assert_eq!(Some("y").to_field().as_deref(), Some("y"));
    }

    #[test]
    fn test_json_values() {
        assert_eq!(json!("text").to_field().as_deref(), Some("text"));
        assert_eq!(json!(7).to_field().as_deref(), Some("7"));
        assert_eq!(json!([1, 2]).to_field().as_deref(), Some("[1,2]"));
    }
}
