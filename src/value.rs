//! Typed attribute values for the database's item model.
//!
//! `AttrValue` is the closed, recursive value model of the underlying
//! key-value database: scalar strings, decimal-text numbers, binary blobs,
//! booleans and null, plus three set kinds, ordered lists, and string-keyed
//! maps. The routing layer only ever reads these values (to derive routing
//! seeds); it never interprets or mutates them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A number as the database stores it: arbitrary-precision decimal text.
///
/// The wire representation of numbers is text, and the routing layer must
/// hash exactly the bytes the server would see, so no numeric parsing or
/// normalization happens here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Number(String);

impl Number {
    /// Create a number from its decimal text form.
    pub fn new(text: impl Into<String>) -> Self {
        Number(text.into())
    }

    /// The decimal text form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(value.to_string())
    }
}

impl From<&str> for Number {
    fn from(value: &str) -> Self {
        Number(value.to_string())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An item: a string-keyed map of attribute values.
pub type Item = HashMap<String, AttrValue>;

/// A single attribute value.
///
/// The variant set is closed: these are the only shapes the database's item
/// model supports. Set variants are order-irrelevant; `L` is order-relevant;
/// `M` keys are unique and unordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// UTF-8 string.
    S(String),
    /// Decimal number, kept as text.
    N(Number),
    /// Raw bytes.
    B(Vec<u8>),
    /// Boolean.
    Bool(bool),
    /// Explicit null.
    Null,
    /// Set of strings.
    Ss(Vec<String>),
    /// Set of numbers.
    Ns(Vec<Number>),
    /// Set of binary blobs.
    Bs(Vec<Vec<u8>>),
    /// Ordered list of values.
    L(Vec<AttrValue>),
    /// String-keyed map of values.
    M(HashMap<String, AttrValue>),
}

impl AttrValue {
    /// String value.
    pub fn s(value: impl Into<String>) -> Self {
        AttrValue::S(value.into())
    }

    /// Number value from decimal text.
    pub fn n(value: impl Into<Number>) -> Self {
        AttrValue::N(value.into())
    }

    /// Binary value.
    pub fn b(value: impl Into<Vec<u8>>) -> Self {
        AttrValue::B(value.into())
    }

    /// String-set value.
    pub fn ss<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        AttrValue::Ss(values.into_iter().map(Into::into).collect())
    }

    /// Returns true for the scalar variants (S, N, B, Bool, Null).
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            AttrValue::S(_)
                | AttrValue::N(_)
                | AttrValue::B(_)
                | AttrValue::Bool(_)
                | AttrValue::Null
        )
    }
}
