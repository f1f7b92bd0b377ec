//! Support for the JSON output format.
//!
//! The JSON format is a text-based format for representing structured data.
//! The support for it is based on building a [`JSONValue`] object recursively and then
//! writing it using the [`Display`] trait. The coverage dump in [`crate::coverage`] is
//! the only JSON document the crate produces.

use std::fmt::Display;

//-----------------------------------------------------------------------------

/// A structured JSON value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JSONValue {
    /// A boolean value.
    Boolean(bool),

    /// A string value.
    String(String),

    /// A number value.
    Number(usize),

    /// An array of JSON values.
    Array(Vec<JSONValue>),

    /// A JSON object storing a list of JSON values with string names.
    Object(Vec<(String, JSONValue)>),
}

impl Display for JSONValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JSONValue::Boolean(b) => write!(f, "{}", b),
            JSONValue::String(s) => write!(f, "\"{}\"", s),
            JSONValue::Number(n) => write!(f, "{}", n),
            JSONValue::Array(v) => {
                write!(f, "[")?;
                let mut first = true;
                for value in v.iter() {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            },
            JSONValue::Object(v) => {
                write!(f, "{{")?;
                let mut first = true;
                for (key, value) in v.iter() {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", key, value)?;
                }
                write!(f, "}}")
            },
        }
    }
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_values() {
        assert_eq!(JSONValue::Boolean(true).to_string(), "true");
        assert_eq!(JSONValue::String(String::from("name")).to_string(), "\"name\"");
        assert_eq!(JSONValue::Number(42).to_string(), "42");

        let array = JSONValue::Array(vec![JSONValue::Number(1), JSONValue::Number(2)]);
        assert_eq!(array.to_string(), "[1, 2]");

        let object = JSONValue::Object(vec![
            (String::from("first"), JSONValue::Number(1)),
            (String::from("second"), array),
        ]);
        assert_eq!(object.to_string(), "{\"first\": 1, \"second\": [1, 2]}");
    }
}

//-----------------------------------------------------------------------------
