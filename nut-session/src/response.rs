//! Decoded replies

use crate::error::{NutError, NutResult};

/// A complete `BEGIN LIST` ... `END LIST` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReply {
    /// Fields following `BEGIN LIST`, e.g. `["VAR", "ups1"]`
    pub subject: Vec<String>,
    /// Data lines between the markers, in the order received
    pub rows: Vec<Vec<String>>,
    /// Raw text of the whole block
    pub raw: String,
}

/// One decoded reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Line { fields: Vec<String>, raw: String },
    List(ListReply),
}

impl Response {
    pub fn raw(&self) -> &str {
        match self {
            Response::Line { raw, .. } => raw,
            Response::List(list) => &list.raw,
        }
    }

    /// Take the fields of a single-line reply
    pub fn into_fields(self) -> NutResult<Vec<String>> {
        match self {
            Response::Line { fields, .. } => Ok(fields),
            Response::List(list) => Err(NutError::Protocol(format!(
                "expected a single line, got a list: {}",
                list.raw.trim_end()
            ))),
        }
    }

    /// Take the block of a list reply
    pub fn into_list(self) -> NutResult<ListReply> {
        match self {
            Response::List(list) => Ok(list),
            Response::Line { raw, .. } => Err(NutError::Protocol(format!(
                "expected a list, got: {}",
                raw.trim_end()
            ))),
        }
    }

    /// Check that a single-line reply starts with `OK`
    pub fn expect_ok(self) -> NutResult<()> {
        let raw = self.raw().trim_end().to_string();
        let fields = self.into_fields()?;
        match fields.first().map(String::as_str) {
            Some("OK") => Ok(()),
            _ => Err(NutError::Protocol(format!("expected OK, got: {}", raw))),
        }
    }
}

/// Strip an expected leading sequence of fields
///
/// upsd echoes the request in its replies (`GET VAR ups1 x` is answered by
/// `VAR ups1 x "value"`); this checks the echo and returns what follows.
pub fn strip_prefix<'a>(fields: &'a [String], prefix: &[&str]) -> NutResult<&'a [String]> {
    let matches = fields.len() >= prefix.len()
        && fields.iter().zip(prefix).all(|(field, expected)| field == expected);
    if matches {
        Ok(&fields[prefix.len()..])
    } else {
        Err(NutError::Protocol(format!(
            "unexpected reply `{}`, expected it to start with `{}`",
            fields.join(" "),
            prefix.join(" ")
        )))
    }
}
