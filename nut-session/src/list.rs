//! `BEGIN LIST` / `END LIST` framing
//!
//! ```text
//! BEGIN LIST VAR ups1
//! VAR ups1 battery.charge "100"
//! VAR ups1 ups.status "OL"
//! END LIST VAR ups1
//! ```
//!
//! [`ListDecoder`] consumes such a block one line at a time so the command
//! channel can feed it straight from the socket; [`decode_list`] runs the
//! same decoder over lines that are already in memory.

use crate::codec::decode_line;
use crate::error::{NutError, NutResult};
use crate::response::ListReply;
use nut_core::mapper::{ErrorReply, map_error_reply};

const BEGIN: &str = "BEGIN";
const END: &str = "END";
const LIST: &str = "LIST";

fn marker<'a>(fields: &'a [String], keyword: &str) -> Option<&'a [String]> {
    match fields {
        [first, second, subject @ ..] if first == keyword && second == LIST => Some(subject),
        _ => None,
    }
}

/// Incremental list decoder
#[derive(Debug)]
pub struct ListDecoder {
    context: String,
    subject: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    raw: String,
}

impl ListDecoder {
    /// Create a decoder; `context` names the request in error messages
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            subject: None,
            rows: Vec::new(),
            raw: String::new(),
        }
    }

    /// Feed one raw line
    ///
    /// # Returns
    /// `Some(reply)` once the matching `END LIST` line has been consumed,
    /// `None` while more lines are needed.
    ///
    /// # Errors
    /// - the mapped error if the first line is an `ERR` reply
    /// - `NutError::Protocol` if the first line is not a begin marker, if the
    ///   end marker names another subject, or if a line cannot be decoded
    pub fn push_line(&mut self, line: &[u8]) -> NutResult<Option<ListReply>> {
        let fields = decode_line(line)?;
        self.raw.push_str(&String::from_utf8_lossy(line));

        let Some(subject) = &self.subject else {
            if let Some(reply) = ErrorReply::from_fields(&fields) {
                return Err(map_error_reply(&reply, &self.context));
            }
            let subject = marker(&fields, BEGIN).filter(|s| !s.is_empty()).ok_or_else(|| {
                NutError::Protocol(format!(
                    "expected BEGIN LIST in reply to `{}`, got `{}`",
                    self.context,
                    fields.join(" ")
                ))
            })?;
            self.subject = Some(subject.to_vec());
            return Ok(None);
        };

        if let Some(end_subject) = marker(&fields, END) {
            if end_subject != subject.as_slice() {
                return Err(NutError::Protocol(format!(
                    "END LIST {} does not match BEGIN LIST {}",
                    end_subject.join(" "),
                    subject.join(" ")
                )));
            }
            return Ok(Some(ListReply {
                subject: self.subject.take().unwrap_or_default(),
                rows: std::mem::take(&mut self.rows),
                raw: std::mem::take(&mut self.raw),
            }));
        }

        self.rows.push(fields);
        Ok(None)
    }

    /// Whether the begin marker has been seen
    pub fn started(&self) -> bool {
        self.subject.is_some()
    }

    /// Report that no more lines will arrive
    ///
    /// Always an error: a decoder that produced its reply is not finished again.
    pub fn finish(self) -> NutError {
        match self.subject {
            Some(subject) => NutError::Protocol(format!(
                "list ended before END LIST {}",
                subject.join(" ")
            )),
            None => NutError::Protocol(format!("empty reply to `{}`", self.context)),
        }
    }
}

/// Decode a complete list block from in-memory lines
///
/// Lines after the end marker are ignored.
pub fn decode_list<I, L>(lines: I) -> NutResult<ListReply>
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let mut decoder = ListDecoder::new("LIST");
    for line in lines {
        if let Some(reply) = decoder.push_line(line.as_ref())? {
            return Ok(reply);
        }
    }
    Err(decoder.finish())
}
