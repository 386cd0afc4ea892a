//! Line codec for the NUT protocol
//!
//! Requests and replies are single `\n`-terminated lines of fields separated
//! by spaces. A field that is empty or contains whitespace, a double quote or
//! a backslash is wrapped in double quotes, and inside the quotes `"` and `\`
//! are escaped with a backslash:
//!
//! ```text
//! SET VAR ups1 ups.id "rack 2 \"left\""
//! ```
//!
//! Everything here is a pure transformation; reading lines off the socket is
//! the job of [`crate::channel`].

use crate::command::Command;
use crate::error::{NutError, NutResult};

/// Line terminator
pub const LINE_END: u8 = b'\n';

fn needs_quoting(field: &str) -> bool {
    field.is_empty()
        || field
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\')
}

/// Quote a single field if the protocol requires it
pub fn quote(field: &str) -> String {
    if !needs_quoting(field) {
        return field.to_string();
    }
    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for c in field.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn has_line_break(field: &str) -> bool {
    field.contains(['\r', '\n'])
}

/// Encode a command as one request line
///
/// The verb is written as-is; arguments are quoted as needed.
///
/// # Errors
/// Returns `NutError::Protocol` if the verb or an argument contains `\r` or
/// `\n`; quoting cannot keep a line break from ending the request.
pub fn encode(command: &Command) -> NutResult<Vec<u8>> {
    if has_line_break(command.verb()) || command.args().iter().any(|arg| has_line_break(arg)) {
        return Err(NutError::Protocol(format!(
            "line break in request `{}`",
            command.to_string().escape_debug()
        )));
    }

    let mut line = String::from(command.verb());
    for arg in command.args() {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line.push(LINE_END as char);
    Ok(line.into_bytes())
}

/// Split one reply line into fields
///
/// A trailing `\n` or `\r\n` is ignored. Quotes group a field and are removed,
/// a backslash takes the next character literally.
///
/// # Errors
/// Returns `NutError::Protocol` for non-UTF-8 input, an unterminated quote or
/// a dangling backslash.
pub fn decode_line(line: &[u8]) -> NutResult<Vec<String>> {
    let text = std::str::from_utf8(line)
        .map_err(|e| NutError::Protocol(format!("reply is not valid UTF-8: {}", e)))?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_field = false;
    let mut quoted = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().ok_or_else(|| {
                    NutError::Protocol(format!("dangling escape in reply: {}", text))
                })?;
                current.push(escaped);
                in_field = true;
            }
            '"' => {
                quoted = !quoted;
                in_field = true;
            }
            ' ' | '\t' if !quoted => {
                if in_field {
                    fields.push(std::mem::take(&mut current));
                    in_field = false;
                }
            }
            _ => {
                current.push(c);
                in_field = true;
            }
        }
    }

    if quoted {
        return Err(NutError::Protocol(format!(
            "unterminated quote in reply: {}",
            text
        )));
    }
    if in_field {
        fields.push(current);
    }
    Ok(fields)
}
