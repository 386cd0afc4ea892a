//! Value objects assembled from daemon replies

use std::fmt;

/// A UPS monitored by the daemon (`LIST UPS`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: String,
    pub description: String,
}

impl Device {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A device variable such as `battery.charge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
    pub kind: Option<VariableType>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: None,
            kind: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_kind(mut self, kind: VariableType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Parse the value as a number, as reported for readings like `battery.charge`
    pub fn as_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }
}

/// An instant command supported by a device (`LIST CMD`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantCommand {
    pub name: String,
    pub description: Option<String>,
}

impl InstantCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A client attached to a device (`LIST CLIENT`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub device: String,
    pub address: String,
}

/// Value format reported by `GET TYPE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueFormat {
    Number,
    /// Free text with the maximum length the driver accepts
    String(usize),
    Enum,
    Range,
    /// A token this client does not know, kept verbatim
    Unknown(String),
}

/// Metadata of a variable as reported by `GET TYPE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableType {
    pub writable: bool,
    pub format: ValueFormat,
}

impl VariableType {
    /// Parse the type tokens following `TYPE <ups> <var>`
    ///
    /// # Format
    /// ```text
    /// TYPE ups1 input.transfer.low ENUM
    /// TYPE ups1 ups.id RW STRING:32
    /// TYPE ups1 battery.charge NUMBER
    /// ```
    /// A reply without a format token is treated as a number.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut writable = false;
        let mut format = None;
        for token in tokens {
            let token = token.as_ref();
            match token {
                "RW" => writable = true,
                "NUMBER" => format = Some(ValueFormat::Number),
                "ENUM" => format = Some(ValueFormat::Enum),
                "RANGE" => format = Some(ValueFormat::Range),
                other => {
                    let parsed = other
                        .strip_prefix("STRING:")
                        .and_then(|len| len.parse().ok())
                        .map(ValueFormat::String)
                        .unwrap_or_else(|| ValueFormat::Unknown(other.to_string()));
                    format = Some(parsed);
                }
            }
        }
        Self {
            writable,
            format: format.unwrap_or(ValueFormat::Number),
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.writable {
            f.write_str("RW ")?;
        }
        match &self.format {
            ValueFormat::Number => f.write_str("NUMBER"),
            ValueFormat::String(len) => write!(f, "STRING:{}", len),
            ValueFormat::Enum => f.write_str("ENUM"),
            ValueFormat::Range => f.write_str("RANGE"),
            ValueFormat::Unknown(token) => f.write_str(token),
        }
    }
}
