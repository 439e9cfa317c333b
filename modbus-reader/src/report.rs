use serde::Serialize;

use crate::decoder::{DecodeError, DecodedValue};
use crate::scan::{RegisterError, RegisterReport};

/// ANSI escape sequences used by the text output.
pub mod style {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
}

pub const BANNER: &str = "MODBUS READER (Goodwe MS Series)";

/// Wraps text in ANSI styles unless disabled.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn paint(&self, styles: &[&str], text: &str) -> String {
        if self.color {
            format!("{}{text}{}", styles.concat(), style::RESET)
        } else {
            text.to_string()
        }
    }

    pub fn banner(&self) -> String {
        self.paint(&[style::MAGENTA, style::BOLD], BANNER)
    }

    /// One line of text output for a register.
    pub fn line(&self, report: &RegisterReport<'_>) -> String {
        let name = &report.descriptor.name;
        match &report.outcome {
            Ok(value) => {
                let label = self.paint(&[style::CYAN], &format!("{name}:"));
                format!("{label} {value}")
            }
            Err(RegisterError::Decode(DecodeError::UnsupportedType { data_type, .. })) => self
                .paint(
                    &[style::YELLOW],
                    &format!("Unsupported type {data_type} for {name}"),
                ),
            Err(err) => self.paint(&[style::RED], &format!("Error reading {name}: {err}")),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum JsonValue {
    Number(f64),
    Text(String),
}

/// Machine-readable form of a [`RegisterReport`].
#[derive(Debug, Serialize)]
pub struct JsonRecord<'a> {
    pub address: u16,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub data_type: &'a str,
    pub property: &'a str,
    pub units: &'a str,
    pub range: &'a str,
    pub note: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> JsonRecord<'a> {
    pub fn new(report: &'a RegisterReport<'a>) -> Self {
        let desc = report.descriptor;
        let (value, kind, error) = match &report.outcome {
            Ok(DecodedValue::Measurement { value, .. }) => {
                // two decimal places, as in the text output
                (Some(JsonValue::Number((value * 100.0).round() / 100.0)), None, None)
            }
            Ok(DecodedValue::Text(text)) => (Some(JsonValue::Text(text.clone())), None, None),
            Err(err) => (None, Some(error_kind(err)), Some(err.to_string())),
        };

        Self {
            address: desc.address,
            name: &desc.name,
            data_type: &desc.data_type,
            property: &desc.property,
            units: &desc.units,
            range: &desc.valid_range,
            note: &desc.note,
            value,
            kind,
            error,
        }
    }
}

pub fn error_kind(err: &RegisterError) -> &'static str {
    match err {
        RegisterError::Transport { .. } => "transport",
        RegisterError::Decode(DecodeError::TruncatedRead { .. }) => "truncated_read",
        RegisterError::Decode(DecodeError::UnsupportedType { .. }) => "unsupported_type",
        RegisterError::Decode(DecodeError::DivisionFault { .. }) => "division_fault",
    }
}
