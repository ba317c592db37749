//! Field value rendering.
//!
//! Every information element is bound to a [`FieldCodec`] that turns the
//! raw value bytes of a data record into the string stored in the
//! record's attributes.

use crate::error::{DecodeError, Result};
use crate::reader::ByteReader;
use crate::tables::{self, ValueTable};
use crate::template::read_field_spec;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Deepest basicList nesting rendered before the value is rejected.
pub const MAX_LIST_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldCodec {
    /// Unsigned big-endian integer of 1 to 8 octets
    Integral,
    /// Two's complement integer, sign-extended from the field width
    Signed,
    Float32,
    Float64,
    Boolean,
    Ipv4,
    Ipv6,
    Mac,
    OctetString,
    String,
    /// Integral value looked up in an enumeration table
    Mapping(&'static ValueTable),
    /// Bitmask rendered as the `|`-joined names of its bits.
    ///
    /// With an `off` table every bit position contributes a name, picked
    /// from `on` or `off` depending on whether the bit is set.
    BitFlags {
        on: &'static ValueTable,
        off: Option<&'static ValueTable>,
    },
    /// Two low bits select the stability class, the rest are flags
    AnonymizationFlags,
    BasicList,
    Unsupported,
}

impl FieldCodec {
    /// Maps an IANA abstract data type name to its default codec.
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type {
            "unsigned8" | "unsigned16" | "unsigned32" | "unsigned64" => Self::Integral,
            "dateTimeSeconds" | "dateTimeMilliseconds" | "dateTimeMicroseconds"
            | "dateTimeNanoseconds" => Self::Integral,
            "signed8" | "signed16" | "signed32" | "signed64" => Self::Signed,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "boolean" => Self::Boolean,
            "ipv4Address" => Self::Ipv4,
            "ipv6Address" => Self::Ipv6,
            "macAddress" => Self::Mac,
            "string" => Self::String,
            "basicList" => Self::BasicList,
            "subTemplateList" | "subTemplateMultiList" => Self::Unsupported,
            _ => Self::OctetString,
        }
    }

    pub fn render(&self, value: &[u8]) -> Result<String> {
        self.render_nested(value, 0)
    }

    fn render_nested(&self, value: &[u8], depth: usize) -> Result<String> {
        let rendered = match self {
            Self::Integral => match unsigned(value) {
                Some(v) => v.to_string(),
                None => hex(value),
            },
            Self::Signed => match signed(value) {
                Some(v) => v.to_string(),
                None => hex(value),
            },
            Self::Float32 | Self::Float64 => float(value),
            Self::Boolean => match value {
                [1] => "true".to_string(),
                [2] => "false".to_string(),
                _ => "???".to_string(),
            },
            Self::Ipv4 => match <[u8; 4]>::try_from(value) {
                Ok(octets) => Ipv4Addr::from(octets).to_string(),
                Err(_) => hex(value),
            },
            Self::Ipv6 => match <[u8; 16]>::try_from(value) {
                Ok(octets) => Ipv6Addr::from(octets).to_string(),
                Err(_) => hex(value),
            },
            Self::Mac => {
                if value.len() == 6 {
                    value
                        .iter()
                        .map(|b| format!("{b:02x}"))
                        .collect::<Vec<_>>()
                        .join("-")
                } else {
                    hex(value)
                }
            }
            Self::OctetString => hex(value),
            Self::String => String::from_utf8_lossy(value).into_owned(),
            Self::Mapping(table) => match unsigned(value) {
                Some(v) => table
                    .get(v)
                    .map(str::to_string)
                    .unwrap_or_else(|| v.to_string()),
                None => hex(value),
            },
            Self::BitFlags { on, off } => match unsigned(value) {
                Some(v) => bit_names(v, value.len(), on, *off).join("|"),
                None => hex(value),
            },
            Self::AnonymizationFlags => match unsigned(value) {
                Some(v) => anonymization_flags(v, value.len()),
                None => hex(value),
            },
            Self::BasicList => basic_list(value, depth)?,
            Self::Unsupported => "not supported".to_string(),
        };
        Ok(rendered)
    }
}

fn unsigned(value: &[u8]) -> Option<u64> {
    if value.len() > 8 {
        return None;
    }
    Some(value.iter().fold(0_u64, |acc, b| (acc << 8) | u64::from(*b)))
}

fn signed(value: &[u8]) -> Option<i64> {
    let raw = unsigned(value)?;
    if value.is_empty() {
        return Some(0);
    }
    let shift = 64 - value.len() * 8;
    Some(((raw << shift) as i64) >> shift)
}

fn float(value: &[u8]) -> String {
    match value.len() {
        4 => f32::from_bits(unsigned(value).unwrap_or_default() as u32).to_string(),
        8 => f64::from_bits(unsigned(value).unwrap_or_default()).to_string(),
        _ => hex(value),
    }
}

fn hex(value: &[u8]) -> String {
    let mut out = String::with_capacity(2 + value.len() * 2);
    out.push_str("0x");
    for b in value {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn bit_names(
    value: u64,
    width: usize,
    on: &ValueTable,
    off: Option<&ValueTable>,
) -> Vec<String> {
    let bits = (width * 8).min(64);
    let mut names = Vec::new();
    for bit in 0..bits {
        let mask = 1_u64 << bit;
        let set = value & mask != 0;
        match (set, off) {
            (true, _) => names.push(
                on.get(mask)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("0x{mask:x}")),
            ),
            (false, Some(off)) => names.push(
                off.get(mask)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("!0x{mask:x}")),
            ),
            (false, None) => {}
        }
    }
    names
}

fn anonymization_flags(value: u64, width: usize) -> String {
    let class = value & 0x3;
    let class_name = tables::ANONYMIZATION_STABILITY_CLASS
        .get(class)
        .map(str::to_string)
        .unwrap_or_else(|| class.to_string());
    let flags = bit_names(value & !0x3, width, &tables::ANONYMIZATION_FLAGS, None);
    if flags.is_empty() {
        format!("SC={class_name}")
    } else {
        format!("SC={class_name}|{}", flags.join("|"))
    }
}

// semantic (1) | element spec (4 or 8) | values until the field is exhausted
fn basic_list(value: &[u8], depth: usize) -> Result<String> {
    if depth >= MAX_LIST_DEPTH {
        return Err(DecodeError::ListTooDeep {
            limit: MAX_LIST_DEPTH,
        });
    }
    let mut reader = ByteReader::new(value);
    let semantic = reader.read_u8()?;
    let element = read_field_spec(&mut reader)?;

    let mut values = Vec::new();
    while !reader.is_empty() {
        let before = reader.position();
        let raw = reader.read_value(element.declared_length())?;
        values.push(element.codec().render_nested(raw, depth + 1)?);
        if reader.position() == before {
            break;
        }
    }

    let semantic = tables::LIST_SEMANTICS
        .get(u64::from(semantic))
        .map(str::to_string)
        .unwrap_or_else(|| semantic.to_string());
    Ok(format!(
        "{}: {} {{{}}}",
        element.identifier(),
        semantic,
        values.join(", ")
    ))
}
