//! Template model: field specifiers, templates and options templates.

use crate::codec::FieldCodec;
use crate::error::Result;
use crate::reader::{ByteReader, VARIABLE_LENGTH};
use crate::registry::InformationElementRegistry;

const ENTERPRISE_BIT: u16 = 0x8000;

/// One field specifier of a template, resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateField {
    identifier: String,
    codec: FieldCodec,
    declared_length: u16,
}

impl TemplateField {
    pub fn new(identifier: impl Into<String>, codec: FieldCodec, declared_length: u16) -> Self {
        Self {
            identifier: identifier.into(),
            codec,
            declared_length,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn codec(&self) -> FieldCodec {
        self.codec
    }

    pub fn declared_length(&self) -> u16 {
        self.declared_length
    }

    pub fn is_variable_length(&self) -> bool {
        self.declared_length == VARIABLE_LENGTH
    }
}

/// Reads one field specifier.
///
/// Enterprise-specific elements are named `<enterprise>.<id>` and always
/// use the integral codec.
pub(crate) fn read_field_spec(reader: &mut ByteReader<'_>) -> Result<TemplateField> {
    let raw_id = reader.read_u16()?;
    let declared_length = reader.read_u16()?;

    if raw_id & ENTERPRISE_BIT != 0 {
        let element_id = raw_id & !ENTERPRISE_BIT;
        let enterprise = reader.read_u32()?;
        return Ok(TemplateField::new(
            format!("{enterprise}.{element_id}"),
            FieldCodec::Integral,
            declared_length,
        ));
    }

    let (identifier, codec) = InformationElementRegistry::global().resolve(raw_id);
    Ok(TemplateField::new(identifier, codec, declared_length))
}

/// Ordered field layout of a data record.
///
/// A template is immutable once built. Redefinitions replace it in the
/// cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    fields: Vec<TemplateField>,
    declared_at: i64,
    estimated_length: usize,
}

impl Template {
    pub fn new(fields: Vec<TemplateField>, declared_at: i64) -> Self {
        let estimated_length = fields
            .iter()
            .map(|field| {
                if field.is_variable_length() {
                    2
                } else {
                    field.declared_length as usize
                }
            })
            .sum();
        Self {
            fields,
            declared_at,
            estimated_length,
        }
    }

    pub(crate) fn read(
        reader: &mut ByteReader<'_>,
        field_count: u16,
        declared_at: i64,
    ) -> Result<Self> {
        let fields = (0..field_count)
            .map(|_| read_field_spec(reader))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(fields, declared_at))
    }

    pub fn fields(&self) -> &[TemplateField] {
        &self.fields
    }

    /// Export time, in milliseconds, of the packet that declared this template.
    pub fn declared_at(&self) -> i64 {
        self.declared_at
    }

    /// Lower bound of the encoded record size, counting variable-length
    /// fields as two bytes.
    pub fn estimated_length(&self) -> usize {
        self.estimated_length
    }

    /// Decodes one record's fields into `(identifier, value)` pairs.
    pub(crate) fn decode_fields(
        &self,
        reader: &mut ByteReader<'_>,
        out: &mut Vec<(String, String)>,
    ) -> Result<()> {
        for field in &self.fields {
            let value = reader.read_value(field.declared_length)?;
            out.push((field.identifier.clone(), field.codec.render(value)?));
        }
        Ok(())
    }
}

/// Options template: scope fields qualify the option fields that follow.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsTemplate {
    scope: Template,
    option: Template,
}

impl OptionsTemplate {
    pub fn new(scope: Template, option: Template) -> Self {
        Self { scope, option }
    }

    pub fn scope(&self) -> &Template {
        &self.scope
    }

    pub fn option(&self) -> &Template {
        &self.option
    }

    pub fn declared_at(&self) -> i64 {
        self.scope.declared_at
    }

    pub fn estimated_length(&self) -> usize {
        self.scope.estimated_length + self.option.estimated_length
    }
}
