//! IPFIX message decoder.
//!
//! A message is a fixed header followed by sets. Template and options
//! template sets update the shared caches, data sets are decoded against
//! them, and data sets whose template is not known yet are buffered and
//! replayed after every message.

use crate::cache::{TemplateCache, TemplateKey};
use crate::error::{DecodeError, Result};
use crate::pending::{BufferedDataSet, MissingTemplateBuffer};
use crate::reader::ByteReader;
use crate::record::{Record, RecordSink};
use crate::template::{OptionsTemplate, Template};

pub const IPFIX_VERSION: u16 = 10;
pub const TEMPLATE_SET_ID: u16 = 2;
pub const OPTIONS_TEMPLATE_SET_ID: u16 = 3;

const MESSAGE_HEADER_LENGTH: usize = 16;
const SET_HEADER_LENGTH: usize = 4;
const FLOW_RECORD_LABEL: &str = "Flow record";
const OPTIONS_RECORD_LABEL: &str = "Options record for ";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
    pub packets: u64,
    pub decode_errors: u64,
    pub template_records: u64,
    pub options_template_records: u64,
    pub template_withdrawals: u64,
    pub data_records: u64,
    pub options_records: u64,
    pub stale_sets: u64,
    pub buffered_sets: u64,
    /// Buffered data sets dropped to respect the pending limit
    pub evicted_sets: u64,
    pub replayed_sets: u64,
}

impl DecodeStats {
    pub fn merge(&mut self, other: &DecodeStats) {
        self.packets += other.packets;
        self.decode_errors += other.decode_errors;
        self.template_records += other.template_records;
        self.options_template_records += other.options_template_records;
        self.template_withdrawals += other.template_withdrawals;
        self.data_records += other.data_records;
        self.options_records += other.options_records;
        self.stale_sets += other.stale_sets;
        self.buffered_sets += other.buffered_sets;
        self.evicted_sets += other.evicted_sets;
        self.replayed_sets += other.replayed_sets;
    }
}

/// Per-message values shared by every set of the message.
#[derive(Debug, Clone, Copy)]
struct ExportContext {
    export_time_ms: i64,
    sequence_number: u32,
    observation_domain_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataSetOrigin {
    Packet,
    Replay,
}

/// Template-driven IPFIX decoder.
///
/// The decoder is `Send + Sync`: messages from any number of exporters
/// can be decoded concurrently through a shared reference.
#[derive(Debug)]
pub struct IpfixDecoder {
    templates: TemplateCache<Template>,
    options_templates: TemplateCache<OptionsTemplate>,
    pending: MissingTemplateBuffer,
}

impl Default for IpfixDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl IpfixDecoder {
    pub fn new() -> Self {
        Self::with_max_pending_sets(0)
    }

    /// Decoder whose missing-template buffer keeps at most
    /// `max_pending_sets` data sets, evicting the oldest. Zero keeps
    /// every set.
    pub fn with_max_pending_sets(max_pending_sets: usize) -> Self {
        let templates = TemplateCache::new();
        let options_templates = TemplateCache::new();
        let known_templates = templates.clone();
        let known_options = options_templates.clone();
        let pending = MissingTemplateBuffer::new(
            Box::new(move |key: &TemplateKey| {
                known_templates.contains(key) || known_options.contains(key)
            }),
            max_pending_sets,
        );
        Self {
            templates,
            options_templates,
            pending,
        }
    }

    pub fn templates(&self) -> &TemplateCache<Template> {
        &self.templates
    }

    pub fn options_templates(&self) -> &TemplateCache<OptionsTemplate> {
        &self.options_templates
    }

    pub fn pending_sets(&self) -> usize {
        self.pending.len()
    }

    /// Decodes the message starting at `buffer[start]`, emitting records
    /// into `sink`, then replays buffered data sets whose template is
    /// now known.
    ///
    /// A malformed message is logged and abandoned at the point of
    /// failure. Records already emitted and templates already stored are
    /// kept.
    pub fn decode<S>(&self, buffer: &[u8], start: usize, source: &str, sink: &mut S) -> DecodeStats
    where
        S: RecordSink + ?Sized,
    {
        let mut stats = DecodeStats {
            packets: 1,
            ..DecodeStats::default()
        };
        if let Err(err) = self.decode_message(buffer, start, source, sink, &mut stats) {
            stats.decode_errors += 1;
            tracing::warn!(source, "failed to decode IPFIX message: {}", err);
        }
        let replay = self.check_templates(sink);
        stats.merge(&replay);
        stats
    }

    /// Like [`IpfixDecoder::decode`] but returns the error instead of
    /// logging it. Buffered sets are only replayed on success.
    pub fn try_decode<S>(
        &self,
        buffer: &[u8],
        start: usize,
        source: &str,
        sink: &mut S,
    ) -> Result<DecodeStats>
    where
        S: RecordSink + ?Sized,
    {
        let mut stats = DecodeStats {
            packets: 1,
            ..DecodeStats::default()
        };
        self.decode_message(buffer, start, source, sink, &mut stats)?;
        let replay = self.check_templates(sink);
        stats.merge(&replay);
        Ok(stats)
    }

    /// Replays every buffered data set whose template has since been
    /// defined. Replayed records keep their original source and
    /// timestamp.
    pub fn check_templates<S>(&self, sink: &mut S) -> DecodeStats
    where
        S: RecordSink + ?Sized,
    {
        let mut stats = DecodeStats::default();
        let replayed = self.pending.check_templates(|key, set| {
            let context = ExportContext {
                export_time_ms: set.export_time_ms,
                sequence_number: set.sequence_number,
                observation_domain_id: key.observation_domain_id,
            };
            let reader = ByteReader::new(&set.payload);
            tracing::debug!(
                source = %key.source,
                observation_domain_id = key.observation_domain_id,
                template_id = key.template_id,
                "replaying buffered data set"
            );
            self.decode_data_set(
                set.set_id,
                reader,
                &context,
                &key.source,
                DataSetOrigin::Replay,
                sink,
                &mut stats,
            )
        });
        stats.replayed_sets += replayed as u64;
        stats
    }

    fn decode_message<S>(
        &self,
        buffer: &[u8],
        start: usize,
        source: &str,
        sink: &mut S,
        stats: &mut DecodeStats,
    ) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let mut header = ByteReader::with_bounds(buffer, start, buffer.len());
        let message_start = header.position();

        let version = header.read_u16()?;
        if version != IPFIX_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let length = header.read_u16()?;
        if (length as usize) < MESSAGE_HEADER_LENGTH {
            return Err(DecodeError::InvalidMessageLength(length));
        }
        let context = ExportContext {
            export_time_ms: i64::from(header.read_u32()?) * 1000,
            sequence_number: header.read_u32()?,
            observation_domain_id: header.read_u32()?,
        };

        let mut message = ByteReader::with_bounds(
            buffer,
            header.position(),
            message_start + length as usize,
        );

        while message.remaining() >= SET_HEADER_LENGTH {
            let set_id = message.read_u16()?;
            let set_length = message.read_u16()?;
            if set_length == 0 {
                break;
            }
            if (set_length as usize) < SET_HEADER_LENGTH {
                return Err(DecodeError::InvalidSetLength {
                    set_id,
                    length: set_length,
                });
            }
            let mut set = message.split(set_length as usize - SET_HEADER_LENGTH)?;

            match set_id {
                TEMPLATE_SET_ID => self.decode_template_set(&mut set, &context, source, stats)?,
                OPTIONS_TEMPLATE_SET_ID => {
                    self.decode_options_template_set(&mut set, &context, source, stats)?
                }
                _ => self.decode_data_set(
                    set_id,
                    set,
                    &context,
                    source,
                    DataSetOrigin::Packet,
                    sink,
                    stats,
                )?,
            }
        }

        Ok(())
    }

    fn decode_template_set(
        &self,
        set: &mut ByteReader<'_>,
        context: &ExportContext,
        source: &str,
        stats: &mut DecodeStats,
    ) -> Result<()> {
        while set.remaining() >= SET_HEADER_LENGTH {
            let template_id = set.read_u16()?;
            if template_id == 0 {
                break;
            }
            let field_count = set.read_u16()?;
            if field_count == 0 {
                stats.template_withdrawals += 1;
                tracing::debug!(source, template_id, "ignoring template withdrawal");
                continue;
            }

            let template = Template::read(set, field_count, context.export_time_ms)?;
            tracing::debug!(
                source,
                observation_domain_id = context.observation_domain_id,
                template_id,
                "defined template with {} fields",
                template.fields().len()
            );
            self.templates.put(
                TemplateKey::new(context.observation_domain_id, template_id, source),
                template,
            );
            stats.template_records += 1;
        }
        Ok(())
    }

    fn decode_options_template_set(
        &self,
        set: &mut ByteReader<'_>,
        context: &ExportContext,
        source: &str,
        stats: &mut DecodeStats,
    ) -> Result<()> {
        while set.remaining() >= SET_HEADER_LENGTH {
            let template_id = set.read_u16()?;
            if template_id == 0 {
                break;
            }
            let field_count = set.read_u16()?;
            if field_count == 0 {
                stats.template_withdrawals += 1;
                tracing::debug!(source, template_id, "ignoring options template withdrawal");
                continue;
            }
            let scope_field_count = set.read_u16()?;
            if scope_field_count > field_count {
                return Err(DecodeError::ScopeFieldCount {
                    template_id,
                    scope_field_count,
                    field_count,
                });
            }

            let scope = Template::read(set, scope_field_count, context.export_time_ms)?;
            let option = Template::read(
                set,
                field_count - scope_field_count,
                context.export_time_ms,
            )?;
            tracing::debug!(
                source,
                observation_domain_id = context.observation_domain_id,
                template_id,
                "defined options template with {} scope and {} option fields",
                scope.fields().len(),
                option.fields().len()
            );
            self.options_templates.put(
                TemplateKey::new(context.observation_domain_id, template_id, source),
                OptionsTemplate::new(scope, option),
            );
            stats.options_template_records += 1;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_data_set<S>(
        &self,
        set_id: u16,
        mut set: ByteReader<'_>,
        context: &ExportContext,
        source: &str,
        origin: DataSetOrigin,
        sink: &mut S,
        stats: &mut DecodeStats,
    ) -> Result<()>
    where
        S: RecordSink + ?Sized,
    {
        let key = TemplateKey::new(context.observation_domain_id, set_id, source);

        if let Some(template) = self.templates.get(&key) {
            if origin == DataSetOrigin::Packet && template.declared_at() > context.export_time_ms {
                stats.stale_sets += 1;
                tracing::debug!(source, template_id = set_id, "skipping data set older than its template");
                return Ok(());
            }
            return decode_flow_records(&template, &mut set, context, source, sink, stats);
        }

        if let Some(options) = self.options_templates.get(&key) {
            if origin == DataSetOrigin::Packet && options.declared_at() > context.export_time_ms {
                stats.stale_sets += 1;
                tracing::debug!(source, template_id = set_id, "skipping options data set older than its template");
                return Ok(());
            }
            return decode_options_records(&options, &mut set, context, source, sink, stats);
        }

        let payload = set.read_bytes(set.remaining())?.to_vec();
        tracing::debug!(
            source,
            observation_domain_id = context.observation_domain_id,
            template_id = set_id,
            "buffering {} byte data set until its template arrives",
            payload.len()
        );
        let evicted = self.pending.put(
            key,
            BufferedDataSet {
                set_id,
                payload,
                export_time_ms: context.export_time_ms,
                sequence_number: context.sequence_number,
            },
        );
        stats.buffered_sets += 1;
        if evicted.is_some() {
            stats.evicted_sets += 1;
        }
        Ok(())
    }
}

fn decode_flow_records<S>(
    template: &Template,
    set: &mut ByteReader<'_>,
    context: &ExportContext,
    source: &str,
    sink: &mut S,
    stats: &mut DecodeStats,
) -> Result<()>
where
    S: RecordSink + ?Sized,
{
    let record_length = template.estimated_length();
    while record_length > 0 && set.remaining() >= record_length {
        let mut attributes = Vec::with_capacity(template.fields().len() + 2);
        attributes.push((
            "sequenceNumber".to_string(),
            context.sequence_number.to_string(),
        ));
        attributes.push((
            "observationDomainId".to_string(),
            context.observation_domain_id.to_string(),
        ));
        template.decode_fields(set, &mut attributes)?;

        sink.accept(Record {
            label: FLOW_RECORD_LABEL.to_string(),
            source: source.to_string(),
            timestamp: context.export_time_ms,
            attributes,
        });
        stats.data_records += 1;
    }
    Ok(())
}

fn decode_options_records<S>(
    options: &OptionsTemplate,
    set: &mut ByteReader<'_>,
    context: &ExportContext,
    source: &str,
    sink: &mut S,
    stats: &mut DecodeStats,
) -> Result<()>
where
    S: RecordSink + ?Sized,
{
    let record_length = options.estimated_length();
    while record_length > 0 && set.remaining() >= record_length {
        let mut scope = Vec::with_capacity(options.scope().fields().len());
        options.scope().decode_fields(set, &mut scope)?;
        let mut attributes = Vec::with_capacity(options.option().fields().len());
        options.option().decode_fields(set, &mut attributes)?;

        let scope = scope
            .iter()
            .map(|(name, value)| format!("{name} {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        sink.accept(Record {
            label: format!("{OPTIONS_RECORD_LABEL}{scope}"),
            source: source.to_string(),
            timestamp: context.export_time_ms,
            attributes,
        });
        stats.options_records += 1;
    }
    Ok(())
}
