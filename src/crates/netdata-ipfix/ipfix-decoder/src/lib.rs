//! Template-driven IPFIX (RFC 7011) decoder.
//!
//! [`IpfixDecoder`] consumes one message at a time and emits [`Record`]s
//! through a [`RecordSink`]. Templates are cached per exporter and
//! observation domain; data sets that arrive before their template are
//! buffered and replayed once it is known.

mod cache;
mod codec;
mod decoder;
mod error;
mod pending;
mod reader;
mod record;
mod registry;
mod tables;
mod template;

pub use cache::{TemplateCache, TemplateKey};
pub use codec::{FieldCodec, MAX_LIST_DEPTH};
pub use decoder::{
    DecodeStats, IPFIX_VERSION, IpfixDecoder, OPTIONS_TEMPLATE_SET_ID, TEMPLATE_SET_ID,
};
pub use error::{DecodeError, Result};
pub use pending::{BufferedDataSet, MissingTemplateBuffer, TemplateKnown};
pub use reader::VARIABLE_LENGTH;
pub use record::{Record, RecordSink};
pub use registry::{InformationElement, InformationElementRegistry};
pub use tables::ValueTable;
pub use template::{OptionsTemplate, Template, TemplateField};
