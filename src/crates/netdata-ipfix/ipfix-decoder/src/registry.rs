//! IANA information element registry.
//!
//! The registry is parsed once from the bundled CSV resource. Element
//! codecs default to the one implied by the abstract data type, with
//! semantic overrides for elements whose values are enumerations or
//! bitmasks.

use crate::codec::FieldCodec;
use crate::tables;
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq)]
pub struct InformationElement {
    pub id: u16,
    pub name: String,
    pub codec: FieldCodec,
}

#[derive(Debug, Default)]
pub struct InformationElementRegistry {
    elements: FxHashMap<u16, InformationElement>,
}

static GLOBAL: LazyLock<InformationElementRegistry> = LazyLock::new(|| {
    let registry =
        InformationElementRegistry::parse(include_str!("../resources/ipfix-information-elements.csv"));
    tracing::debug!("loaded {} IPFIX information elements", registry.len());
    registry
});

impl InformationElementRegistry {
    /// Process-wide registry built from the bundled IANA table.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Parses `id,name,dataType` lines. Lines starting with `#` and
    /// malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut elements = FxHashMap::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut columns = line.split(',').map(str::trim);
            let (Some(id), Some(name), data_type) =
                (columns.next(), columns.next(), columns.next())
            else {
                continue;
            };
            let Ok(id) = id.parse::<u16>() else {
                tracing::warn!("ignoring information element line '{}'", line);
                continue;
            };
            let codec = override_codec(id)
                .unwrap_or_else(|| FieldCodec::from_data_type(data_type.unwrap_or_default()));
            elements.insert(
                id,
                InformationElement {
                    id,
                    name: name.to_string(),
                    codec,
                },
            );
        }
        Self { elements }
    }

    pub fn get(&self, id: u16) -> Option<&InformationElement> {
        self.elements.get(&id)
    }

    /// Name and codec for `id`; unknown elements are named by their
    /// numeric id and rendered as octet strings.
    pub fn resolve(&self, id: u16) -> (String, FieldCodec) {
        match self.elements.get(&id) {
            Some(element) => (element.name.clone(), element.codec),
            None => (id.to_string(), FieldCodec::OctetString),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

fn override_codec(id: u16) -> Option<FieldCodec> {
    use FieldCodec::{AnonymizationFlags, BitFlags, Mapping};

    let codec = match id {
        4 => Mapping(&tables::PROTOCOL_NUMBERS),
        6 => BitFlags {
            on: &tables::TCP_CONTROL_BITS,
            off: None,
        },
        46 => Mapping(&tables::MPLS_TOP_LABEL_TYPE),
        61 => Mapping(&tables::FLOW_DIRECTION),
        64 => BitFlags {
            on: &tables::IPV6_EXTENSION_HEADERS,
            off: None,
        },
        89 => Mapping(&tables::FORWARDING_STATUS),
        101 => Mapping(&tables::CLASSIFICATION_ENGINE_ID),
        136 => Mapping(&tables::FLOW_END_REASON),
        176 => Mapping(&tables::ICMP_TYPE_IPV4),
        178 => Mapping(&tables::ICMP_TYPE_IPV6),
        197 => BitFlags {
            on: &tables::FRAGMENT_FLAGS_SET,
            off: Some(&tables::FRAGMENT_FLAGS_CLEAR),
        },
        215 => Mapping(&tables::PROTOCOL_NUMBERS),
        229 => Mapping(&tables::NAT_ORIGINATING_ADDRESS_REALM),
        230 => Mapping(&tables::NAT_EVENT),
        233 => Mapping(&tables::FIREWALL_EVENT),
        239 => Mapping(&tables::BIFLOW_DIRECTION),
        277 => Mapping(&tables::OBSERVATION_POINT_TYPE),
        285 => AnonymizationFlags,
        286 => Mapping(&tables::ANONYMIZATION_TECHNIQUE),
        297 => Mapping(&tables::NAT_TYPE),
        304 => Mapping(&tables::SELECTOR_ALGORITHM),
        339 => Mapping(&tables::INFORMATION_ELEMENT_DATA_TYPE),
        344 => Mapping(&tables::INFORMATION_ELEMENT_SEMANTICS),
        368 | 369 => Mapping(&tables::IF_TYPES),
        384 => Mapping(&tables::VALUE_DISTRIBUTION_METHOD),
        408 => Mapping(&tables::DATA_LINK_FRAME_TYPE),
        _ => return None,
    };
    Some(codec)
}
