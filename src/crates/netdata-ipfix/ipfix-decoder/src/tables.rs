//! IANA enumeration and bitmask tables used by the semantic codecs.
//!
//! Tables are built on first use and live for the rest of the process.
//! Bitmask tables are keyed by the single-bit mask value, enumeration
//! tables by the integral value.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::LazyLock;

/// Immutable integral value -> name table.
pub struct ValueTable {
    name: &'static str,
    entries: FxHashMap<u64, String>,
}

impl ValueTable {
    pub(crate) fn from_pairs(name: &'static str, pairs: &[(u64, &str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect();
        Self { name, entries }
    }

    /// Parses a `key=value` properties resource. Blank lines and lines
    /// starting with `#` or `!` are ignored.
    pub(crate) fn from_properties(name: &'static str, text: &str) -> Self {
        let mut entries = FxHashMap::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!(table = name, "ignoring malformed property line '{}'", line);
                continue;
            };
            match key.trim().parse::<u64>() {
                Ok(key) => {
                    entries.insert(key, value.trim().to_string());
                }
                Err(err) => {
                    tracing::warn!(table = name, "ignoring property key '{}': {}", key, err);
                }
            }
        }
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: u64) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ValueTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTable")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl PartialEq for ValueTable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

pub(crate) static PROTOCOL_NUMBERS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_properties(
        "protocol-numbers",
        include_str!("../resources/protocol-numbers.properties"),
    )
});

pub(crate) static IF_TYPES: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_properties("if-types", include_str!("../resources/if-types.properties"))
});

pub(crate) static TCP_CONTROL_BITS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "tcpControlBits",
        &[
            (0x001, "FIN"),
            (0x002, "SYN"),
            (0x004, "RST"),
            (0x008, "PSH"),
            (0x010, "ACK"),
            (0x020, "URG"),
            (0x040, "ECE"),
            (0x080, "CWR"),
            (0x100, "NS"),
        ],
    )
});

pub(crate) static MPLS_TOP_LABEL_TYPE: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "mplsTopLabelType",
        &[
            (0, "Unknown"),
            (1, "TE-MIDPT"),
            (2, "Pseudowire"),
            (3, "VPN"),
            (4, "BGP"),
            (5, "LDP"),
            (6, "Path Computation Element"),
            (7, "OSPFv2 Segment Routing"),
            (8, "OSPFv3 Segment Routing"),
            (9, "IS-IS Segment Routing"),
            (10, "BGP Segment Routing Prefix-SID"),
        ],
    )
});

pub(crate) static IPV6_EXTENSION_HEADERS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "ipv6ExtensionHeaders",
        &[
            (0x0001, "DST"),
            (0x0002, "HOP"),
            (0x0008, "UNK"),
            (0x0010, "FRA0"),
            (0x0020, "RH"),
            (0x0040, "FRA1"),
            (0x1000, "MOB"),
            (0x2000, "ESP"),
            (0x4000, "AH"),
            (0x8000, "PAY"),
        ],
    )
});

pub(crate) static FLOW_DIRECTION: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs("flowDirection", &[(0, "ingress"), (1, "egress")])
});

pub(crate) static FORWARDING_STATUS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "forwardingStatus",
        &[
            (0, "Unknown"),
            (64, "Forwarded: Unknown"),
            (65, "Forwarded: Fragmented"),
            (66, "Forwarded: Not Fragmented"),
            (128, "Dropped: Unknown"),
            (129, "Dropped: ACL deny"),
            (130, "Dropped: ACL drop"),
            (131, "Dropped: Unroutable"),
            (132, "Dropped: Adjacency"),
            (133, "Dropped: Fragmentation and DF set"),
            (134, "Dropped: Bad header checksum"),
            (135, "Dropped: Bad total Length"),
            (136, "Dropped: Bad header length"),
            (137, "Dropped: bad TTL"),
            (138, "Dropped: Policer"),
            (139, "Dropped: WRED"),
            (140, "Dropped: RPF"),
            (141, "Dropped: For us"),
            (142, "Dropped: Bad output interface"),
            (143, "Dropped: Hardware"),
            (192, "Consumed: Unknown"),
            (193, "Consumed: Terminate Punt Adjacency"),
            (194, "Consumed: Terminate Incomplete Adjacency"),
            (195, "Consumed: Terminate For us"),
        ],
    )
});

pub(crate) static CLASSIFICATION_ENGINE_ID: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "classificationEngineId",
        &[
            (1, "IANA-L3"),
            (2, "PANA-L3"),
            (3, "IANA-L4"),
            (4, "PANA-L4"),
            (6, "USER-Defined"),
            (12, "PANA-L2"),
            (13, "PANA-L7"),
            (18, "ETHERTYPE"),
            (19, "LLC"),
            (20, "PANA-L7-PEN"),
        ],
    )
});

pub(crate) static FLOW_END_REASON: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "flowEndReason",
        &[
            (1, "idle timeout"),
            (2, "active timeout"),
            (3, "end of Flow detected"),
            (4, "forced end"),
            (5, "lack of resources"),
        ],
    )
});

pub(crate) static ICMP_TYPE_IPV4: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "icmpTypeIPv4",
        &[
            (0, "Echo Reply"),
            (3, "Destination Unreachable"),
            (4, "Source Quench"),
            (5, "Redirect"),
            (8, "Echo"),
            (9, "Router Advertisement"),
            (10, "Router Selection"),
            (11, "Time Exceeded"),
            (12, "Parameter Problem"),
            (13, "Timestamp"),
            (14, "Timestamp Reply"),
            (15, "Information Request"),
            (16, "Information Reply"),
            (17, "Address Mask Request"),
            (18, "Address Mask Reply"),
            (30, "Traceroute"),
            (42, "Extended Echo Request"),
            (43, "Extended Echo Reply"),
        ],
    )
});

pub(crate) static ICMP_TYPE_IPV6: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "icmpTypeIPv6",
        &[
            (1, "Destination Unreachable"),
            (2, "Packet Too Big"),
            (3, "Time Exceeded"),
            (4, "Parameter Problem"),
            (128, "Echo Request"),
            (129, "Echo Reply"),
            (130, "Multicast Listener Query"),
            (131, "Multicast Listener Report"),
            (132, "Multicast Listener Done"),
            (133, "Router Solicitation"),
            (134, "Router Advertisement"),
            (135, "Neighbor Solicitation"),
            (136, "Neighbor Advertisement"),
            (137, "Redirect Message"),
            (143, "Version 2 Multicast Listener Report"),
        ],
    )
});

// Bit 0 of the wire octet is the most significant bit: 0x80 RS, 0x40 DF,
// 0x20 MF, low five bits don't-care.
pub(crate) static FRAGMENT_FLAGS_SET: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "fragmentFlags",
        &[
            (0x01, "DC"),
            (0x02, "DC"),
            (0x04, "DC"),
            (0x08, "DC"),
            (0x10, "DC"),
            (0x20, "More Fragments"),
            (0x40, "Don't Fragment"),
            (0x80, "RS"),
        ],
    )
});

pub(crate) static FRAGMENT_FLAGS_CLEAR: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "fragmentFlags (clear)",
        &[
            (0x01, "DC"),
            (0x02, "DC"),
            (0x04, "DC"),
            (0x08, "DC"),
            (0x10, "DC"),
            (0x20, "Last Fragment"),
            (0x40, "May Fragment"),
            (0x80, "RS"),
        ],
    )
});

pub(crate) static NAT_ORIGINATING_ADDRESS_REALM: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "natOriginatingAddressRealm",
        &[(1, "Private"), (2, "Public")],
    )
});

pub(crate) static NAT_EVENT: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "natEvent",
        &[
            (0, "Reserved"),
            (1, "NAT translation create"),
            (2, "NAT translation delete"),
            (3, "NAT Addresses exhausted"),
            (4, "NAT44 session create"),
            (5, "NAT44 session delete"),
            (6, "NAT64 session create"),
            (7, "NAT64 session delete"),
            (8, "NAT44 BIB create"),
            (9, "NAT44 BIB delete"),
            (10, "NAT64 BIB create"),
            (11, "NAT64 BIB delete"),
            (12, "NAT ports exhausted"),
            (13, "Quota Exceeded"),
            (14, "Address binding create"),
            (15, "Address binding delete"),
            (16, "Port block allocation"),
            (17, "Port block de-allocation"),
            (18, "Threshold Reached"),
        ],
    )
});

pub(crate) static FIREWALL_EVENT: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "firewallEvent",
        &[
            (0, "Ignore"),
            (1, "Flow Created"),
            (2, "Flow Deleted"),
            (3, "Flow Denied"),
            (4, "Flow Alert"),
            (5, "Flow Update"),
        ],
    )
});

pub(crate) static BIFLOW_DIRECTION: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "biflowDirection",
        &[
            (0, "arbitrary"),
            (1, "initiator"),
            (2, "reverseInitiator"),
            (3, "perimeter"),
        ],
    )
});

pub(crate) static OBSERVATION_POINT_TYPE: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "observationPointType",
        &[
            (0, "Invalid"),
            (1, "Physical port"),
            (2, "Port channel"),
            (3, "Vlan"),
        ],
    )
});

pub(crate) static ANONYMIZATION_STABILITY_CLASS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "anonymizationStabilityClass",
        &[
            (0, "Undefined"),
            (1, "Session"),
            (2, "Exporter-Collector Pair"),
            (3, "Stable"),
        ],
    )
});

pub(crate) static ANONYMIZATION_FLAGS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs("anonymizationFlags", &[(0x04, "PmA"), (0x08, "LOR")])
});

pub(crate) static ANONYMIZATION_TECHNIQUE: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "anonymizationTechnique",
        &[
            (0, "Undefined"),
            (1, "None"),
            (2, "Precision Degradation/Truncation"),
            (3, "Binning"),
            (4, "Enumeration"),
            (5, "Permutation"),
            (6, "Structured Permutation"),
            (7, "Reverse Truncation"),
            (8, "Noise"),
            (9, "Offset"),
        ],
    )
});

pub(crate) static NAT_TYPE: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "natType",
        &[
            (0, "unknown"),
            (1, "NAT44 translated"),
            (2, "NAT64 translated"),
            (3, "NAT46 translated"),
            (4, "IPv4-->IPv4 (no NAT)"),
            (5, "NAT66 translated"),
            (6, "IPv6-->IPv6 (no NAT)"),
        ],
    )
});

pub(crate) static SELECTOR_ALGORITHM: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "selectorAlgorithm",
        &[
            (1, "Systematic count-based Sampling"),
            (2, "Systematic time-based Sampling"),
            (3, "Random n-out-of-N Sampling"),
            (4, "Uniform probabilistic Sampling"),
            (5, "Property match Filtering"),
            (6, "Hash based Filtering using BOB"),
            (7, "Hash based Filtering using IPSX"),
            (8, "Hash based Filtering using CRC"),
            (9, "Flow-state Dependent Intermediate Flow Selection Process"),
        ],
    )
});

pub(crate) static INFORMATION_ELEMENT_DATA_TYPE: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "informationElementDataType",
        &[
            (0, "octetArray"),
            (1, "unsigned8"),
            (2, "unsigned16"),
            (3, "unsigned32"),
            (4, "unsigned64"),
            (5, "signed8"),
            (6, "signed16"),
            (7, "signed32"),
            (8, "signed64"),
            (9, "float32"),
            (10, "float64"),
            (11, "boolean"),
            (12, "macAddress"),
            (13, "string"),
            (14, "dateTimeSeconds"),
            (15, "dateTimeMilliseconds"),
            (16, "dateTimeMicroseconds"),
            (17, "dateTimeNanoseconds"),
            (18, "ipv4Address"),
            (19, "ipv6Address"),
            (20, "basicList"),
            (21, "subTemplateList"),
            (22, "subTemplateMultiList"),
        ],
    )
});

pub(crate) static INFORMATION_ELEMENT_SEMANTICS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "informationElementSemantics",
        &[
            (0, "default"),
            (1, "quantity"),
            (2, "totalCounter"),
            (3, "deltaCounter"),
            (4, "identifier"),
            (5, "flags"),
            (6, "list"),
            (7, "snmpCounter"),
            (8, "snmpGauge"),
        ],
    )
});

pub(crate) static VALUE_DISTRIBUTION_METHOD: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "valueDistributionMethod",
        &[
            (0, "Unspecified"),
            (1, "Start Interval"),
            (2, "End Interval"),
            (3, "Mid Interval"),
            (4, "Simple Uniform Distribution"),
            (5, "Proportional Uniform Distribution"),
            (6, "Simulated Process"),
            (7, "Direct"),
        ],
    )
});

pub(crate) static DATA_LINK_FRAME_TYPE: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "dataLinkFrameType",
        &[(0x0001, "IEEE802.3 ethernet"), (0x0002, "IEEE802.11 MAC Frame")],
    )
});

pub(crate) static LIST_SEMANTICS: LazyLock<ValueTable> = LazyLock::new(|| {
    ValueTable::from_pairs(
        "listSemantics",
        &[
            (0, "noneOf"),
            (1, "exactlyOneOf"),
            (2, "oneOrMoreOf"),
            (3, "allOf"),
            (4, "ordered"),
            (0xFF, ""),
        ],
    )
});
