use ipfix_decoder::{
    DecodeStats, IpfixDecoder, MAX_LIST_DEPTH, OPTIONS_TEMPLATE_SET_ID, Record, TEMPLATE_SET_ID,
    TemplateKey, VARIABLE_LENGTH,
};
use std::sync::Arc;
use std::thread;

const DOMAIN: u32 = 7;

#[derive(Default)]
struct MessageBuilder {
    sets: Vec<u8>,
}

impl MessageBuilder {
    fn template(mut self, template_id: u16, fields: &[(u16, u16)]) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(&template_id.to_be_bytes());
        body.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for (id, length) in fields {
            body.extend_from_slice(&id.to_be_bytes());
            body.extend_from_slice(&length.to_be_bytes());
        }
        self.push_set(TEMPLATE_SET_ID, &body);
        self
    }

    fn options_template(
        mut self,
        template_id: u16,
        scope: &[(u16, u16)],
        options: &[(u16, u16)],
    ) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(&template_id.to_be_bytes());
        body.extend_from_slice(&((scope.len() + options.len()) as u16).to_be_bytes());
        body.extend_from_slice(&(scope.len() as u16).to_be_bytes());
        for (id, length) in scope.iter().chain(options) {
            body.extend_from_slice(&id.to_be_bytes());
            body.extend_from_slice(&length.to_be_bytes());
        }
        self.push_set(OPTIONS_TEMPLATE_SET_ID, &body);
        self
    }

    fn raw_template_set(mut self, body: &[u8]) -> Self {
        self.push_set(TEMPLATE_SET_ID, body);
        self
    }

    fn data(mut self, template_id: u16, body: &[u8]) -> Self {
        self.push_set(template_id, body);
        self
    }

    fn push_set(&mut self, set_id: u16, body: &[u8]) {
        self.sets.extend_from_slice(&set_id.to_be_bytes());
        self.sets
            .extend_from_slice(&((body.len() + 4) as u16).to_be_bytes());
        self.sets.extend_from_slice(body);
    }

    fn build(self, export_time: u32, sequence: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&10_u16.to_be_bytes());
        out.extend_from_slice(&((self.sets.len() + 16) as u16).to_be_bytes());
        out.extend_from_slice(&export_time.to_be_bytes());
        out.extend_from_slice(&sequence.to_be_bytes());
        out.extend_from_slice(&DOMAIN.to_be_bytes());
        out.extend_from_slice(&self.sets);
        out
    }
}

fn decode(decoder: &IpfixDecoder, packet: &[u8], source: &str) -> (Vec<Record>, DecodeStats) {
    let mut records = Vec::new();
    let stats = decoder.decode(packet, 0, source, &mut records);
    (records, stats)
}

fn decode_single(fields: &[(u16, u16)], data: &[u8]) -> Record {
    let decoder = IpfixDecoder::new();
    let packet = MessageBuilder::default()
        .template(256, fields)
        .data(256, data)
        .build(1_000, 1);
    let (records, stats) = decode(&decoder, &packet, "192.0.2.1");
    assert_eq!(stats.decode_errors, 0);
    assert_eq!(records.len(), 1, "{records:?}");
    records.into_iter().next().unwrap()
}

#[test]
fn primitive_values_render_in_their_textual_form() {
    // octetDeltaCount(8), vlanId(2), sourceIPv4Address(4),
    // sourceIPv6Address(16), sourceMacAddress(6), interfaceName(varlen),
    // ipClassOfService(1)
    let fields = [
        (1, 8),
        (58, 2),
        (8, 4),
        (27, 16),
        (56, 6),
        (82, VARIABLE_LENGTH),
        (5, 1),
    ];
    let mut data = Vec::new();
    data.extend_from_slice(&123_456_789_u64.to_be_bytes());
    data.extend_from_slice(&100_u16.to_be_bytes());
    data.extend_from_slice(&[198, 51, 100, 7]);
    data.extend_from_slice(&[0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01]);
    data.extend_from_slice(&[0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
    data.push(4);
    data.extend_from_slice(b"eth0");
    data.push(0x2e);

    let record = decode_single(&fields, &data);
    assert_eq!(record.attribute("octetDeltaCount"), Some("123456789"));
    assert_eq!(record.attribute("vlanId"), Some("100"));
    assert_eq!(record.attribute("sourceIPv4Address"), Some("198.51.100.7"));
    assert_eq!(record.attribute("sourceIPv6Address"), Some("fe80::1"));
    assert_eq!(record.attribute("sourceMacAddress"), Some("02-42-ac-11-00-02"));
    assert_eq!(record.attribute("interfaceName"), Some("eth0"));
    assert_eq!(record.attribute("ipClassOfService"), Some("46"));
}

#[test]
fn reduced_size_integers_floats_and_booleans() {
    // octetDeltaCount sent in 4 bytes, upperCILimit(float64) sent as 4,
    // dataRecordsReliability(boolean) three times
    let fields = [(1, 4), (336, 4), (276, 1), (276, 1), (276, 1)];
    let mut data = Vec::new();
    data.extend_from_slice(&4_000_000_000_u32.to_be_bytes());
    data.extend_from_slice(&2.5_f32.to_be_bytes());
    data.extend_from_slice(&[1, 2, 0]);

    let record = decode_single(&fields, &data);
    assert_eq!(record.attribute("octetDeltaCount"), Some("4000000000"));
    assert_eq!(record.attribute("upperCILimit"), Some("2.5"));
    let booleans: Vec<_> = record
        .attributes
        .iter()
        .filter(|(name, _)| name == "dataRecordsReliability")
        .map(|(_, value)| value.as_str())
        .collect();
    assert_eq!(booleans, vec!["true", "false", "???"]);
}

#[test]
fn signed_integers_are_sign_extended_from_the_sent_width() {
    // mibObjectValueInteger (signed32) sent in 4, 2, 1 and 8 bytes
    let fields = [(434, 4), (434, 2), (434, 1), (434, 8), (434, 4)];
    let mut data = Vec::new();
    data.extend_from_slice(&i32::MIN.to_be_bytes());
    data.extend_from_slice(&(-300_i16).to_be_bytes());
    data.extend_from_slice(&(-1_i8).to_be_bytes());
    data.extend_from_slice(&i64::MIN.to_be_bytes());
    data.extend_from_slice(&70_000_i32.to_be_bytes());

    let record = decode_single(&fields, &data);
    let values: Vec<_> = record
        .attributes
        .iter()
        .filter(|(name, _)| name == "mibObjectValueInteger")
        .map(|(_, value)| value.clone())
        .collect();
    assert_eq!(
        values,
        vec![
            "-2147483648".to_string(),
            "-300".to_string(),
            "-1".to_string(),
            i64::MIN.to_string(),
            "70000".to_string(),
        ]
    );
}

#[test]
fn semantic_codecs_apply_to_registered_elements() {
    // protocolIdentifier, tcpControlBits, flowEndReason, fragmentFlags
    let fields = [(4, 1), (6, 2), (136, 1), (197, 1)];
    let data = [6, 0x00, 0x18, 3, 0x20];

    let record = decode_single(&fields, &data);
    assert_eq!(record.attribute("protocolIdentifier"), Some("TCP"));
    assert_eq!(record.attribute("tcpControlBits"), Some("PSH|ACK"));
    assert_eq!(record.attribute("flowEndReason"), Some("end of Flow detected"));
    let fragment = record.attribute("fragmentFlags").unwrap();
    assert_eq!(fragment.split('|').count(), 8);
    assert!(fragment.contains("More Fragments"));
    assert!(fragment.contains("May Fragment"));
}

#[test]
fn enterprise_field_is_named_by_enterprise_number() {
    let decoder = IpfixDecoder::new();
    // 0x8005 with enterprise 12345, length 2
    let body = [
        0x01, 0x00, 0x00, 0x01, 0x80, 0x05, 0x00, 0x02, 0x00, 0x00, 0x30, 0x39,
    ];
    let packet = MessageBuilder::default()
        .raw_template_set(&body)
        .data(256, &[0x01, 0x02])
        .build(1_000, 1);
    let (records, _) = decode(&decoder, &packet, "a");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attribute("12345.5"), Some("258"));
}

#[test]
fn unknown_element_ids_fall_back_to_octets() {
    let record = decode_single(&[(31000, 3)], &[0xAA, 0xBB, 0xCC]);
    assert_eq!(record.attribute("31000"), Some("0xaabbcc"));
}

#[test]
fn basic_list_and_structured_lists() {
    // basicList(291) variable length, subTemplateList(292) 4 bytes
    let fields = [(291, VARIABLE_LENGTH), (292, 4)];
    let list = [4_u8, 0x00, 0x0B, 0x00, 0x02, 0x00, 0x50, 0x1F, 0x90];
    let mut data = vec![list.len() as u8];
    data.extend_from_slice(&list);
    data.extend_from_slice(&[0, 0, 0, 0]);

    let record = decode_single(&fields, &data);
    assert_eq!(
        record.attribute("basicList"),
        Some("destinationTransportPort: ordered {80, 8080}")
    );
    assert_eq!(record.attribute("subTemplateList"), Some("not supported"));
}

// basicList of basicList ... of one sourceTransportPort value
fn nested_basic_list(levels: usize) -> Vec<u8> {
    let mut value = vec![3_u8, 0x00, 0x07, 0x00, 0x02, 0x00, 0x50];
    for _ in 1..levels {
        let mut outer = vec![3_u8, 0x01, 0x23, 0xFF, 0xFF, 255];
        outer.extend_from_slice(&(value.len() as u16).to_be_bytes());
        outer.extend_from_slice(&value);
        value = outer;
    }
    value
}

#[test]
fn deeply_nested_basic_list_aborts_only_its_packet() {
    let decoder = Arc::new(IpfixDecoder::new());
    let list = nested_basic_list(6_000);
    let mut data = vec![255];
    data.extend_from_slice(&(list.len() as u16).to_be_bytes());
    data.extend_from_slice(&list);
    let packet = MessageBuilder::default()
        .template(256, &[(291, VARIABLE_LENGTH)])
        .data(256, &data)
        .build(1_000, 1);

    // a small stack shows the recursion stays bounded
    let worker = Arc::clone(&decoder);
    let (records, stats) = thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(move || decode(&worker, &packet, "a"))
        .unwrap()
        .join()
        .unwrap();
    assert!(records.is_empty());
    assert_eq!(stats.decode_errors, 1);

    let list = nested_basic_list(MAX_LIST_DEPTH);
    let mut data = vec![255];
    data.extend_from_slice(&(list.len() as u16).to_be_bytes());
    data.extend_from_slice(&list);
    let (records, stats) = decode(
        &decoder,
        &MessageBuilder::default().data(256, &data).build(1_001, 2),
        "a",
    );
    assert_eq!(stats.decode_errors, 0);
    assert_eq!(records.len(), 1);
    assert!(
        records[0]
            .attribute("basicList")
            .unwrap()
            .ends_with("sourceTransportPort: allOf {80}}}}}}}}}}}}}}}}")
    );
}

#[test]
fn data_set_trailing_padding_is_skipped() {
    let decoder = IpfixDecoder::new();
    let packet = MessageBuilder::default()
        .template(256, &[(7, 2), (11, 2), (4, 1)])
        .data(256, &[0x00, 0x50, 0x1F, 0x90, 6, 0x00, 0x00])
        .template(257, &[(4, 1)])
        .build(1_000, 1);
    let (records, stats) = decode(&decoder, &packet, "a");
    assert_eq!(records.len(), 1);
    assert_eq!(stats.template_records, 2);
    assert_eq!(decoder.templates().len(), 2);
}

#[test]
fn stale_template_skips_the_data_set() {
    let decoder = IpfixDecoder::new();
    let definition = MessageBuilder::default()
        .template(256, &[(4, 1)])
        .build(100, 1);
    decode(&decoder, &definition, "a");

    let packet = MessageBuilder::default()
        .data(256, &[6, 17])
        .template(257, &[(7, 2)])
        .build(50, 2);
    let (records, stats) = decode(&decoder, &packet, "a");
    assert!(records.is_empty());
    assert_eq!(stats.stale_sets, 1);
    // the next set in the message is still parsed
    assert_eq!(stats.template_records, 1);
    assert_eq!(stats.decode_errors, 0);
}

#[test]
fn missing_template_is_buffered_and_replayed() {
    let decoder = IpfixDecoder::new();
    let data = MessageBuilder::default()
        .data(7 + 256, &[0x00, 0x16, 6])
        .build(2_000, 11);
    let (records, stats) = decode(&decoder, &data, "198.51.100.1");
    assert!(records.is_empty());
    assert_eq!(stats.buffered_sets, 1);
    assert_eq!(decoder.pending_sets(), 1);

    let definition = MessageBuilder::default()
        .template(7 + 256, &[(7, 2), (4, 1)])
        .build(3_000, 12);
    let (records, stats) = decode(&decoder, &definition, "198.51.100.1");
    assert_eq!(stats.replayed_sets, 1);
    assert_eq!(decoder.pending_sets(), 0);
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.source, "198.51.100.1");
    assert_eq!(record.timestamp, 2_000_000);
    assert_eq!(record.attribute("sequenceNumber"), Some("11"));
    assert_eq!(record.attribute("sourceTransportPort"), Some("22"));
    assert_eq!(record.attribute("protocolIdentifier"), Some("TCP"));
}

#[test]
fn template_from_another_exporter_does_not_release_buffered_data() {
    let decoder = IpfixDecoder::new();
    let data = MessageBuilder::default().data(300, &[1]).build(10, 1);
    decode(&decoder, &data, "exporter-a");

    let definition = MessageBuilder::default()
        .template(300, &[(4, 1)])
        .build(10, 1);
    let (records, stats) = decode(&decoder, &definition, "exporter-b");
    assert!(records.is_empty());
    assert_eq!(stats.replayed_sets, 0);
    assert_eq!(decoder.pending_sets(), 1);
    assert!(
        decoder
            .templates()
            .contains(&TemplateKey::new(DOMAIN, 300, "exporter-b"))
    );
}

#[test]
fn redefinition_replaces_the_layout() {
    let decoder = IpfixDecoder::new();
    decode(
        &decoder,
        &MessageBuilder::default()
            .template(256, &[(7, 2), (11, 2)])
            .build(10, 1),
        "a",
    );
    decode(
        &decoder,
        &MessageBuilder::default()
            .template(256, &[(4, 1)])
            .build(20, 2),
        "a",
    );

    let (records, _) = decode(
        &decoder,
        &MessageBuilder::default().data(256, &[17]).build(30, 3),
        "a",
    );
    assert_eq!(records.len(), 1);
    let names: Vec<_> = records[0]
        .attributes
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["sequenceNumber", "observationDomainId", "protocolIdentifier"]
    );
    assert_eq!(records[0].attribute("protocolIdentifier"), Some("UDP"));
}

#[test]
fn options_records_are_labelled_by_scope() {
    let decoder = IpfixDecoder::new();
    // scope: meteringProcessId(143, 4); options: exportedMessageTotalCount(41, 8),
    // samplingPacketInterval(305, 4)
    let mut data = Vec::new();
    data.extend_from_slice(&9_u32.to_be_bytes());
    data.extend_from_slice(&1_000_u64.to_be_bytes());
    data.extend_from_slice(&64_u32.to_be_bytes());
    let packet = MessageBuilder::default()
        .options_template(400, &[(143, 4)], &[(41, 8), (305, 4)])
        .data(400, &data)
        .build(1_000, 5);

    let (records, stats) = decode(&decoder, &packet, "a");
    assert_eq!(stats.options_template_records, 1);
    assert_eq!(stats.options_records, 1);
    let record = &records[0];
    assert_eq!(record.label, "Options record for meteringProcessId 9");
    assert_eq!(
        record.attributes,
        vec![
            ("exportedMessageTotalCount".to_string(), "1000".to_string()),
            ("samplingPacketInterval".to_string(), "64".to_string()),
        ]
    );
}

#[test]
fn buffered_options_data_is_replayed() {
    let decoder = IpfixDecoder::new();
    let mut data = Vec::new();
    data.extend_from_slice(&1_u32.to_be_bytes());
    data.extend_from_slice(&2_u32.to_be_bytes());
    decode(
        &decoder,
        &MessageBuilder::default().data(401, &data).build(5, 1),
        "a",
    );

    let (records, stats) = decode(
        &decoder,
        &MessageBuilder::default()
            .options_template(401, &[(149, 4), (143, 4)], &[])
            .build(6, 2),
        "a",
    );
    assert_eq!(stats.replayed_sets, 1);
    assert_eq!(
        records[0].label,
        "Options record for observationDomainId 1, meteringProcessId 2"
    );
    assert!(records[0].attributes.is_empty());
}

#[test]
fn pending_limit_evicts_oldest_sets() {
    let decoder = IpfixDecoder::with_max_pending_sets(2);
    let mut total = DecodeStats::default();
    for template_id in 500..505 {
        let (_, stats) = decode(
            &decoder,
            &MessageBuilder::default().data(template_id, &[1]).build(1, 1),
            "a",
        );
        total.merge(&stats);
    }
    assert_eq!(decoder.pending_sets(), 2);
    assert_eq!(total.buffered_sets, 5);
    assert_eq!(total.evicted_sets, 3);
}

#[test]
fn truncated_record_aborts_packet_but_keeps_state() {
    let decoder = IpfixDecoder::new();
    // variable-length string whose prefix claims more than the set holds
    let packet = MessageBuilder::default()
        .template(256, &[(82, VARIABLE_LENGTH)])
        .data(256, &[40, b'a', b'b'])
        .build(1, 1);
    let (records, stats) = decode(&decoder, &packet, "a");
    assert!(records.is_empty());
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(decoder.templates().len(), 1);

    let (records, stats) = decode(
        &decoder,
        &MessageBuilder::default().data(256, &[2, b'o', b'k']).build(2, 2),
        "a",
    );
    assert_eq!(stats.decode_errors, 0);
    assert_eq!(records[0].attribute("interfaceName"), Some("ok"));
}

#[test]
fn concurrent_exporters_share_one_decoder() {
    let decoder = Arc::new(IpfixDecoder::new());
    let handles: Vec<_> = (0..4)
        .map(|exporter| {
            let decoder = Arc::clone(&decoder);
            thread::spawn(move || {
                let source = format!("10.0.0.{exporter}");
                let mut total = 0;
                for sequence in 0..50 {
                    let packet = MessageBuilder::default()
                        .template(256, &[(4, 1)])
                        .data(256, &[6, 17])
                        .build(100, sequence);
                    let (records, _) = decode(&decoder, &packet, &source);
                    assert!(records.iter().all(|record| record.source == source));
                    total += records.len();
                }
                total
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 4 * 50 * 2);
    assert_eq!(decoder.templates().len(), 4);
}
