use serde::Serialize;

/// One decoded flow or options record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub label: String,
    /// Exporter identity the packet arrived from.
    pub source: String,
    /// Packet export time in milliseconds since the epoch.
    pub timestamp: i64,
    pub attributes: Vec<(String, String)>,
}

impl Record {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Consumer of decoded records.
pub trait RecordSink {
    fn accept(&mut self, record: Record);
}

impl RecordSink for Vec<Record> {
    fn accept(&mut self, record: Record) {
        self.push(record);
    }
}

impl<F> RecordSink for F
where
    F: FnMut(Record),
{
    fn accept(&mut self, record: Record) {
        self(record)
    }
}
