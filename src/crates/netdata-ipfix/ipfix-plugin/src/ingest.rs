use crate::plugin_config::PluginConfig;
use anyhow::{Context, Result};
use ipfix_decoder::{DecodeStats, IpfixDecoder, Record, RecordSink};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub(crate) struct IngestMetrics {
    pub(crate) udp_packets_received: AtomicU64,
    pub(crate) udp_bytes_received: AtomicU64,
    pub(crate) decode_errors: AtomicU64,
    pub(crate) template_records: AtomicU64,
    pub(crate) options_template_records: AtomicU64,
    pub(crate) template_withdrawals: AtomicU64,
    pub(crate) data_records: AtomicU64,
    pub(crate) options_records: AtomicU64,
    pub(crate) stale_sets: AtomicU64,
    pub(crate) buffered_sets: AtomicU64,
    pub(crate) evicted_sets: AtomicU64,
    pub(crate) replayed_sets: AtomicU64,
    pub(crate) records_written: AtomicU64,
    pub(crate) write_errors: AtomicU64,
}

impl IngestMetrics {
    pub(crate) fn apply_decode_stats(&self, stats: &DecodeStats) {
        self.decode_errors
            .fetch_add(stats.decode_errors, Ordering::Relaxed);
        self.template_records
            .fetch_add(stats.template_records, Ordering::Relaxed);
        self.options_template_records
            .fetch_add(stats.options_template_records, Ordering::Relaxed);
        self.template_withdrawals
            .fetch_add(stats.template_withdrawals, Ordering::Relaxed);
        self.data_records
            .fetch_add(stats.data_records, Ordering::Relaxed);
        self.options_records
            .fetch_add(stats.options_records, Ordering::Relaxed);
        self.stale_sets.fetch_add(stats.stale_sets, Ordering::Relaxed);
        self.buffered_sets
            .fetch_add(stats.buffered_sets, Ordering::Relaxed);
        self.evicted_sets
            .fetch_add(stats.evicted_sets, Ordering::Relaxed);
        self.replayed_sets
            .fetch_add(stats.replayed_sets, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        let counters = [
            ("udp_packets_received", &self.udp_packets_received),
            ("udp_bytes_received", &self.udp_bytes_received),
            ("decode_errors", &self.decode_errors),
            ("template_records", &self.template_records),
            ("options_template_records", &self.options_template_records),
            ("template_withdrawals", &self.template_withdrawals),
            ("data_records", &self.data_records),
            ("options_records", &self.options_records),
            ("stale_sets", &self.stale_sets),
            ("buffered_sets", &self.buffered_sets),
            ("evicted_sets", &self.evicted_sets),
            ("replayed_sets", &self.replayed_sets),
            ("records_written", &self.records_written),
            ("write_errors", &self.write_errors),
        ];
        counters
            .into_iter()
            .map(|(name, counter)| (name, counter.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Writes every record as one JSON object per line.
pub(crate) struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
    metrics: Arc<IngestMetrics>,
}

impl<W: Write> JsonLinesSink<W> {
    pub(crate) fn new(writer: W, metrics: Arc<IngestMetrics>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            metrics,
        }
    }

    fn write_record(&mut self, record: &Record) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn accept(&mut self, record: Record) {
        match self.write_record(&record) {
            Ok(()) => {
                self.metrics.records_written.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.metrics.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(source = %record.source, "record write failed: {}", err);
            }
        }
    }
}

fn open_output(path: &str) -> Result<Box<dyn Write + Send>> {
    if path == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open output file {}", path))?;
    Ok(Box::new(file))
}

pub(crate) struct IngestService {
    cfg: PluginConfig,
    metrics: Arc<IngestMetrics>,
    decoder: IpfixDecoder,
    sink: JsonLinesSink<Box<dyn Write + Send>>,
}

impl IngestService {
    pub(crate) fn new(cfg: PluginConfig, metrics: Arc<IngestMetrics>) -> Result<Self> {
        let output = open_output(&cfg.output.path)?;
        let decoder = IpfixDecoder::with_max_pending_sets(cfg.decoder.max_pending_sets);
        let sink = JsonLinesSink::new(output, Arc::clone(&metrics));
        Ok(Self {
            cfg,
            metrics,
            decoder,
            sink,
        })
    }

    pub(crate) async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        let socket = UdpSocket::bind(&self.cfg.listener.listen)
            .await
            .with_context(|| format!("failed to bind {}", self.cfg.listener.listen))?;
        tracing::info!("listening for IPFIX on {}", self.cfg.listener.listen);

        let mut buffer = vec![0_u8; self.cfg.listener.max_packet_size];
        let mut stats_tick = tokio::time::interval(self.cfg.listener.stats_interval);
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    break;
                }
                _ = stats_tick.tick() => {
                    if let Err(err) = self.sink.flush() {
                        tracing::warn!("output flush failed: {}", err);
                    }
                    self.log_stats();
                }
                recv = socket.recv_from(&mut buffer) => {
                    let (received, source) = match recv {
                        Ok(result) => result,
                        Err(err) => {
                            tracing::warn!("udp recv error: {}", err);
                            continue;
                        }
                    };

                    if received == 0 {
                        continue;
                    }

                    self.metrics.udp_packets_received.fetch_add(1, Ordering::Relaxed);
                    self.metrics
                        .udp_bytes_received
                        .fetch_add(received as u64, Ordering::Relaxed);

                    let exporter = source.ip().to_string();
                    let stats = self
                        .decoder
                        .decode(&buffer[..received], 0, &exporter, &mut self.sink);
                    self.metrics.apply_decode_stats(&stats);
                }
            }
        }

        self.sink
            .flush()
            .context("failed to flush output on shutdown")?;
        self.log_stats();
        Ok(())
    }

    fn log_stats(&self) {
        tracing::info!(
            pending_sets = self.decoder.pending_sets(),
            templates = self.decoder.templates().len(),
            options_templates = self.decoder.options_templates().len(),
            "ipfix ingest stats: {:?}",
            self.metrics.snapshot()
        );
    }
}
