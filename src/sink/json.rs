use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use super::Dispatch;
use crate::decode::sample::PLUGIN_NAME;
use crate::decode::MetricSample;

/// JSON schema for one exported sample.
#[derive(Debug, Clone, Serialize)]
pub struct SampleJson<'a> {
    pub plugin: &'static str,
    pub host: &'a str,
    #[serde(rename = "type")]
    pub type_name: &'a str,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub type_instance: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Unset slots serialize as `null`.
    pub values: &'a [Option<i64>],
}

impl<'a> SampleJson<'a> {
    pub fn new(host: &'a str, sample: &'a MetricSample) -> Self {
        Self {
            plugin: PLUGIN_NAME,
            host,
            type_name: &sample.type_name,
            type_instance: &sample.instance,
            time: sample.epoch,
            interval: sample.interval,
            values: &sample.values,
        }
    }
}

fn is_empty_str(v: &&str) -> bool {
    v.is_empty()
}

/// Writes one JSON object per line.
pub struct JsonLinesWriter<W> {
    host: String,
    writer: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(host: impl Into<String>, writer: W) -> Self {
        Self {
            host: host.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Dispatch for JsonLinesWriter<W> {
    fn name(&self) -> &str {
        "json"
    }

    fn dispatch(&mut self, sample: &MetricSample) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &SampleJson::new(&self.host, sample))
            .context("serializing sample")?;
        self.writer.write_all(b"\n").context("writing sample")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flushing JSON output")
    }
}
