//! collectd plain-text protocol output.
//!
//! Each sample becomes one `PUTVAL` line as accepted by collectd's exec and
//! unixsock plugins:
//!
//! ```text
//! PUTVAL "node1/trident/trident_power-socket 0" interval=10 1577836800:42
//! ```
//!
//! Unset value slots are written as `U` and a missing timestamp as `N`.
//! `/` and `-` separate the identifier's parts, so they are replaced with `_`
//! inside the type.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};

use super::Dispatch;
use crate::decode::sample::PLUGIN_NAME;
use crate::decode::MetricSample;

/// Writes samples as collectd `PUTVAL` commands.
pub struct PutvalWriter<W> {
    host: String,
    writer: W,
}

impl<W: Write> PutvalWriter<W> {
    pub fn new(host: impl Into<String>, writer: W) -> Self {
        Self {
            host: host.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Render one sample as a `PUTVAL` line without the trailing newline.
    pub fn format_line(&self, sample: &MetricSample) -> String {
        let type_name = sample.type_name.replace(['/', '-'], "_");
        let mut identifier = format!("{}/{}/{}", self.host, PLUGIN_NAME, type_name);
        if !sample.instance.is_empty() {
            identifier.push('-');
            identifier.push_str(&sample.instance);
        }

        let mut line = String::with_capacity(identifier.len() + 32);
        line.push_str("PUTVAL ");
        push_quoted(&mut line, &identifier);

        if let Some(interval) = sample.interval {
            let _ = write!(line, " interval={interval}");
        }

        line.push(' ');
        match sample.epoch {
            Some(epoch) => {
                let _ = write!(line, "{epoch}");
            }
            None => line.push('N'),
        }

        for value in &sample.values {
            match value {
                Some(v) => {
                    let _ = write!(line, ":{v}");
                }
                None => line.push_str(":U"),
            }
        }

        line
    }
}

impl<W: Write> Dispatch for PutvalWriter<W> {
    fn name(&self) -> &str {
        "putval"
    }

    fn dispatch(&mut self, sample: &MetricSample) -> Result<()> {
        let line = self.format_line(sample);
        writeln!(self.writer, "{line}").context("writing PUTVAL line")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flushing PUTVAL output")
    }
}

/// Append `s`, quoting and escaping it if it contains spaces or quotes.
fn push_quoted(out: &mut String, s: &str) {
    if !s.contains([' ', '"', '\\']) {
        out.push_str(s);
        return;
    }

    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
