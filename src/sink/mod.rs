pub mod json;
pub mod putval;

use std::io::Write;

use anyhow::Result;

use crate::config::OutputFormat;
use crate::decode::MetricSample;

pub use self::json::JsonLinesWriter;
pub use self::putval::PutvalWriter;

/// Dispatch consumes finished samples and hands them to a backend.
pub trait Dispatch {
    /// Returns the dispatcher's name for logging.
    fn name(&self) -> &str;

    /// Deliver a single sample.
    fn dispatch(&mut self, sample: &MetricSample) -> Result<()>;

    /// Push out anything buffered. Called once per poll cycle.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Collects samples in memory.
impl Dispatch for Vec<MetricSample> {
    fn name(&self) -> &str {
        "memory"
    }

    fn dispatch(&mut self, sample: &MetricSample) -> Result<()> {
        self.push(sample.clone());
        Ok(())
    }
}

/// Writer-backed output selected from configuration.
///
/// Uses enum dispatch so the poll loop holds one concrete type whatever the
/// configured format.
pub enum Output<W: Write> {
    Putval(PutvalWriter<W>),
    Json(JsonLinesWriter<W>),
}

impl<W: Write> Output<W> {
    /// Build the output for `format`, labelling samples with `host`.
    pub fn new(format: OutputFormat, host: impl Into<String>, writer: W) -> Self {
        match format {
            OutputFormat::Putval => Self::Putval(PutvalWriter::new(host, writer)),
            OutputFormat::Json => Self::Json(JsonLinesWriter::new(host, writer)),
        }
    }
}

impl<W: Write> Dispatch for Output<W> {
    fn name(&self) -> &str {
        match self {
            Self::Putval(w) => w.name(),
            Self::Json(w) => w.name(),
        }
    }

    fn dispatch(&mut self, sample: &MetricSample) -> Result<()> {
        match self {
            Self::Putval(w) => w.dispatch(sample),
            Self::Json(w) => w.dispatch(sample),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            Self::Putval(w) => w.flush(),
            Self::Json(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetricSample {
        MetricSample {
            type_name: "trident_power".to_string(),
            instance: "socket 0".to_string(),
            epoch: Some(1_577_836_800),
            interval: Some(10),
            values: vec![Some(42)],
        }
    }

    #[test]
    fn test_vec_collects_samples() {
        let mut out: Vec<MetricSample> = Vec::new();
        out.dispatch(&sample()).unwrap();
        out.dispatch(&sample()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(Dispatch::name(&out), "memory");
    }

    #[test]
    fn test_output_selects_format() {
        let mut putval = Output::new(OutputFormat::Putval, "node1", Vec::<u8>::new());
        putval.dispatch(&sample()).unwrap();
        assert_eq!(putval.name(), "putval");

        let mut json = Output::new(OutputFormat::Json, "node1", Vec::<u8>::new());
        json.dispatch(&sample()).unwrap();
        assert_eq!(json.name(), "json");

        let (Output::Putval(p), Output::Json(j)) = (putval, json) else {
            panic!("unexpected output variants");
        };
        assert!(String::from_utf8(p.into_inner()).unwrap().starts_with("PUTVAL "));
        assert!(String::from_utf8(j.into_inner()).unwrap().starts_with('{'));
    }
}
