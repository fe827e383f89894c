use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

/// Top-level configuration for the tridentd collector.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Logging verbosity (debug, info, warn, error). Default: "info".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Stream source and sampling configuration.
    #[serde(flatten)]
    pub stream: StreamConfig,

    /// How often one poll cycle runs. Default: 1s.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// How often session counters are logged. Zero disables. Default: 60s.
    #[serde(default = "default_stats_interval", with = "humantime_serde")]
    pub stats_interval: Duration,

    /// Host name attached to exported samples. Empty resolves from the OS.
    #[serde(default)]
    pub hostname: String,

    /// Sample output configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the measurement stream comes from and how it is timed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    /// Named pipe written by the producer. Default: "/tmp/tridentfifo".
    #[serde(default = "default_fifo")]
    pub fifo: PathBuf,

    /// Side-file holding the column headings. Default: "/tmp/tridentheadings".
    #[serde(default = "default_headings")]
    pub headings: PathBuf,

    /// Interval in seconds used when none can be inferred. Default: 10.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

/// Sample output configuration.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OutputConfig {
    /// Line format written to stdout. Default: putval.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Supported output line formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// collectd plain-text `PUTVAL` commands.
    Putval,
    /// One JSON object per line.
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Putval
    }
}

// --- Default value functions ---

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fifo() -> PathBuf {
    PathBuf::from("/tmp/tridentfifo")
}

fn default_headings() -> PathBuf {
    PathBuf::from("/tmp/tridentheadings")
}

fn default_interval() -> u64 {
    10
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_stats_interval() -> Duration {
    Duration::from_secs(60)
}

// --- Default trait impls ---

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            stream: StreamConfig::default(),
            poll_interval: default_poll_interval(),
            stats_interval: default_stats_interval(),
            hostname: String::new(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fifo: default_fifo(),
            headings: default_headings(),
            interval: default_interval(),
        }
    }
}

// --- Validation and loading ---

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let cfg: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate the configuration for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        self.stream.validate()?;

        if self.poll_interval.is_zero() {
            bail!("poll_interval must be positive");
        }

        Ok(())
    }
}

impl StreamConfig {
    /// Validate paths and the default interval.
    pub fn validate(&self) -> Result<()> {
        if self.fifo.as_os_str().is_empty() {
            bail!("fifo path is required");
        }

        if self.headings.as_os_str().is_empty() {
            bail!("headings path is required");
        }

        if self.interval == 0 {
            bail!("interval must be positive");
        }

        Ok(())
    }

    /// Apply one `key value` option as handed over by a host daemon.
    ///
    /// Keys are case-insensitive. Unknown keys are logged and ignored.
    pub fn apply_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "fifo" => self.fifo = PathBuf::from(value),
            "headings" => self.headings = PathBuf::from(value),
            "interval" => {
                let interval: u64 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid interval {value:?}"))?;
                if interval == 0 {
                    bail!("interval must be positive");
                }
                self.interval = interval;
            }
            other => warn!(key = other, "ignoring unknown option"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.stream.fifo, PathBuf::from("/tmp/tridentfifo"));
        assert_eq!(cfg.stream.headings, PathBuf::from("/tmp/tridentheadings"));
        assert_eq!(cfg.stream.interval, 10);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.stats_interval, Duration::from_secs(60));
        assert_eq!(cfg.output.format, OutputFormat::Putval);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_yaml_overrides() {
        let cfg: Config = serde_yaml::from_str(
            "fifo: /run/trident.fifo\n\
             interval: 5\n\
             poll_interval: 250ms\n\
             stats_interval: 0s\n\
             hostname: node7\n\
             output:\n  format: json\n",
        )
        .unwrap();

        assert_eq!(cfg.stream.fifo, PathBuf::from("/run/trident.fifo"));
        assert_eq!(cfg.stream.headings, PathBuf::from("/tmp/tridentheadings"));
        assert_eq!(cfg.stream.interval, 5);
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert!(cfg.stats_interval.is_zero());
        assert_eq!(cfg.hostname, "node7");
        assert_eq!(cfg.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval: 0").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/tridentd.yaml")).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }

    #[test]
    fn test_validation_zero_poll_interval() {
        let cfg = Config {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval"));
    }

    #[test]
    fn test_apply_option_keys_are_case_insensitive() {
        let mut stream = StreamConfig::default();
        stream.apply_option("FIFO", "/run/a.fifo").unwrap();
        stream.apply_option("Headings", "/run/a.headings").unwrap();
        stream.apply_option("Interval", " 30 ").unwrap();
        stream.apply_option("Colour", "blue").unwrap();

        assert_eq!(stream.fifo, PathBuf::from("/run/a.fifo"));
        assert_eq!(stream.headings, PathBuf::from("/run/a.headings"));
        assert_eq!(stream.interval, 30);
    }

    #[test]
    fn test_apply_option_rejects_bad_interval() {
        let mut stream = StreamConfig::default();
        assert!(stream.apply_option("interval", "ten").is_err());
        assert!(stream.apply_option("interval", "0").is_err());
        assert!(stream.apply_option("interval", "-5").is_err());
        assert_eq!(stream.interval, 10);
    }
}
