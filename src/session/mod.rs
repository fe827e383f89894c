//! Poll-driven stream session.
//!
//! A [`Session`] owns everything tied to one producer stream: the open pipe
//! descriptor, the pending line reader, the decoder built from the current
//! headings and the last seen timestamp. The host calls [`Session::read`]
//! periodically; each call consumes lines until the pipe would block, an
//! empty line arrives or the stream is reset. It never waits for data, but a
//! producer that keeps writing keeps the call busy.
//!
//! Every stream-level problem (pipe or headings missing, undecodable bytes,
//! a record that does not match the headings) is resolved inside the session
//! by retrying or by discarding the stream so the next poll reopens it.

pub mod stats;

use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use self::stats::{Counter, SessionStats};
use crate::config::StreamConfig;
use crate::decode::record::{self, RawRecord};
use crate::decode::{HeadingTable, RecordDecoder, TimeResolver};
use crate::reader::{fifo, LineReader, ReadOutcome, ReaderError};
use crate::sink::Dispatch;

/// Where the session is in its open/headings/stream cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No line reader; the next poll tries to open the pipe.
    Closed,
    /// Pipe open, headings are loaded on the first non-empty line.
    AwaitingHeadings,
    /// Pipe open and headings loaded; lines are decoded into samples.
    Streaming,
}

/// Why a poll discarded the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The producer closed its end and every buffered line was consumed.
    EndOfStream,
    /// Data arrived but the headings file could not be loaded.
    HeadingsUnavailable,
    /// A record's field count did not match the headings.
    Desync,
    /// The stream carried bytes that are not valid text.
    Undecodable,
    /// Reading the pipe failed with something other than "would block".
    ReadError,
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// The pipe was (re)opened during this poll.
    pub opened: bool,
    pub records: usize,
    pub samples: usize,
    /// Set when the stream was discarded; the next poll reopens it.
    pub reset: Option<ResetReason>,
}

/// One consumer of a Trident measurement stream.
pub struct Session {
    cfg: StreamConfig,
    /// Held open across stream resets so the producer never sees a pipe
    /// without readers; replaced on the next successful open.
    fifo: Option<File>,
    lines: Option<LineReader<File>>,
    decoder: Option<RecordDecoder>,
    resolver: TimeResolver,
    stats: Arc<SessionStats>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("fifo", &self.cfg.fifo)
            .field("headings", &self.cfg.headings)
            .field("state", &self.state())
            .finish()
    }
}

impl Session {
    /// Create a session in the `Closed` state.
    pub fn new(cfg: StreamConfig) -> Self {
        Self {
            cfg,
            fifo: None,
            lines: None,
            decoder: None,
            resolver: TimeResolver::new(),
            stats: Arc::new(SessionStats::new()),
        }
    }

    /// Apply one host configuration option. Path changes take effect on the
    /// next open.
    pub fn configure(&mut self, key: &str, value: &str) -> Result<()> {
        self.cfg.apply_option(key, value)
    }

    pub fn config(&self) -> &StreamConfig {
        &self.cfg
    }

    /// Reset all session state, releasing any open descriptor. The applied
    /// configuration is kept.
    pub fn init(&mut self) {
        self.shutdown();
        self.decoder = None;
        self.resolver.reset();
    }

    pub fn state(&self) -> StreamState {
        match (&self.lines, &self.decoder) {
            (None, _) => StreamState::Closed,
            (Some(_), None) => StreamState::AwaitingHeadings,
            (Some(_), Some(_)) => StreamState::Streaming,
        }
    }

    /// Shared handle to the session counters.
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Headings of the current stream, once loaded.
    pub fn headings(&self) -> Option<&HeadingTable> {
        self.decoder.as_ref().map(RecordDecoder::headings)
    }

    /// Run one poll cycle, dispatching every sample decoded from the lines
    /// currently available.
    ///
    /// Stream conditions never fail the call; they are logged and reported
    /// through [`PollOutcome::reset`]. Only dispatcher errors are returned.
    pub fn read<D: Dispatch + ?Sized>(&mut self, out: &mut D) -> Result<PollOutcome> {
        let mut outcome = PollOutcome::default();

        if self.lines.is_none() {
            outcome.opened = self.open();
        }

        while let Some(lines) = self.lines.as_mut() {
            let line = match lines.next_line() {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::WouldBlock) => break,
                Ok(ReadOutcome::Eof) => {
                    debug!(path = %self.cfg.fifo.display(), "end of stream");
                    self.discard(ResetReason::EndOfStream, &mut outcome);
                    break;
                }
                Err(e) => {
                    warn!(path = %self.cfg.fifo.display(), error = %e, "discarding stream");
                    let reason = match e {
                        ReaderError::Decode { .. } => ResetReason::Undecodable,
                        ReaderError::Io(_) => ResetReason::ReadError,
                    };
                    self.stats.record(Counter::StreamErrors);
                    self.discard(reason, &mut outcome);
                    break;
                }
            };
            self.stats.record(Counter::Lines);

            let line = record::strip_line(&line);
            if line.is_empty() {
                break;
            }

            if self.decoder.is_none() && !self.load_headings() {
                self.discard(ResetReason::HeadingsUnavailable, &mut outcome);
                break;
            }
            let Some(decoder) = self.decoder.as_ref() else {
                break;
            };

            let record = RawRecord::parse(line);
            if record.len() != decoder.width() {
                warn!(
                    fields = record.len(),
                    headings = decoder.width(),
                    "record does not match headings, reopening stream",
                );
                self.stats.record(Counter::Desyncs);
                self.discard(ResetReason::Desync, &mut outcome);
                break;
            }

            let decoded = decoder.decode(&record, &mut self.resolver);
            self.stats.record(Counter::Records);
            outcome.records += 1;

            for warning in &decoded.warnings {
                warn!(heading = %warning.heading, error = %warning.error, "skipping field");
            }
            self.stats
                .record_n(Counter::FieldWarnings, decoded.warnings.len() as u64);

            for sample in &decoded.samples {
                out.dispatch(sample).with_context(|| {
                    format!("dispatching {} via {}", sample.type_name, out.name())
                })?;
                self.stats.record(Counter::Samples);
                outcome.samples += 1;
            }
        }

        Ok(outcome)
    }

    /// Release the line reader and the pipe descriptor. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.lines = None;
        if self.fifo.take().is_some() {
            info!(path = %self.cfg.fifo.display(), "closed fifo");
        }
    }

    fn open(&mut self) -> bool {
        let file = match fifo::open_nonblocking(&self.cfg.fifo) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %self.cfg.fifo.display(), error = %e, "fifo not available");
                return false;
            }
        };

        let reader = match file.try_clone() {
            Ok(reader) => reader,
            Err(e) => {
                warn!(path = %self.cfg.fifo.display(), error = %e, "duplicating fifo descriptor");
                return false;
            }
        };

        // Replacing the held descriptor closes the stale one.
        self.fifo = Some(file);
        self.lines = Some(LineReader::new(reader));
        self.decoder = None;
        self.stats.record(Counter::Opens);
        debug!(path = %self.cfg.fifo.display(), "opened fifo");

        true
    }

    fn load_headings(&mut self) -> bool {
        match HeadingTable::load(&self.cfg.headings) {
            Ok(table) => {
                info!(
                    path = %self.cfg.headings.display(),
                    columns = table.len(),
                    "loaded headings",
                );
                self.stats.record(Counter::HeadingLoads);
                self.decoder = Some(RecordDecoder::new(table, self.cfg.interval));
                true
            }
            Err(e) => {
                debug!(error = %e, "headings not available");
                false
            }
        }
    }

    fn discard(&mut self, reason: ResetReason, outcome: &mut PollOutcome) {
        self.lines = None;
        outcome.reset = Some(reason);
    }
}
