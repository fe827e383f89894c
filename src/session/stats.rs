use std::sync::atomic::{AtomicU64, Ordering};

/// Number of [`Counter`] variants.
const COUNTER_CARDINALITY: usize = 8;

/// Things a session counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Successful opens of the named pipe.
    Opens = 0,
    /// Heading tables loaded.
    HeadingLoads,
    /// Lines taken from the stream, including empty ones.
    Lines,
    /// Records decoded.
    Records,
    /// Samples handed to the dispatcher.
    Samples,
    /// Records whose field count did not match the headings.
    Desyncs,
    /// Stream resets caused by undecodable bytes or read errors.
    StreamErrors,
    /// Individual fields skipped because they failed to parse.
    FieldWarnings,
}

impl Counter {
    pub const ALL: [Counter; COUNTER_CARDINALITY] = [
        Counter::Opens,
        Counter::HeadingLoads,
        Counter::Lines,
        Counter::Records,
        Counter::Samples,
        Counter::Desyncs,
        Counter::StreamErrors,
        Counter::FieldWarnings,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opens => "opens",
            Self::HeadingLoads => "heading_loads",
            Self::Lines => "lines",
            Self::Records => "records",
            Self::Samples => "samples",
            Self::Desyncs => "desyncs",
            Self::StreamErrors => "stream_errors",
            Self::FieldWarnings => "field_warnings",
        }
    }
}

/// Lock-free per-[`Counter`] totals.
///
/// `snapshot()` atomically reads and resets all counters, making it
/// suitable for periodic reporting.
pub struct SessionStats {
    counts: [AtomicU64; COUNTER_CARDINALITY],
}

impl SessionStats {
    /// Create a new zeroed SessionStats.
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Increment a counter by one.
    pub fn record(&self, c: Counter) {
        self.record_n(c, 1);
    }

    /// Increment a counter by n.
    pub fn record_n(&self, c: Counter, n: u64) {
        if let Some(counter) = self.counts.get(c as usize) {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Current value without resetting.
    pub fn get(&self, c: Counter) -> u64 {
        self.counts
            .get(c as usize)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    /// Atomically read and reset all counters, returning only non-zero entries.
    pub fn snapshot(&self) -> Vec<(Counter, u64)> {
        Counter::ALL
            .iter()
            .filter_map(|&c| {
                let v = self.counts.get(c as usize)?.swap(0, Ordering::Relaxed);
                (v > 0).then_some((c, v))
            })
            .collect()
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for c in Counter::ALL {
            map.entry(&c.as_str(), &self.get(c));
        }
        map.finish()
    }
}
