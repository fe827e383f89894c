//! Header-driven decoding of Trident records into metric samples.
//!
//! A [`RecordDecoder`] is built once per loaded [`HeadingTable`]: every
//! heading is decoded into a [`HeadingKey`] (or recognised as the timestamp
//! column) up front, so each record only pays for value parsing and grouping.

pub mod group;
pub mod headings;
pub mod key;
pub mod record;
pub mod sample;
pub mod time;

use thiserror::Error;

pub use self::group::{GroupKey, GroupedValues, Grouper};
pub use self::headings::{HeadingError, HeadingTable};
pub use self::key::{Classifier, HeadingKey};
pub use self::record::RawRecord;
pub use self::sample::MetricSample;
pub use self::time::{ResolvedTime, TimeResolver};

/// A single field that could not be parsed. The rest of the record is kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("value {raw:?} is not a finite number in i64 range")]
    Value { raw: String },

    #[error("timestamp {raw:?} is not a recognised date-time")]
    Timestamp { raw: String },
}

/// A field warning together with the column it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub heading: String,
    pub error: FieldError,
}

/// Samples and warnings produced from one record.
#[derive(Debug, Default)]
pub struct DecodedRecord {
    pub time: ResolvedTime,
    pub samples: Vec<MetricSample>,
    pub warnings: Vec<FieldWarning>,
}

#[derive(Debug, Clone)]
enum Column {
    Timestamp,
    Metric(HeadingKey),
}

/// Decodes records laid out according to one heading table.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    headings: HeadingTable,
    columns: Vec<Column>,
    default_interval: u64,
}

impl RecordDecoder {
    pub fn new(headings: HeadingTable, default_interval: u64) -> Self {
        let columns = headings
            .iter()
            .map(|heading| {
                if key::is_timestamp(heading) {
                    Column::Timestamp
                } else {
                    Column::Metric(HeadingKey::decode(heading))
                }
            })
            .collect();

        Self {
            headings,
            columns,
            default_interval,
        }
    }

    /// Number of fields a record must carry.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn headings(&self) -> &HeadingTable {
        &self.headings
    }

    /// Decode one record whose width already matches [`Self::width`].
    ///
    /// Timestamp columns feed `resolver`; every other field is parsed,
    /// truncated and placed into its group. Fields that fail to parse are
    /// reported as warnings and skipped.
    pub fn decode(&self, record: &RawRecord<'_>, resolver: &mut TimeResolver) -> DecodedRecord {
        debug_assert_eq!(record.len(), self.width());

        let mut time = ResolvedTime::default();
        let mut warnings = Vec::new();
        let mut grouper = Grouper::new();

        for ((column, heading), raw) in self
            .columns
            .iter()
            .zip(self.headings.iter())
            .zip(record.fields())
        {
            let result = match column {
                Column::Timestamp => resolver
                    .resolve(raw)
                    .map(|resolved| time = resolved.or_default_interval(self.default_interval)),
                Column::Metric(key) => record::parse_value(raw).map(|value| {
                    grouper.insert(key.group_key(), key.group_size(), key.slot(), value)
                }),
            };

            if let Err(error) = result {
                warnings.push(FieldWarning {
                    heading: heading.to_string(),
                    error,
                });
            }
        }

        let samples = grouper
            .into_groups()
            .map(|(key, values)| MetricSample::from_group(&key, values, time.epoch, time.interval))
            .collect();

        DecodedRecord {
            time,
            samples,
            warnings,
        }
    }
}
