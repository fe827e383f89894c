//! Trident measurement stream collector.
//!
//! Reads semicolon-separated records from a named pipe, labels every column
//! from a side-file of headings, and turns each record into grouped metric
//! samples for a time-series backend.

pub mod config;
pub mod decode;
pub mod reader;
pub mod session;
pub mod sink;
