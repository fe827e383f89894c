use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Characters trimmed from both ends of the heading line.
const LINE_TRIM: &[char] = &['\r', '\n', '"', ';', ' '];

/// Characters trimmed from both ends of each heading entry.
const ENTRY_TRIM: &[char] = &[' ', '"', '\r', '\n'];

/// Errors loading the heading side-file.
///
/// Both variants are expected while the producer has not yet (re)written
/// the file; callers retry on a later poll.
#[derive(Error, Debug)]
pub enum HeadingError {
    #[error("reading headings file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("headings file {} has no columns", path.display())]
    Empty { path: PathBuf },
}

/// Ordered column names for the data stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingTable {
    columns: Vec<String>,
}

impl HeadingTable {
    /// Read the first line of `path` and split it into column names.
    pub fn load(path: &Path) -> Result<Self, HeadingError> {
        let unreadable = |source| HeadingError::Unreadable {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(unreadable)?;
        let mut raw = Vec::with_capacity(1024);
        BufReader::new(file)
            .read_until(b'\n', &mut raw)
            .map_err(unreadable)?;

        // A lone CR also ends the first line.
        if let Some(cr) = raw.iter().position(|&b| b == b'\r') {
            raw.truncate(cr);
        }

        let line = String::from_utf8(raw)
            .map_err(|e| unreadable(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let table = Self::parse(&line);
        if table.is_empty() {
            return Err(HeadingError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(table)
    }

    /// Split one heading line on `;`, dropping quotes, padding and empty entries.
    pub fn parse(line: &str) -> Self {
        let columns = line
            .trim_matches(LINE_TRIM)
            .split(';')
            .map(|entry| entry.trim_matches(ENTRY_TRIM))
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();

        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_strips_quotes_and_empties() {
        let table = HeadingTable::parse("\"Timestamp\"; \"C0 S0\" ;;\"C1 S0\";\r\n");
        assert_eq!(table.columns(), &["Timestamp", "C0 S0", "C1 S0"]);
    }

    #[test]
    fn test_load_reads_only_first_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "timestamp;Power S0;Power S1\nignored;line\n").unwrap();

        let table = HeadingTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec!["timestamp", "Power S0", "Power S1"]
        );
    }

    #[test]
    fn test_load_cr_terminated_first_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "timestamp;A\rB;C\r").unwrap();

        let table = HeadingTable::load(file.path()).unwrap();
        assert_eq!(table.columns(), &["timestamp", "A"]);
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = HeadingTable::load(&dir.path().join("headings")).unwrap_err();
        match err {
            HeadingError::Unreadable { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::NotFound)
            }
            other => panic!("expected Unreadable, got {other:?}"),
        }
    }

    #[test]
    fn test_load_blank_file_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, " ; \"\" ;\n").unwrap();

        let err = HeadingTable::load(file.path()).unwrap_err();
        assert!(matches!(err, HeadingError::Empty { .. }));
    }
}
