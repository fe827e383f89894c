use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::group::GroupKey;

// Word boundaries are ASCII-only: a non-ASCII letter next to a token does
// not join it into a word.

/// Standalone socket token, e.g. `S1`.
static SOCKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)S([0-9]+)(?-u:\b)").expect("Invalid socket regex")
});

/// Standalone channel or port token, e.g. `C3` or `P12`.
static CHANNEL_PORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)([CP])([0-9]+)(?-u:\b)").expect("Invalid channel/port regex")
});

/// Column name of the timestamp field (compared case-insensitively).
pub const TIMESTAMP_HEADING: &str = "timestamp";

/// Returns true if the heading names the timestamp column.
pub fn is_timestamp(heading: &str) -> bool {
    heading.eq_ignore_ascii_case(TIMESTAMP_HEADING)
}

/// How sub-indexed values of one metric collapse into a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
    /// No channel/port token: one value per sample.
    Single,
    /// `C<n>`: memory channels, four per sample.
    Channel,
    /// `P<n>`: ports, eight per sample.
    Port,
}

impl Classifier {
    fn from_letter(letter: &str) -> Self {
        match letter {
            "C" => Self::Channel,
            "P" => Self::Port,
            _ => Self::Single,
        }
    }

    /// Number of values carried by one sample of this class.
    pub const fn group_size(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Channel => 4,
            Self::Port => 8,
        }
    }
}

/// Semantic key decoded from one heading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadingKey {
    pub base_name: String,
    pub socket: Option<u32>,
    pub sub_index: u32,
    pub classifier: Classifier,
}

impl HeadingKey {
    /// Decode a heading such as `"Read BW C5 S1"`.
    ///
    /// The first socket token is extracted and removed, then the first
    /// channel/port token from what remains. Whatever text is left, trimmed,
    /// is the base name. A token whose digits overflow `u32` is left in the
    /// text.
    pub fn decode(heading: &str) -> Self {
        let socket = SOCKET_PATTERN.captures(heading).and_then(|caps| {
            let index = caps[1].parse::<u32>().ok()?;
            Some((index, remove_span(heading, caps.get(0)?.range())))
        });
        let (socket, text) = match socket {
            Some((index, rest)) => (Some(index), rest),
            None => (None, heading.to_string()),
        };

        let channel = CHANNEL_PORT_PATTERN.captures(&text).and_then(|caps| {
            let index = caps[2].parse::<u32>().ok()?;
            let classifier = Classifier::from_letter(&caps[1]);
            Some((index, classifier, remove_span(&text, caps.get(0)?.range())))
        });
        let (sub_index, classifier, text) = match channel {
            Some(found) => found,
            None => (0, Classifier::Single, text),
        };

        Self {
            base_name: text.trim().to_string(),
            socket,
            sub_index,
            classifier,
        }
    }

    pub fn group_size(&self) -> u32 {
        self.classifier.group_size()
    }

    /// Group this heading's value belongs to.
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            base_name: self.base_name.clone(),
            socket: self.socket,
            group_number: self.sub_index / self.group_size(),
        }
    }

    /// Position of this heading's value inside its group.
    pub fn slot(&self) -> usize {
        (self.sub_index % self.group_size()) as usize
    }
}

fn remove_span(text: &str, span: Range<usize>) -> String {
    let mut rest = String::with_capacity(text.len() - span.len());
    rest.push_str(&text[..span.start]);
    rest.push_str(&text[span.end..]);
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_heading() {
        let key = HeadingKey::decode("  Power Draw ");
        assert_eq!(key.base_name, "Power Draw");
        assert_eq!(key.socket, None);
        assert_eq!(key.sub_index, 0);
        assert_eq!(key.group_size(), 1);
    }

    #[test]
    fn test_socket_and_channel() {
        let key = HeadingKey::decode("Read BW C5 S1");
        assert_eq!(key.base_name, "Read BW");
        assert_eq!(key.socket, Some(1));
        assert_eq!(key.sub_index, 5);
        assert_eq!(key.classifier, Classifier::Channel);
        assert_eq!(key.group_size(), 4);
        assert_eq!(key.slot(), 1);
        assert_eq!(key.group_key().group_number, 1);
    }

    #[test]
    fn test_port_group_size() {
        let key = HeadingKey::decode("S0 Link P9 Util");
        assert_eq!(key.base_name, "Link  Util");
        assert_eq!(key.socket, Some(0));
        assert_eq!(key.group_size(), 8);
        assert_eq!(key.slot(), 1);
        assert_eq!(key.group_key().group_number, 1);
    }

    #[test]
    fn test_only_first_token_is_taken() {
        let key = HeadingKey::decode("X S1 S2 C1 C2");
        assert_eq!(key.socket, Some(1));
        assert_eq!(key.sub_index, 1);
        assert_eq!(key.base_name, "X  S2  C2");
    }

    #[test]
    fn test_tokens_must_be_whole_words() {
        let key = HeadingKey::decode("CS0 C1x S2y Pkg");
        assert_eq!(key.socket, None);
        assert_eq!(key.classifier, Classifier::Single);
        assert_eq!(key.base_name, "CS0 C1x S2y Pkg");
    }

    #[test]
    fn test_non_ascii_letter_does_not_join_token() {
        let key = HeadingKey::decode("TempéS0");
        assert_eq!(key.socket, Some(0));
        assert_eq!(key.base_name, "Tempé");

        let key = HeadingKey::decode("ÄC2");
        assert_eq!(key.classifier, Classifier::Channel);
        assert_eq!(key.sub_index, 2);
        assert_eq!(key.base_name, "Ä");
    }

    #[test]
    fn test_heading_of_only_tokens_has_empty_base() {
        let key = HeadingKey::decode("C1 S0");
        assert_eq!(key.base_name, "");
        assert_eq!(key.socket, Some(0));
        assert_eq!(key.sub_index, 1);
    }

    #[test]
    fn test_other_letters_are_not_classifiers() {
        let key = HeadingKey::decode("Temp D3");
        assert_eq!(key.classifier, Classifier::Single);
        assert_eq!(key.base_name, "Temp D3");
    }

    #[test]
    fn test_overflowing_socket_is_left_in_text() {
        let key = HeadingKey::decode("Power S99999999999");
        assert_eq!(key.socket, None);
        assert_eq!(key.base_name, "Power S99999999999");
    }

    #[test]
    fn test_is_timestamp_case_insensitive() {
        assert!(is_timestamp("timestamp"));
        assert!(is_timestamp("TimeStamp"));
        assert!(!is_timestamp(" timestamp S0"));
    }
}
