use super::FieldError;

/// Characters trimmed from both ends of a data line.
const LINE_TRIM: &[char] = &['\n', '\r', ';', ' '];

/// Characters trimmed from both ends of each field.
const FIELD_TRIM: &[char] = &[' ', '"', '\n', '\r'];

/// Values at or beyond this magnitude do not fit an `i64` after truncation.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Strip terminators, padding and trailing separators from a data line.
pub fn strip_line(line: &str) -> &str {
    line.trim_matches(LINE_TRIM)
}

/// The fields of one data line, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<'a> {
    fields: Vec<&'a str>,
}

impl<'a> RawRecord<'a> {
    /// Split a stripped line on `;`, trimming each field and dropping empty ones.
    pub fn parse(line: &'a str) -> Self {
        let fields = line
            .split(';')
            .map(|field| field.trim_matches(FIELD_TRIM))
            .filter(|field| !field.is_empty())
            .collect();

        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }
}

/// Parse a numeric field and truncate it toward zero.
pub fn parse_value(raw: &str) -> Result<i64, FieldError> {
    let value: f64 = raw.trim().parse().map_err(|_| FieldError::Value {
        raw: raw.to_string(),
    })?;

    if !value.is_finite() || value >= I64_LIMIT || value < -I64_LIMIT {
        return Err(FieldError::Value {
            raw: raw.to_string(),
        });
    }

    Ok(value.trunc() as i64)
}
