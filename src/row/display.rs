//! Human-readable row output
//!
//! Values are written percent-encoded, so display undoes that on a best
//! effort basis. Stored payloads are never touched.

use std::borrow::Cow;
use std::fmt;

use super::Row;

/// Render a payload for display, percent-decoding it when possible
///
/// Falls back to the payload text as is when it is not valid
/// percent-encoding.
pub fn display_value(payload: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(payload);

    // Fast path: no encoding at all
    if !text.contains('+') && !text.contains('%') {
        return text;
    }

    // Form encoding writes spaces as '+'
    let with_spaces = text.replace('+', " ");
    match urlencoding::decode(&with_spaces) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => text,
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rowKey: {}", self.key)?;

        for (family, qualifiers) in &self.families {
            writeln!(f, "family: {}", family)?;

            for (qualifier, values) in qualifiers {
                writeln!(f, "  qualifier: {}", qualifier)?;

                for (i, v) in values.iter().enumerate() {
                    writeln!(
                        f,
                        "    value {}: {}, timestamp: {}",
                        i + 1,
                        display_value(&v.payload),
                        v.timestamp
                    )?;
                }
            }
        }

        Ok(())
    }
}

impl Row {
    /// Format the row in a human-readable way
    pub fn pretty_print(&self) -> String {
        self.to_string()
    }
}
