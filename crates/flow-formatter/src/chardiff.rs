//! Character-difference estimate between consecutive revisions
//!
//! This is a byte-length delta, a cheap proxy for "how much changed". It is
//! not an edit distance.

use flow_model::Revision;
use serde::Serialize;

/// Length delta between a revision and its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CharDiff {
    old_len: i64,
    new_len: i64,
}

impl CharDiff {
    /// Signed delta, new minus old
    #[inline]
    #[must_use]
    pub fn delta(&self) -> i64 {
        self.new_len - self.old_len
    }

    /// Length after the change
    #[inline]
    #[must_use]
    pub fn new_len(&self) -> i64 {
        self.new_len
    }

    /// Css class for the delta's sign
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self.delta() {
            d if d > 0 => "mw-plusminus-pos",
            d if d < 0 => "mw-plusminus-neg",
            _ => "mw-plusminus-null",
        }
    }

    /// Inline markup, e.g. `(+12)`
    #[must_use]
    pub fn to_html(&self) -> String {
        let delta = self.delta();
        let shown = if delta > 0 { format!("+{delta}") } else { delta.to_string() };
        format!(
            "<span dir=\"ltr\" class=\"{}\" title=\"{} bytes after change\">({shown})</span>",
            self.class(),
            self.new_len
        )
    }
}

/// Estimate the change size of `revision`; a missing predecessor counts as empty
///
/// Returns `None` only when a length does not fit a signed 64-bit integer.
#[must_use]
pub fn char_diff(revision: &Revision, previous: Option<&Revision>) -> Option<CharDiff> {
    let old_len = previous.map_or(0, |prev| prev.content_raw().len());
    Some(CharDiff {
        old_len: i64::try_from(old_len).ok()?,
        new_len: i64::try_from(revision.content_raw().len()).ok()?,
    })
}
