//! Date rendering for feed entries

use chrono::{DateTime, Utc};
use flow_actions::Viewer;
use serde::Serialize;

/// Language collaborator: renders timestamps for a viewer
pub trait Language: Send + Sync {
    /// Time and date, e.g. `14:05, 3 March 2024`
    fn time_and_date(&self, at: DateTime<Utc>, viewer: &Viewer) -> String;
    /// Date only
    fn date(&self, at: DateTime<Utc>, viewer: &Viewer) -> String;
    /// Time only
    fn time(&self, at: DateTime<Utc>, viewer: &Viewer) -> String;
}

/// The three renderings of one timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFormats {
    /// Time and date
    pub time_and_date: String,
    /// Date
    pub date: String,
    /// Time
    pub time: String,
}

impl DateFormats {
    /// Render `at` for `viewer` in `language`
    #[must_use]
    pub fn render(language: &dyn Language, at: DateTime<Utc>, viewer: &Viewer) -> Self {
        Self {
            time_and_date: language.time_and_date(at, viewer),
            date: language.date(at, viewer),
            time: language.time(at, viewer),
        }
    }
}

/// English formats in UTC using `chrono` patterns
#[derive(Debug, Clone)]
pub struct ChronoLanguage {
    date_pattern: String,
    time_pattern: String,
}

impl ChronoLanguage {
    /// Create with custom patterns
    #[must_use]
    pub fn new(date_pattern: impl Into<String>, time_pattern: impl Into<String>) -> Self {
        Self {
            date_pattern: date_pattern.into(),
            time_pattern: time_pattern.into(),
        }
    }
}

impl Default for ChronoLanguage {
    fn default() -> Self {
        Self::new("%-d %B %Y", "%H:%M")
    }
}

impl Language for ChronoLanguage {
    fn time_and_date(&self, at: DateTime<Utc>, viewer: &Viewer) -> String {
        format!("{}, {}", self.time(at, viewer), self.date(at, viewer))
    }

    fn date(&self, at: DateTime<Utc>, _viewer: &Viewer) -> String {
        at.format(&self.date_pattern).to_string()
    }

    fn time(&self, at: DateTime<Utc>, _viewer: &Viewer) -> String {
        at.format(&self.time_pattern).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn english_formats() {
        let at = Utc.with_ymd_and_hms(2024, 3, 3, 14, 5, 0).single().unwrap_or_default();
        let formats = DateFormats::render(&ChronoLanguage::default(), at, &Viewer::anonymous());
        assert_eq!(formats.time_and_date, "14:05, 3 March 2024");
        assert_eq!(formats.date, "3 March 2024");
        assert_eq!(formats.time, "14:05");
    }
}
