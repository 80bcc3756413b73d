//! Command-line configuration
//!
//! Read from a TOML file; every field is optional and command-line flags
//! win over the file.

use anyhow::{Context, Result};
use flow_actions::Viewer;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default line template for contribution output
pub(crate) const DEFAULT_LINE_TEMPLATE: &str =
    "{{dates.timeAndDate}} {{page}} {{#if delta}}({{delta}}) {{/if}}{{{description}}}";

/// Settings of the `flow-board` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    /// `tracing` filter directive, `RUST_LOG` wins when set
    pub(crate) log_filter: Option<String>,
    /// Emit logs as JSON lines
    pub(crate) json_logs: Option<bool>,
    /// Entity dump to format
    pub(crate) input: Option<PathBuf>,
    /// Viewer the feed is formatted for
    pub(crate) viewer: Option<ViewerConfig>,
    /// Handlebars template of one output line
    pub(crate) line_template: Option<String>,
    /// Namespace id of topic pages
    pub(crate) topic_namespace: Option<i32>,
    /// Script path used in generated urls
    pub(crate) script_path: Option<String>,
}

/// Viewer section of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ViewerConfig {
    /// Account id, 0 for anonymous
    pub(crate) id: u64,
    /// User name
    pub(crate) name: String,
    /// Granted rights
    pub(crate) rights: Vec<String>,
}

impl CliConfig {
    /// Load config from `path`
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    /// Returns error on malformed TOML or unknown keys
    pub(crate) fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Log filter, defaulting to `info`
    #[must_use]
    pub(crate) fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("info")
    }

    /// Line template, defaulting to [`DEFAULT_LINE_TEMPLATE`]
    #[must_use]
    pub(crate) fn line_template(&self) -> &str {
        self.line_template.as_deref().unwrap_or(DEFAULT_LINE_TEMPLATE)
    }

    /// Viewer to format for; anonymous without a viewer section
    #[must_use]
    pub(crate) fn viewer(&self) -> Viewer {
        match &self.viewer {
            Some(v) if v.id > 0 => Viewer::registered(v.id, v.name.clone()).with_rights(v.rights.iter()),
            Some(v) => Viewer {
                name: v.name.clone(),
                ..Viewer::anonymous()
            }
            .with_rights(v.rights.iter()),
            None => Viewer::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.line_template(), DEFAULT_LINE_TEMPLATE);
        assert!(!config.viewer().is_identified());
    }

    #[test]
    fn parses_viewer_section() {
        let config = CliConfig::parse(
            r#"
            log_filter = "flow_formatter=debug"
            json_logs = true
            input = "dump.json"

            [viewer]
            id = 7
            name = "Ann"
            rights = ["flow-suppress"]
            "#,
        )
        .unwrap();

        assert_eq!(config.log_filter(), "flow_formatter=debug");
        assert_eq!(config.json_logs, Some(true));
        assert_eq!(config.input, Some(PathBuf::from("dump.json")));
        let viewer = config.viewer();
        assert_eq!(viewer.id, 7);
        assert!(viewer.rights.contains("flow-suppress"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(CliConfig::parse("colour = true").is_err());
    }

    #[test]
    fn load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "topic_namespace = 2600").unwrap();
        assert_eq!(CliConfig::load(file.path()).unwrap().topic_namespace, Some(2600));

        let err = CliConfig::load(Path::new("/nonexistent/flow.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flow.toml"));
    }
}
