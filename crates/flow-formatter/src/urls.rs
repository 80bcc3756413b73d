//! Url generation contract and a default `index.php` style generator

use flow_model::PageTitle;
use url::form_urlencoded;

/// Builds navigable urls for board actions
pub trait UrlGenerator: Send + Sync {
    /// Url for `action` on `page` with extra query pairs
    fn build_url(&self, page: &PageTitle, action: &str, query: &[(String, String)]) -> String;
}

/// Generates `<script>?title=<page>&action=<action>&...` urls
#[derive(Debug, Clone)]
pub struct IndexUrlGenerator {
    script_path: String,
}

impl IndexUrlGenerator {
    /// Create generator for a script path such as `/w/index.php`
    #[inline]
    #[must_use]
    pub fn new(script_path: impl Into<String>) -> Self {
        Self {
            script_path: script_path.into(),
        }
    }
}

impl Default for IndexUrlGenerator {
    fn default() -> Self {
        Self::new("/index.php")
    }
}

impl UrlGenerator for IndexUrlGenerator {
    fn build_url(&self, page: &PageTitle, action: &str, query: &[(String, String)]) -> String {
        let mut pairs = form_urlencoded::Serializer::new(String::new());
        pairs.append_pair("title", &page.prefixed_db());
        if action != "view" {
            pairs.append_pair("action", action);
        }
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
        format!("{}?{}", self.script_path, pairs.finish())
    }
}
