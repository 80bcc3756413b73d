//! The request-scoped formatter
//!
//! A [`Formatter`] owns the entity cache and the per-viewer permission cache.
//! Create one per logical request and drop it afterwards; nothing it caches
//! is ever invalidated.

use crate::chardiff::{char_diff, CharDiff};
use crate::config::FormatterConfig;
use crate::dates::{ChronoLanguage, DateFormats, Language};
use crate::describe::DescriptionFormatter;
use crate::error::FormatterResult;
use crate::links::{ActionLinks, LinkBuilder};
use crate::loader::BatchLoader;
use crate::messages::{MessageCatalog, StaticCatalog};
use crate::permissions::PermissionResolver;
use crate::storage::Storage;
use crate::templating::Templating;
use crate::urls::{IndexUrlGenerator, UrlGenerator};
use flow_actions::{
    ActionTaxonomy, PermissionPolicy, PermissionScope, RenderingContext, TaxonomyPolicy, Viewer,
};
use flow_model::{EntityId, IntoEntityId, PageTitle, Revision, RevisionKind, Workflow};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entity formatting engine for one request
pub struct Formatter {
    config: FormatterConfig,
    taxonomy: Arc<ActionTaxonomy>,
    loader: BatchLoader,
    permissions: PermissionResolver,
    links: LinkBuilder,
    descriptions: DescriptionFormatter,
    catalog: Arc<dyn MessageCatalog>,
    language: Arc<dyn Language>,
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("config", &self.config)
            .field("loader", &self.loader)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl Formatter {
    /// Start building a formatter over `storage`
    #[must_use]
    pub fn builder(storage: Arc<dyn Storage>) -> FormatterBuilder {
        FormatterBuilder {
            storage,
            config: FormatterConfig::default(),
            taxonomy: None,
            policy: None,
            catalog: None,
            urls: None,
            language: None,
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Action taxonomy in use
    #[inline]
    #[must_use]
    pub fn taxonomy(&self) -> &Arc<ActionTaxonomy> {
        &self.taxonomy
    }

    /// Batch loader (and its cache)
    #[inline]
    #[must_use]
    pub fn loader(&self) -> &BatchLoader {
        &self.loader
    }

    /// Link builder, for the individual link helpers
    #[inline]
    #[must_use]
    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Message catalog in use
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn MessageCatalog> {
        &self.catalog
    }

    /// Batch-load workflows
    ///
    /// # Errors
    /// Returns error if storage fails
    pub async fn load_workflows<I>(&self, ids: I) -> FormatterResult<BTreeMap<EntityId, Arc<Workflow>>>
    where
        I: IntoIterator,
        I::Item: IntoEntityId,
    {
        self.loader.load_workflows(ids).await
    }

    /// Batch-load revisions grouped by kind
    ///
    /// # Errors
    /// Returns error if storage fails
    pub async fn load_revisions<I, J>(
        &self,
        requests: I,
    ) -> FormatterResult<BTreeMap<EntityId, Arc<Revision>>>
    where
        I: IntoIterator<Item = (RevisionKind, J)>,
        J: IntoIterator,
        J::Item: IntoEntityId,
    {
        self.loader.load_revisions(requests).await
    }

    /// Load one workflow
    ///
    /// # Errors
    /// Returns error if the id is malformed or storage fails
    pub async fn load_workflow(&self, id: impl IntoEntityId) -> FormatterResult<Option<Arc<Workflow>>> {
        self.loader.load_workflow(id).await
    }

    /// Load one revision
    ///
    /// # Errors
    /// Returns error if the id is malformed or storage fails
    pub async fn load_revision(
        &self,
        id: impl IntoEntityId,
        kind: RevisionKind,
    ) -> FormatterResult<Option<Arc<Revision>>> {
        self.loader.load_revision(id, kind).await
    }

    /// Permission scope of `viewer`
    #[must_use]
    pub fn permissions_for(&self, viewer: &Viewer) -> PermissionScope {
        self.permissions.permissions_for(viewer)
    }

    /// Links for a change type; `None` when the type is missing or unknown
    #[must_use]
    pub fn links_for(
        &self,
        page: &PageTitle,
        change_type: Option<&str>,
        workflow_id: EntityId,
        post_id: Option<EntityId>,
    ) -> Option<ActionLinks> {
        self.links.links_for(page, change_type, workflow_id, post_id)
    }

    /// Html-safe description of a revision
    #[must_use]
    pub fn describe(&self, workflow: &Workflow, block_type: &str, revision: &Revision) -> String {
        self.descriptions.describe(workflow, block_type, revision)
    }

    /// Change size of `revision` relative to `previous`
    #[must_use]
    pub fn char_diff(&self, revision: &Revision, previous: Option<&Revision>) -> Option<CharDiff> {
        char_diff(revision, previous)
    }

    /// Time-and-date, date and time of a revision for `viewer`
    #[must_use]
    pub fn date_formats(&self, revision: &Revision, viewer: &Viewer) -> DateFormats {
        DateFormats::render(self.language.as_ref(), revision.timestamp(), viewer)
    }
}

/// Builder for [`Formatter`]
pub struct FormatterBuilder {
    storage: Arc<dyn Storage>,
    config: FormatterConfig,
    taxonomy: Option<Arc<ActionTaxonomy>>,
    policy: Option<Arc<dyn PermissionPolicy>>,
    catalog: Option<Arc<dyn MessageCatalog>>,
    urls: Option<Arc<dyn UrlGenerator>>,
    language: Option<Arc<dyn Language>>,
}

impl FormatterBuilder {
    /// With configuration
    #[must_use]
    pub fn config(mut self, config: FormatterConfig) -> Self {
        self.config = config;
        self
    }

    /// With action taxonomy (defaults to the built-in board actions)
    #[must_use]
    pub fn taxonomy(mut self, taxonomy: Arc<ActionTaxonomy>) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }

    /// With permission policy (defaults to [`TaxonomyPolicy`])
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// With message catalog (defaults to English)
    #[must_use]
    pub fn catalog(mut self, catalog: Arc<dyn MessageCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// With url generator (defaults to `index.php` urls under the configured script path)
    #[must_use]
    pub fn urls(mut self, urls: Arc<dyn UrlGenerator>) -> Self {
        self.urls = Some(urls);
        self
    }

    /// With language for date rendering
    #[must_use]
    pub fn language(mut self, language: Arc<dyn Language>) -> Self {
        self.language = Some(language);
        self
    }

    /// Build the formatter
    #[must_use]
    pub fn build(self) -> Formatter {
        let config = self.config;
        let taxonomy = self
            .taxonomy
            .unwrap_or_else(|| Arc::new(ActionTaxonomy::with_defaults()));
        let policy = self.policy.unwrap_or_else(|| Arc::new(TaxonomyPolicy));
        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(StaticCatalog::english()));
        let urls = self
            .urls
            .unwrap_or_else(|| Arc::new(IndexUrlGenerator::new(config.script_path.clone())));
        let language = self
            .language
            .unwrap_or_else(|| Arc::new(ChronoLanguage::default()));

        let rendering: Arc<dyn RenderingContext> =
            Arc::new(Templating::new(Arc::clone(&urls)).with_topic_namespace(config.topic_namespace));

        Formatter {
            loader: BatchLoader::new(self.storage),
            permissions: PermissionResolver::new(Arc::clone(&taxonomy), policy),
            links: LinkBuilder::new(Arc::clone(&taxonomy), urls).with_config(config.clone()),
            descriptions: DescriptionFormatter::new(Arc::clone(&taxonomy), Arc::clone(&catalog), rendering)
                .with_fallback_key(config.fallback_description.clone()),
            taxonomy,
            catalog,
            language,
            config,
        }
    }
}
