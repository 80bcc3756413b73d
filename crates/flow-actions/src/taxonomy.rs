//! Action taxonomy
//!
//! Provides [`ActionTaxonomy`], the table of change types (plus the `view`
//! and `history` pseudo-actions) and the aliases that keep renamed change
//! types working.

use crate::error::ActionError;
use crate::params::{builtin, ParamSpec};
use flow_model::ModerationState;
use std::collections::{BTreeMap, HashMap};

/// Who may perform an action in a given moderation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// No right required
    Everyone,
    /// Any one of the listed rights
    AnyOf(Vec<String>),
}

impl Permission {
    /// Permission requiring any of `rights`
    #[must_use]
    pub fn any_of<I, S>(rights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(rights.into_iter().map(Into::into).collect())
    }
}

/// How a change type shows up in history and contribution feeds
#[derive(Debug, Clone)]
pub struct HistorySpec {
    /// Message key of the description
    pub i18n_message: String,
    /// Ordered message parameters
    pub i18n_params: Vec<ParamSpec>,
    /// Css class for history rows
    pub class: String,
}

impl HistorySpec {
    /// Create spec with message key and parameters
    #[must_use]
    pub fn new(i18n_message: impl Into<String>, i18n_params: Vec<ParamSpec>) -> Self {
        Self {
            i18n_message: i18n_message.into(),
            i18n_params,
            class: String::new(),
        }
    }

    /// Set row class
    #[inline]
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }
}

/// Full definition of an action
#[derive(Debug, Clone, Default)]
pub struct ActionDefinition {
    /// Whether revisions may carry this action as change type
    pub is_change_type: bool,
    /// History presentation
    pub history: Option<HistorySpec>,
    /// Permission by moderation state; absent states are denied
    pub permissions: HashMap<ModerationState, Permission>,
}

impl ActionDefinition {
    /// Definition for a change type
    #[must_use]
    pub fn change_type(history: HistorySpec) -> Self {
        Self {
            is_change_type: true,
            history: Some(history),
            permissions: HashMap::new(),
        }
    }

    /// Definition for a pseudo-action such as `view`
    #[must_use]
    pub fn pseudo() -> Self {
        Self::default()
    }

    /// Set permission for a moderation state
    #[must_use]
    pub fn with_permission(mut self, state: ModerationState, permission: Permission) -> Self {
        self.permissions.insert(state, permission);
        self
    }

    /// Apply the standard moderation ladder
    ///
    /// Unmoderated content is public; hidden content needs any moderation
    /// right; deleted content needs delete or suppress; suppressed content
    /// needs suppress.
    #[must_use]
    pub fn with_moderation_ladder(self) -> Self {
        self.with_permission(ModerationState::None, Permission::Everyone)
            .with_permission(ModerationState::Lock, Permission::Everyone)
            .with_permission(
                ModerationState::Hide,
                Permission::any_of(["flow-hide", "flow-delete", "flow-suppress"]),
            )
            .with_permission(
                ModerationState::Delete,
                Permission::any_of(["flow-delete", "flow-suppress"]),
            )
            .with_permission(ModerationState::Suppress, Permission::any_of(["flow-suppress"]))
    }
}

/// Taxonomy entry: a definition, or an alias to one
#[derive(Debug, Clone)]
pub enum ActionEntry {
    /// Proper action
    Definition(ActionDefinition),
    /// Renamed action; holds the canonical name
    Alias(String),
}

/// Table of actions keyed by name
///
/// Aliases resolve in a single hop; [`ActionTaxonomy::register_alias`]
/// refuses chains and dangling targets.
#[derive(Debug, Clone, Default)]
pub struct ActionTaxonomy {
    entries: BTreeMap<String, ActionEntry>,
}

impl ActionTaxonomy {
    /// Create empty taxonomy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create taxonomy with the built-in board actions
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut taxonomy = Self::new();
        for (name, definition) in default_definitions() {
            taxonomy.entries.insert(name.to_string(), ActionEntry::Definition(definition));
        }
        for (alias, target) in [("censor-post", "suppress-post"), ("censor-topic", "suppress-topic")] {
            taxonomy.entries.insert(alias.to_string(), ActionEntry::Alias(target.to_string()));
        }
        taxonomy
    }

    /// Register an action definition
    ///
    /// # Errors
    /// Returns [`ActionError::Duplicate`] if the name is taken
    pub fn register(
        &mut self,
        name: impl Into<String>,
        definition: ActionDefinition,
    ) -> Result<(), ActionError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ActionError::Duplicate(name));
        }
        self.entries.insert(name, ActionEntry::Definition(definition));
        Ok(())
    }

    /// Register a legacy name for an existing action
    ///
    /// # Errors
    /// - [`ActionError::Duplicate`] if `alias` is taken
    /// - [`ActionError::DanglingAlias`] if `target` is unknown
    /// - [`ActionError::ChainedAlias`] if `target` is itself an alias
    pub fn register_alias(
        &mut self,
        alias: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), ActionError> {
        let alias = alias.into();
        let target = target.into();
        if self.entries.contains_key(&alias) {
            return Err(ActionError::Duplicate(alias));
        }
        match self.entries.get(&target) {
            None => return Err(ActionError::DanglingAlias { alias, target }),
            Some(ActionEntry::Alias(_)) => return Err(ActionError::ChainedAlias { alias, target }),
            Some(ActionEntry::Definition(_)) => {}
        }
        self.entries.insert(alias, ActionEntry::Alias(target));
        Ok(())
    }

    /// Raw entry lookup, without alias resolution
    #[inline]
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ActionEntry> {
        self.entries.get(name)
    }

    /// Canonical name: the alias target for aliases, the name itself otherwise
    #[must_use]
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.entries.get(name) {
            Some(ActionEntry::Alias(target)) => target.as_str(),
            _ => name,
        }
    }

    /// Definition after alias resolution
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&ActionDefinition> {
        match self.entries.get(self.canonical_name(name)) {
            Some(ActionEntry::Definition(def)) => Some(def),
            _ => None,
        }
    }

    /// History spec after alias resolution
    #[inline]
    #[must_use]
    pub fn history(&self, name: &str) -> Option<&HistorySpec> {
        self.definition(name).and_then(|d| d.history.as_ref())
    }

    /// Permission for `name` in `state`
    #[inline]
    #[must_use]
    pub fn permission(&self, name: &str, state: ModerationState) -> Option<&Permission> {
        self.definition(name).and_then(|d| d.permissions.get(&state))
    }

    /// Whether `name` (or its alias target) is a known change type
    #[inline]
    #[must_use]
    pub fn is_change_type(&self, name: &str) -> bool {
        self.definition(name).is_some_and(|d| d.is_change_type)
    }

    /// Canonical change type names
    pub fn change_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            ActionEntry::Definition(def) if def.is_change_type => Some(name.as_str()),
            _ => None,
        })
    }

    /// Legacy names and their targets
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            ActionEntry::Alias(target) => Some((name.as_str(), target.as_str())),
            ActionEntry::Definition(_) => None,
        })
    }

    /// Number of entries, aliases included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if taxonomy is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn default_definitions() -> Vec<(&'static str, ActionDefinition)> {
    use builtin::{block_type, content, moderated_reason, post_url, user_links, user_text, workflow_url};

    let history = |key: &str, params: Vec<ParamSpec>, class: &str| {
        ActionDefinition::change_type(HistorySpec::new(key, params).with_class(class))
            .with_moderation_ladder()
    };
    let moderation = |key: &str| {
        history(
            key,
            vec![user_links(), user_text(), post_url(), moderated_reason(), workflow_url()],
            "flow-history-moderation",
        )
    };

    vec![
        (
            "new-post",
            history(
                "flow-rev-message-new-post",
                vec![user_links(), user_text(), workflow_url(), content()],
                "flow-history-new-post",
            ),
        ),
        (
            "reply",
            history(
                "flow-rev-message-reply",
                vec![user_links(), user_text(), post_url(), workflow_url()],
                "flow-history-reply",
            ),
        ),
        (
            "edit-post",
            history(
                "flow-rev-message-edit-post",
                vec![user_links(), user_text(), post_url(), workflow_url()],
                "flow-history-edit-post",
            ),
        ),
        (
            "edit-title",
            history(
                "flow-rev-message-edit-title",
                vec![user_links(), user_text(), workflow_url(), content()],
                "flow-history-edit-title",
            ),
        ),
        (
            "create-header",
            history(
                "flow-rev-message-create-header",
                vec![user_links(), user_text(), block_type()],
                "flow-history-create-header",
            ),
        ),
        (
            "edit-header",
            history(
                "flow-rev-message-edit-header",
                vec![user_links(), user_text(), block_type()],
                "flow-history-edit-header",
            ),
        ),
        ("hide-post", moderation("flow-rev-message-hid-post")),
        ("delete-post", moderation("flow-rev-message-deleted-post")),
        ("suppress-post", moderation("flow-rev-message-suppressed-post")),
        ("restore-post", moderation("flow-rev-message-restored-post")),
        ("hide-topic", moderation("flow-rev-message-hid-topic")),
        ("delete-topic", moderation("flow-rev-message-deleted-topic")),
        ("suppress-topic", moderation("flow-rev-message-suppressed-topic")),
        ("restore-topic", moderation("flow-rev-message-restored-topic")),
        ("view", ActionDefinition::pseudo().with_moderation_ladder()),
        ("history", ActionDefinition::pseudo().with_moderation_ladder()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_new_empty() {
        let taxonomy = ActionTaxonomy::new();
        assert!(taxonomy.is_empty());
        assert_eq!(taxonomy.len(), 0);
    }

    #[test]
    fn defaults_contain_change_types_and_aliases() {
        let taxonomy = ActionTaxonomy::with_defaults();
        assert!(taxonomy.is_change_type("reply"));
        assert!(taxonomy.is_change_type("censor-post"));
        assert!(!taxonomy.is_change_type("view"));
        assert!(!taxonomy.is_change_type("frobnicate"));

        let aliases: Vec<_> = taxonomy.aliases().collect();
        assert!(aliases.contains(&("censor-topic", "suppress-topic")));
    }

    #[test]
    fn alias_resolves_to_same_history() {
        let taxonomy = ActionTaxonomy::with_defaults();
        let via_alias = taxonomy.history("censor-post").unwrap();
        let direct = taxonomy.history("suppress-post").unwrap();
        assert_eq!(via_alias.i18n_message, direct.i18n_message);
    }

    #[test]
    fn canonical_name_passthrough() {
        let taxonomy = ActionTaxonomy::with_defaults();
        assert_eq!(taxonomy.canonical_name("reply"), "reply");
        assert_eq!(taxonomy.canonical_name("unknown"), "unknown");
    }

    #[test]
    fn register_alias_rejects_bad_targets() {
        let mut taxonomy = ActionTaxonomy::with_defaults();
        assert!(matches!(
            taxonomy.register_alias("old-thing", "missing"),
            Err(ActionError::DanglingAlias { .. })
        ));
        assert!(matches!(
            taxonomy.register_alias("older-censor", "censor-post"),
            Err(ActionError::ChainedAlias { .. })
        ));
        assert!(matches!(
            taxonomy.register_alias("reply", "edit-post"),
            Err(ActionError::Duplicate(_))
        ));
        assert!(taxonomy.register_alias("new-topic", "new-post").is_ok());
        assert_eq!(taxonomy.canonical_name("new-topic"), "new-post");
    }

    #[test]
    fn permission_ladder() {
        let taxonomy = ActionTaxonomy::with_defaults();
        assert_eq!(
            taxonomy.permission("history", ModerationState::None),
            Some(&Permission::Everyone)
        );
        assert_eq!(
            taxonomy.permission("history", ModerationState::Suppress),
            Some(&Permission::any_of(["flow-suppress"]))
        );
        assert_eq!(taxonomy.permission("nope", ModerationState::None), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_lookup_never_panics(name in "[a-z-]{0,24}") {
            let taxonomy = ActionTaxonomy::with_defaults();
            let canonical = taxonomy.canonical_name(&name);
            proptest::prop_assert!(!matches!(taxonomy.entry(canonical), Some(ActionEntry::Alias(_))));
            let _ = taxonomy.history(&name);
        }
    }
}
