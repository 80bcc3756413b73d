//! Revisions: immutable, append-only content snapshots
//!
//! A new revision supersedes its predecessor by reference
//! ([`Revision::previous_id`]); nothing is ever overwritten.

use crate::error::ModelError;
use crate::id::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which object a revision snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevisionKind {
    /// Board description
    Header,
    /// Topic title or reply
    Post,
    /// Topic summary
    PostSummary,
}

impl RevisionKind {
    /// Stable name (storage class)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Post => "post",
            Self::PostSummary => "post-summary",
        }
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RevisionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(Self::Header),
            "post" => Ok(Self::Post),
            "post-summary" => Ok(Self::PostSummary),
            other => Err(ModelError::UnknownRevisionKind(other.to_string())),
        }
    }
}

/// Moderation state of a revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    /// Visible to everyone
    #[default]
    None,
    /// Hidden, visible on request
    Hide,
    /// Deleted, visible to moderators
    Delete,
    /// Suppressed, visible to oversighters
    Suppress,
    /// Topic locked
    Lock,
}

impl ModerationState {
    /// Stable name used by the taxonomy
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Hide => "hide",
            Self::Delete => "delete",
            Self::Suppress => "suppress",
            Self::Lock => "lock",
        }
    }

    /// Numeric severity (0 = not moderated)
    #[inline]
    #[must_use]
    pub fn level(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Lock => 1,
            Self::Hide => 2,
            Self::Delete => 3,
            Self::Suppress => 4,
        }
    }

    /// Whether any moderation applies
    #[inline]
    #[must_use]
    pub fn is_moderated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for ModerationState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Self::None),
            "hide" => Ok(Self::Hide),
            "delete" => Ok(Self::Delete),
            "suppress" => Ok(Self::Suppress),
            "lock" => Ok(Self::Lock),
            other => Err(ModelError::UnknownModerationState(other.to_string())),
        }
    }
}

/// Change-type tag, e.g. `reply`, `edit-title`, `moderate-topic`
///
/// Stored as written; the taxonomy decides whether it is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeType(String);

impl ChangeType {
    /// Wrap a tag
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Author of a revision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UserRef {
    /// Account id, 0 for anonymous
    pub id: u64,
    /// User name or IP address
    pub name: String,
}

impl UserRef {
    /// Registered user
    #[inline]
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Anonymous editor identified by address
    #[inline]
    #[must_use]
    pub fn anonymous(address: impl Into<String>) -> Self {
        Self::new(0, address)
    }

    /// Whether this is an anonymous editor
    #[inline]
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id == 0
    }
}

/// Immutable content snapshot
///
/// # Invariants
/// - Never mutated after construction (no setters)
/// - `id` embeds the creation timestamp; the current revision of an object is
///   the one with the greatest `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    #[serde(rename = "revisionId")]
    id: EntityId,
    kind: RevisionKind,
    object_id: EntityId,
    #[serde(default)]
    previous_id: Option<EntityId>,
    #[serde(default)]
    change_type: Option<ChangeType>,
    #[serde(default)]
    content: String,
    #[serde(default = "default_format")]
    content_format: String,
    #[serde(default)]
    moderation_state: ModerationState,
    #[serde(default)]
    moderated_reason: Option<String>,
    #[serde(default)]
    user: UserRef,
}

fn default_format() -> String {
    "wikitext".to_string()
}

impl Revision {
    /// Start building a revision of `object_id`
    #[inline]
    #[must_use]
    pub fn builder(kind: RevisionKind, object_id: EntityId) -> RevisionBuilder {
        RevisionBuilder::new(kind, object_id)
    }

    /// Revision identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Kind of object snapshotted
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RevisionKind {
        self.kind
    }

    /// Post (or workflow, for headers) this revision belongs to
    #[inline]
    #[must_use]
    pub fn object_id(&self) -> EntityId {
        self.object_id
    }

    /// Post id, for post revisions
    #[inline]
    #[must_use]
    pub fn post_id(&self) -> Option<EntityId> {
        (self.kind == RevisionKind::Post).then_some(self.object_id)
    }

    /// Superseded revision, if any
    #[inline]
    #[must_use]
    pub fn previous_id(&self) -> Option<EntityId> {
        self.previous_id
    }

    /// Change type tag (may be absent on corrupted rows)
    #[inline]
    #[must_use]
    pub fn change_type(&self) -> Option<&ChangeType> {
        self.change_type.as_ref()
    }

    /// Raw stored content
    #[inline]
    #[must_use]
    pub fn content_raw(&self) -> &str {
        &self.content
    }

    /// Content format (`wikitext`, `html`, ...)
    #[inline]
    #[must_use]
    pub fn content_format(&self) -> &str {
        &self.content_format
    }

    /// Moderation state
    #[inline]
    #[must_use]
    pub fn moderation_state(&self) -> ModerationState {
        self.moderation_state
    }

    /// Whether the revision is moderated
    #[inline]
    #[must_use]
    pub fn is_moderated(&self) -> bool {
        self.moderation_state.is_moderated()
    }

    /// Reason given by the moderator
    #[inline]
    #[must_use]
    pub fn moderated_reason(&self) -> Option<&str> {
        self.moderated_reason.as_deref()
    }

    /// Author
    #[inline]
    #[must_use]
    pub fn user(&self) -> &UserRef {
        &self.user
    }

    /// Creation time (from the identifier)
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.id.timestamp()
    }
}

/// Builder for [`Revision`]
#[derive(Debug, Clone)]
pub struct RevisionBuilder {
    id: Option<EntityId>,
    kind: RevisionKind,
    object_id: EntityId,
    previous_id: Option<EntityId>,
    change_type: Option<ChangeType>,
    content: String,
    content_format: String,
    moderation_state: ModerationState,
    moderated_reason: Option<String>,
    user: UserRef,
}

impl RevisionBuilder {
    fn new(kind: RevisionKind, object_id: EntityId) -> Self {
        Self {
            id: None,
            kind,
            object_id,
            previous_id: None,
            change_type: None,
            content: String::new(),
            content_format: default_format(),
            moderation_state: ModerationState::None,
            moderated_reason: None,
            user: UserRef::default(),
        }
    }

    /// Use a fixed identifier instead of generating one
    #[inline]
    #[must_use]
    pub fn id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the superseded revision
    #[inline]
    #[must_use]
    pub fn previous(mut self, previous: EntityId) -> Self {
        self.previous_id = Some(previous);
        self
    }

    /// Set the change type
    #[inline]
    #[must_use]
    pub fn change_type(mut self, change_type: impl Into<ChangeType>) -> Self {
        self.change_type = Some(change_type.into());
        self
    }

    /// Set the raw content
    #[inline]
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the content format
    #[inline]
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.content_format = format.into();
        self
    }

    /// Set moderation state and reason
    #[inline]
    #[must_use]
    pub fn moderated(mut self, state: ModerationState, reason: impl Into<String>) -> Self {
        self.moderation_state = state;
        self.moderated_reason = Some(reason.into());
        self
    }

    /// Set the author
    #[inline]
    #[must_use]
    pub fn user(mut self, user: UserRef) -> Self {
        self.user = user;
        self
    }

    /// Finish the revision
    #[must_use]
    pub fn build(self) -> Revision {
        Revision {
            id: self.id.unwrap_or_default(),
            kind: self.kind,
            object_id: self.object_id,
            previous_id: self.previous_id,
            change_type: self.change_type,
            content: self.content,
            content_format: self.content_format,
            moderation_state: self.moderation_state,
            moderated_reason: self.moderated_reason,
            user: self.user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_only_for_posts() {
        let object = EntityId::new();
        let post = Revision::builder(RevisionKind::Post, object).build();
        let header = Revision::builder(RevisionKind::Header, object).build();

        assert_eq!(post.post_id(), Some(object));
        assert_eq!(header.post_id(), None);
    }

    #[test]
    fn moderation_flags() {
        let revision = Revision::builder(RevisionKind::Post, EntityId::new())
            .change_type("hide-post")
            .moderated(ModerationState::Hide, "spam")
            .build();

        assert!(revision.is_moderated());
        assert_eq!(revision.moderated_reason(), Some("spam"));
        assert_eq!(revision.moderation_state().level(), 2);
    }

    #[test]
    fn moderation_state_parse() {
        assert_eq!("".parse::<ModerationState>().unwrap(), ModerationState::None);
        assert_eq!("suppress".parse::<ModerationState>().unwrap(), ModerationState::Suppress);
        assert!("banish".parse::<ModerationState>().is_err());
    }

    #[test]
    fn revision_json_shape() {
        let revision = Revision::builder(RevisionKind::Post, EntityId::from_parts(1, 1))
            .id(EntityId::from_parts(2, 2))
            .change_type("reply")
            .content("hi")
            .user(UserRef::new(3, "Alice"))
            .build();

        let json = serde_json::to_value(&revision).unwrap();
        assert_eq!(json["changeType"], "reply");
        assert_eq!(json["kind"], "post");
        assert_eq!(json["revisionId"], revision.id().to_string());

        let back: Revision = serde_json::from_value(json).unwrap();
        assert_eq!(back, revision);
    }
}
