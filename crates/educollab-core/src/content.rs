//! Content types — posts, events, groups and chat messages.
//!
//! Every entity carries a denormalised [`Byline`] of whoever created it. The
//! byline is copied at creation time and never refreshed, so later profile
//! edits do not rewrite history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{identity::{Identity, Role}, storage::StorageKey};

// ─── Shared ──────────────────────────────────────────────────────────────────

/// Who wrote something, as they looked when they wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Byline {
  pub id:     Uuid,
  pub name:   String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
}

impl From<&Identity> for Byline {
  fn from(identity: &Identity) -> Self {
    Self {
      id:     identity.id,
      name:   identity.name.clone(),
      avatar: identity.avatar.clone(),
    }
  }
}

/// The kind of file an [`Attachment`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
  Pdf,
  Image,
  Doc,
  Other,
}

/// A file reference attached to a post or message. No bytes are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub id:   Uuid,
  pub name: String,
  pub url:  String,
  pub kind: AttachmentKind,
  /// Size in bytes.
  pub size: u64,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A member of one of the content collections.
///
/// `Draft` is everything a caller supplies; the store assigns `id` and
/// `created_at`. `Patch` is a partial update merged by id.
pub trait Record: Clone + Serialize + serde::de::DeserializeOwned {
  type Draft;
  type Patch;

  /// The storage key the whole collection is persisted under.
  const KEY: StorageKey;

  fn id(&self) -> Uuid;

  fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: Self::Draft) -> Self;

  fn apply(&mut self, patch: Self::Patch);
}

macro_rules! merge {
  ($target:expr, $patch:expr; $($field:ident),+ $(,)?) => {
    $(
      if let Some(value) = $patch.$field {
        $target.$field = value;
      }
    )+
  };
}

// ─── Posts ───────────────────────────────────────────────────────────────────

/// The closed set of post categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Idea,
  Project,
  Note,
  General,
}

/// A comment on a post. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub id:         Uuid,
  pub body:       String,
  pub author:     Byline,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub id:          Uuid,
  pub title:       String,
  pub body:        String,
  pub author:      Byline,
  pub author_role: Role,
  pub category:    Category,
  pub created_at:  DateTime<Utc>,
  pub likes:       u32,
  /// Oldest first.
  #[serde(default)]
  pub comments:    Vec<Comment>,
  #[serde(default)]
  pub attachments: Vec<Attachment>,
}

/// Input to [`crate::ContentStore::add_post`].
#[derive(Debug, Clone)]
pub struct NewPost {
  pub title:       String,
  pub body:        String,
  pub author:      Byline,
  pub author_role: Role,
  pub category:    Category,
  pub likes:       u32,
  pub comments:    Vec<Comment>,
  pub attachments: Vec<Attachment>,
}

impl NewPost {
  /// A fresh post by `author` with no likes, comments or attachments.
  pub fn new(
    author: &Identity,
    title: impl Into<String>,
    body: impl Into<String>,
    category: Category,
  ) -> Self {
    Self {
      title: title.into(),
      body: body.into(),
      author: Byline::from(author),
      author_role: author.role(),
      category,
      likes: 0,
      comments: Vec::new(),
      attachments: Vec::new(),
    }
  }
}

/// Partial update for a [`Post`]. The author snapshot is not patchable.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
  pub title:       Option<String>,
  pub body:        Option<String>,
  pub category:    Option<Category>,
  pub likes:       Option<u32>,
  pub comments:    Option<Vec<Comment>>,
  pub attachments: Option<Vec<Attachment>>,
}

impl Record for Post {
  type Draft = NewPost;
  type Patch = PostPatch;

  const KEY: StorageKey = StorageKey::Posts;

  fn id(&self) -> Uuid { self.id }

  fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: NewPost) -> Self {
    Self {
      id,
      title: draft.title,
      body: draft.body,
      author: draft.author,
      author_role: draft.author_role,
      category: draft.category,
      created_at,
      likes: draft.likes,
      comments: draft.comments,
      attachments: draft.attachments,
    }
  }

  fn apply(&mut self, patch: PostPatch) {
    merge!(self, patch; title, body, category, likes, comments, attachments);
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A scheduled happening. `date` and `time` are display strings; nothing
/// parses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:          Uuid,
  pub title:       String,
  pub description: String,
  pub organizer:   Byline,
  pub location:    String,
  pub date:        String,
  pub time:        String,
  #[serde(default)]
  pub attendees:   Vec<Uuid>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image:       Option<String>,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
  pub title:       String,
  pub description: String,
  pub organizer:   Byline,
  pub location:    String,
  pub date:        String,
  pub time:        String,
  pub attendees:   Vec<Uuid>,
  pub image:       Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub location:    Option<String>,
  pub date:        Option<String>,
  pub time:        Option<String>,
  pub attendees:   Option<Vec<Uuid>>,
  pub image:       Option<String>,
}

impl Record for Event {
  type Draft = NewEvent;
  type Patch = EventPatch;

  const KEY: StorageKey = StorageKey::Events;

  fn id(&self) -> Uuid { self.id }

  fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: NewEvent) -> Self {
    Self {
      id,
      title: draft.title,
      description: draft.description,
      organizer: draft.organizer,
      location: draft.location,
      date: draft.date,
      time: draft.time,
      attendees: draft.attendees,
      image: draft.image,
      created_at,
    }
  }

  fn apply(&mut self, patch: EventPatch) {
    merge!(self, patch; title, description, location, date, time, attendees);
    if let Some(image) = patch.image {
      self.image = Some(image);
    }
  }
}

// ─── Groups ──────────────────────────────────────────────────────────────────

/// A study group or a general community group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub id:             Uuid,
  pub name:           String,
  pub description:    String,
  #[serde(default)]
  pub members:        Vec<Uuid>,
  pub created_by:     Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar:         Option<String>,
  pub is_study_group: bool,
  pub created_at:     DateTime<Utc>,
}

impl Group {
  /// Whether `id` created the group or is in its member list.
  pub fn involves(&self, id: Uuid) -> bool {
    self.created_by == id || self.members.contains(&id)
  }
}

#[derive(Debug, Clone)]
pub struct NewGroup {
  pub name:           String,
  pub description:    String,
  pub members:        Vec<Uuid>,
  pub created_by:     Uuid,
  pub avatar:         Option<String>,
  pub is_study_group: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GroupPatch {
  pub name:           Option<String>,
  pub description:    Option<String>,
  pub members:        Option<Vec<Uuid>>,
  pub avatar:         Option<String>,
  pub is_study_group: Option<bool>,
}

impl Record for Group {
  type Draft = NewGroup;
  type Patch = GroupPatch;

  const KEY: StorageKey = StorageKey::Groups;

  fn id(&self) -> Uuid { self.id }

  fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: NewGroup) -> Self {
    Self {
      id,
      name: draft.name,
      description: draft.description,
      members: draft.members,
      created_by: draft.created_by,
      avatar: draft.avatar,
      is_study_group: draft.is_study_group,
      created_at,
    }
  }

  fn apply(&mut self, patch: GroupPatch) {
    merge!(self, patch; name, description, members, is_study_group);
    if let Some(avatar) = patch.avatar {
      self.avatar = Some(avatar);
    }
  }
}

// ─── Messages ────────────────────────────────────────────────────────────────

/// A chat message posted to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:          Uuid,
  pub body:        String,
  pub sender:      Byline,
  pub group_id:    Uuid,
  pub created_at:  DateTime<Utc>,
  #[serde(default)]
  pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
  pub body:        String,
  pub sender:      Byline,
  pub group_id:    Uuid,
  pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
  pub body:        Option<String>,
  pub attachments: Option<Vec<Attachment>>,
}

impl Record for Message {
  type Draft = NewMessage;
  type Patch = MessagePatch;

  const KEY: StorageKey = StorageKey::Messages;

  fn id(&self) -> Uuid { self.id }

  fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: NewMessage) -> Self {
    Self {
      id,
      body: draft.body,
      sender: draft.sender,
      group_id: draft.group_id,
      created_at,
      attachments: draft.attachments,
    }
  }

  fn apply(&mut self, patch: MessagePatch) {
    merge!(self, patch; body, attachments);
  }
}

/// Add or remove `id` from a membership list, keeping entries unique.
/// Returns whether the list changed.
pub(crate) fn toggle_member(list: &mut Vec<Uuid>, id: Uuid, present: bool) -> bool {
  if present {
    if list.contains(&id) {
      return false;
    }
    list.push(id);
    true
  } else {
    let before = list.len();
    list.retain(|existing| *existing != id);
    list.len() != before
  }
}
