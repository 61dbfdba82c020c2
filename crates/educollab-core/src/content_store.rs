//! [`ContentStore`] — the post, event, group and message collections.

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Result,
  content::{
    Byline, Category, Comment, Event, EventPatch, Group, GroupPatch, Message,
    MessagePatch, NewEvent, NewGroup, NewMessage, NewPost, Post, PostPatch, Record,
    toggle_member,
  },
  storage::{KeyValueStore, Storage},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Holds the four content collections in memory, newest first.
///
/// Every mutation rewrites the whole affected collection under its own key.
/// Collections are loaded and saved independently; nothing ties a write to
/// one collection to a write to another.
#[derive(Debug)]
pub struct ContentStore<S> {
  storage:  Storage<S>,
  posts:    Vec<Post>,
  events:   Vec<Event>,
  groups:   Vec<Group>,
  messages: Vec<Message>,
}

impl<S: KeyValueStore> ContentStore<S> {
  /// Read every collection from `storage`. Absent collections start empty.
  pub async fn load(storage: Storage<S>) -> Result<Self> {
    let posts: Vec<Post>       = storage.load_or_default(Post::KEY).await?;
    let events: Vec<Event>     = storage.load_or_default(Event::KEY).await?;
    let groups: Vec<Group>     = storage.load_or_default(Group::KEY).await?;
    let messages: Vec<Message> = storage.load_or_default(Message::KEY).await?;

    tracing::debug!(
      posts = posts.len(),
      events = events.len(),
      groups = groups.len(),
      messages = messages.len(),
      "loaded content"
    );

    Ok(Self { storage, posts, events, groups, messages })
  }

  pub fn posts(&self) -> &[Post] { &self.posts }

  pub fn events(&self) -> &[Event] { &self.events }

  pub fn groups(&self) -> &[Group] { &self.groups }

  pub fn messages(&self) -> &[Message] { &self.messages }

  // ── Posts ─────────────────────────────────────────────────────────────────

  /// Stamp, prepend and persist a new post.
  pub async fn add_post(&mut self, draft: NewPost) -> Result<Post> {
    insert(&self.storage, &mut self.posts, draft).await
  }

  /// Merge `patch` into the post with `id`. Unknown ids are ignored.
  pub async fn update_post(&mut self, id: Uuid, patch: PostPatch) -> Result<()> {
    modify(&self.storage, &mut self.posts, id, |post| post.apply(patch)).await?;
    Ok(())
  }

  /// Remove the post with `id`. Unknown ids are ignored.
  pub async fn delete_post(&mut self, id: Uuid) -> Result<()> {
    remove(&self.storage, &mut self.posts, id).await
  }

  pub fn find_post(&self, id: Uuid) -> Option<&Post> {
    self.posts.iter().find(|post| post.id == id)
  }

  /// Add one like. Returns the updated post, or `None` for an unknown id.
  pub async fn like_post(&mut self, id: Uuid) -> Result<Option<Post>> {
    modify(&self.storage, &mut self.posts, id, |post| {
      post.likes = post.likes.saturating_add(1);
    })
    .await
  }

  /// Append a comment to the post with `post_id`. Returns `None` for an
  /// unknown post.
  pub async fn add_comment(
    &mut self,
    post_id: Uuid,
    author: Byline,
    body: impl Into<String>,
  ) -> Result<Option<Comment>> {
    let comment = Comment {
      id:         Uuid::new_v4(),
      body:       body.into(),
      author,
      created_at: Utc::now(),
    };

    let updated = modify(&self.storage, &mut self.posts, post_id, |post| {
      post.comments.push(comment.clone());
    })
    .await?;

    Ok(updated.map(|_| comment))
  }

  /// Posts written by `author_id`, in collection order.
  pub fn user_posts(&self, author_id: Uuid) -> Vec<&Post> {
    self.posts.iter().filter(|post| post.author.id == author_id).collect()
  }

  pub fn posts_in_category(&self, category: Category) -> Vec<&Post> {
    self.posts.iter().filter(|post| post.category == category).collect()
  }

  // ── Events ────────────────────────────────────────────────────────────────

  pub async fn add_event(&mut self, draft: NewEvent) -> Result<Event> {
    insert(&self.storage, &mut self.events, draft).await
  }

  pub async fn update_event(&mut self, id: Uuid, patch: EventPatch) -> Result<()> {
    modify(&self.storage, &mut self.events, id, |event| event.apply(patch)).await?;
    Ok(())
  }

  pub async fn delete_event(&mut self, id: Uuid) -> Result<()> {
    remove(&self.storage, &mut self.events, id).await
  }

  pub fn find_event(&self, id: Uuid) -> Option<&Event> {
    self.events.iter().find(|event| event.id == id)
  }

  /// Add `attendee` to the event's attendee list if not already present.
  pub async fn attend_event(&mut self, id: Uuid, attendee: Uuid) -> Result<Option<Event>> {
    modify(&self.storage, &mut self.events, id, |event| {
      toggle_member(&mut event.attendees, attendee, true);
    })
    .await
  }

  /// Events organised by `organizer_id`.
  pub fn user_events(&self, organizer_id: Uuid) -> Vec<&Event> {
    self.events.iter().filter(|event| event.organizer.id == organizer_id).collect()
  }

  /// Case-insensitive substring match over title, description and organiser
  /// name. Only the empty query matches everything; whitespace is matched
  /// like any other character.
  pub fn search_events(&self, query: &str) -> Vec<&Event> {
    let needle = query.to_lowercase();
    self
      .events
      .iter()
      .filter(|event| {
        needle.is_empty()
          || contains_folded(&event.title, &needle)
          || contains_folded(&event.description, &needle)
          || contains_folded(&event.organizer.name, &needle)
      })
      .collect()
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  pub async fn add_group(&mut self, draft: NewGroup) -> Result<Group> {
    insert(&self.storage, &mut self.groups, draft).await
  }

  pub async fn update_group(&mut self, id: Uuid, patch: GroupPatch) -> Result<()> {
    modify(&self.storage, &mut self.groups, id, |group| group.apply(patch)).await?;
    Ok(())
  }

  pub async fn delete_group(&mut self, id: Uuid) -> Result<()> {
    remove(&self.storage, &mut self.groups, id).await
  }

  pub fn find_group(&self, id: Uuid) -> Option<&Group> {
    self.groups.iter().find(|group| group.id == id)
  }

  pub async fn join_group(&mut self, id: Uuid, member: Uuid) -> Result<Option<Group>> {
    modify(&self.storage, &mut self.groups, id, |group| {
      toggle_member(&mut group.members, member, true);
    })
    .await
  }

  pub async fn leave_group(&mut self, id: Uuid, member: Uuid) -> Result<Option<Group>> {
    modify(&self.storage, &mut self.groups, id, |group| {
      toggle_member(&mut group.members, member, false);
    })
    .await
  }

  /// Groups `user_id` created or belongs to. Each group appears once.
  pub fn user_groups(&self, user_id: Uuid) -> Vec<&Group> {
    self.groups.iter().filter(|group| group.involves(user_id)).collect()
  }

  /// Case-insensitive substring match over name and description. The empty
  /// query matches everything.
  pub fn search_groups(&self, query: &str) -> Vec<&Group> {
    let needle = query.to_lowercase();
    self
      .groups
      .iter()
      .filter(|group| {
        needle.is_empty()
          || contains_folded(&group.name, &needle)
          || contains_folded(&group.description, &needle)
      })
      .collect()
  }

  pub fn study_groups(&self) -> Vec<&Group> {
    self.groups.iter().filter(|group| group.is_study_group).collect()
  }

  pub fn community_groups(&self) -> Vec<&Group> {
    self.groups.iter().filter(|group| !group.is_study_group).collect()
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  pub async fn add_message(&mut self, draft: NewMessage) -> Result<Message> {
    insert(&self.storage, &mut self.messages, draft).await
  }

  pub async fn update_message(&mut self, id: Uuid, patch: MessagePatch) -> Result<()> {
    modify(&self.storage, &mut self.messages, id, |message| message.apply(patch)).await?;
    Ok(())
  }

  pub async fn delete_message(&mut self, id: Uuid) -> Result<()> {
    remove(&self.storage, &mut self.messages, id).await
  }

  /// Messages posted to `group_id`, newest first.
  pub fn group_messages(&self, group_id: Uuid) -> Vec<&Message> {
    self.messages.iter().filter(|message| message.group_id == group_id).collect()
  }
}

// ─── Collection helpers ──────────────────────────────────────────────────────
//
// Each helper builds the next version of the collection, persists it, and only
// then replaces the in-memory copy. A failed write leaves `items` untouched.

async fn insert<S: KeyValueStore, T: Record>(
  storage: &Storage<S>,
  items: &mut Vec<T>,
  draft: T::Draft,
) -> Result<T> {
  let record = T::from_draft(Uuid::new_v4(), Utc::now(), draft);

  let mut next = Vec::with_capacity(items.len() + 1);
  next.push(record.clone());
  next.extend(items.iter().cloned());
  storage.save(T::KEY, next.as_slice()).await?;
  *items = next;

  tracing::debug!(key = %T::KEY, id = %record.id(), "added record");
  Ok(record)
}

/// Apply `f` to the record with `id` and persist the collection. Returns the
/// updated record, or `None` (without writing) if no record has that id.
async fn modify<S, T, F>(
  storage: &Storage<S>,
  items: &mut Vec<T>,
  id: Uuid,
  f: F,
) -> Result<Option<T>>
where
  S: KeyValueStore,
  T: Record,
  F: FnOnce(&mut T),
{
  let Some(index) = items.iter().position(|item| item.id() == id) else {
    tracing::debug!(key = %T::KEY, %id, "update ignored: no such record");
    return Ok(None);
  };

  let mut next = items.clone();
  f(&mut next[index]);
  let updated = next[index].clone();
  storage.save(T::KEY, next.as_slice()).await?;
  *items = next;

  tracing::debug!(key = %T::KEY, %id, "updated record");
  Ok(Some(updated))
}

async fn remove<S: KeyValueStore, T: Record>(
  storage: &Storage<S>,
  items: &mut Vec<T>,
  id: Uuid,
) -> Result<()> {
  if !items.iter().any(|item| item.id() == id) {
    tracing::debug!(key = %T::KEY, %id, "delete ignored: no such record");
    return Ok(());
  }

  let next: Vec<T> = items.iter().filter(|item| item.id() != id).cloned().collect();
  storage.save(T::KEY, next.as_slice()).await?;
  *items = next;

  tracing::debug!(key = %T::KEY, %id, "deleted record");
  Ok(())
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
  haystack.to_lowercase().contains(folded_needle)
}
