//! Subcommand definitions and their dispatch onto the stores.
//!
//! Every command returns a JSON value; `main` prints it.

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand, ValueEnum};
use educollab_core::{
  ContentStore, IdentityConfig, IdentityStore, Storage,
  content::{
    Byline, Category, EventPatch, GroupPatch, NewEvent, NewGroup, NewMessage, NewPost,
    PostPatch,
  },
  identity::{Identity, IdentityPatch, NewIdentity, Role, RoleProfile},
  storage::KeyValueStore,
};
use serde_json::{Value, json};
use uuid::Uuid;

// ─── Session ──────────────────────────────────────────────────────────────────

/// Both stores, restored from the same storage for one invocation.
pub struct Session<S> {
  pub identities: IdentityStore<S>,
  pub content:    ContentStore<S>,
}

impl<S: KeyValueStore + Clone> Session<S> {
  pub async fn open(storage: Storage<S>, config: IdentityConfig) -> Result<Self> {
    let identities = IdentityStore::restore(storage.clone(), config)
      .await
      .context("failed to restore session")?;
    let content = ContentStore::load(storage)
      .await
      .context("failed to load content")?;
    Ok(Self { identities, content })
  }

  fn me(&self) -> Result<Identity> {
    self
      .identities
      .current()
      .cloned()
      .context("not logged in; run `educollab login` or `educollab signup` first")
  }
}

// ─── Value enums ──────────────────────────────────────────────────────────────

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RoleArg {
  Learner,
  Instructor,
  Organization,
}

impl From<RoleArg> for Role {
  fn from(arg: RoleArg) -> Self {
    match arg {
      RoleArg::Learner => Role::Learner,
      RoleArg::Instructor => Role::Instructor,
      RoleArg::Organization => Role::Organization,
    }
  }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CategoryArg {
  Idea,
  Project,
  Note,
  General,
}

impl From<CategoryArg> for Category {
  fn from(arg: CategoryArg) -> Self {
    match arg {
      CategoryArg::Idea => Category::Idea,
      CategoryArg::Project => Category::Project,
      CategoryArg::Note => Category::Note,
      CategoryArg::General => Category::General,
    }
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Register a new identity and log in as it.
  Signup(SignupArgs),
  /// Log in; unknown emails create a new identity unless disabled in config.
  Login {
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: String,
    /// Role for an identity created by this login.
    #[arg(long, value_enum)]
    role:     Option<RoleArg>,
  },
  /// End the current session.
  Logout,
  /// Show the current identity.
  Whoami,
  /// Edit the current identity.
  Profile(ProfileArgs),
  /// Follow another identity.
  Follow { id: Uuid },
  /// Stop following another identity.
  Unfollow { id: Uuid },
  /// List every registered identity.
  People,
  #[command(subcommand)]
  Post(PostCommand),
  #[command(subcommand)]
  Event(EventCommand),
  #[command(subcommand)]
  Group(GroupCommand),
  #[command(subcommand)]
  Message(MessageCommand),
}

#[derive(Args, Debug)]
pub struct SignupArgs {
  #[arg(long)]
  name:       String,
  #[arg(long)]
  email:      String,
  #[arg(long)]
  password:   String,
  #[arg(long, value_enum, default_value = "learner")]
  role:       RoleArg,
  /// Year of study (learners only).
  #[arg(long)]
  year:       Option<u8>,
  /// Subject taught (instructors only); repeatable.
  #[arg(long = "subject")]
  subjects:   Vec<String>,
  #[arg(long)]
  department: Option<String>,
  #[arg(long)]
  bio:        Option<String>,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
  #[arg(long)]
  name:       Option<String>,
  #[arg(long)]
  bio:        Option<String>,
  #[arg(long)]
  department: Option<String>,
  #[arg(long)]
  avatar:     Option<String>,
  /// Year of study (learners only).
  #[arg(long)]
  year:       Option<u8>,
  /// Replace the subject list (instructors only); repeatable.
  #[arg(long = "subject")]
  subjects:   Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
  Add {
    #[arg(long)]
    title:    String,
    #[arg(long)]
    body:     String,
    #[arg(long, value_enum, default_value = "general")]
    category: CategoryArg,
  },
  List {
    #[arg(long)]
    author:   Option<Uuid>,
    #[arg(long, value_enum)]
    category: Option<CategoryArg>,
    /// Only posts by the current identity.
    #[arg(long)]
    mine:     bool,
  },
  Edit {
    id:       Uuid,
    #[arg(long)]
    title:    Option<String>,
    #[arg(long)]
    body:     Option<String>,
    #[arg(long, value_enum)]
    category: Option<CategoryArg>,
  },
  Delete { id: Uuid },
  Like { id: Uuid },
  Comment {
    id:   Uuid,
    #[arg(long)]
    body: String,
  },
}

#[derive(Subcommand, Debug)]
pub enum EventCommand {
  Add {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    location:    String,
    #[arg(long)]
    date:        String,
    #[arg(long)]
    time:        String,
    #[arg(long)]
    image:       Option<String>,
  },
  List {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    mine:   bool,
  },
  Edit {
    id:          Uuid,
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    location:    Option<String>,
    #[arg(long)]
    date:        Option<String>,
    #[arg(long)]
    time:        Option<String>,
  },
  Delete { id: Uuid },
  Attend { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
  Add {
    #[arg(long)]
    name:        String,
    #[arg(long)]
    description: String,
    /// Mark as a study group rather than a community group.
    #[arg(long)]
    study:       bool,
  },
  List {
    #[arg(long)]
    search:    Option<String>,
    #[arg(long)]
    mine:      bool,
    #[arg(long, conflicts_with = "community")]
    study:     bool,
    #[arg(long)]
    community: bool,
  },
  Edit {
    id:          Uuid,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  Delete { id: Uuid },
  Join { id: Uuid },
  Leave { id: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum MessageCommand {
  Send {
    #[arg(long)]
    group: Uuid,
    #[arg(long)]
    body:  String,
  },
  List {
    #[arg(long)]
    group: Uuid,
  },
  Delete { id: Uuid },
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run<S: KeyValueStore + Clone>(
  command: Command,
  session: &mut Session<S>,
) -> Result<Value> {
  match command {
    Command::Signup(args) => signup(session, args).await,
    Command::Login { email, password, role } => {
      let ok = session
        .identities
        .authenticate(&email, &password, role.map(Role::from))
        .await?;
      Ok(json!({ "authenticated": ok, "identity": session.identities.current() }))
    }
    Command::Logout => {
      session.identities.deauthenticate().await?;
      Ok(json!({ "authenticated": false }))
    }
    Command::Whoami => Ok(json!({
      "authenticated": session.identities.is_authenticated(),
      "identity": session.identities.current(),
    })),
    Command::Profile(args) => profile(session, args).await,
    Command::Follow { id } => {
      let changed = session.identities.follow(id).await?;
      Ok(json!({ "followed": changed, "id": id }))
    }
    Command::Unfollow { id } => {
      let changed = session.identities.unfollow(id).await?;
      Ok(json!({ "unfollowed": changed, "id": id }))
    }
    Command::People => Ok(serde_json::to_value(session.identities.registry().await?)?),
    Command::Post(cmd) => post(session, cmd).await,
    Command::Event(cmd) => event(session, cmd).await,
    Command::Group(cmd) => group(session, cmd).await,
    Command::Message(cmd) => message(session, cmd).await,
  }
}

const ROLE_FIELDS_MISMATCH: &str = "--year applies to learners and --subject to instructors";

async fn signup<S: KeyValueStore + Clone>(
  session: &mut Session<S>,
  args: SignupArgs,
) -> Result<Value> {
  let profile = match (args.role, args.year, args.subjects.is_empty()) {
    (RoleArg::Learner, year, true) => RoleProfile::Learner { year_of_study: year },
    (RoleArg::Instructor, None, _) => RoleProfile::Instructor { subjects: args.subjects },
    (RoleArg::Organization, None, true) => RoleProfile::Organization,
    _ => bail!(ROLE_FIELDS_MISMATCH),
  };

  let mut input = NewIdentity::new(args.name, args.email, args.password, profile);
  input.department = args.department;
  input.bio = args.bio;

  let created = session.identities.register(input).await?;
  if !created {
    bail!("an identity with that email is already registered");
  }
  Ok(serde_json::to_value(session.identities.current())?)
}

async fn profile<S: KeyValueStore + Clone>(
  session: &mut Session<S>,
  args: ProfileArgs,
) -> Result<Value> {
  let me = session.me()?;

  let profile = match (&me.profile, args.year, args.subjects.is_empty()) {
    (_, None, true) => None,
    (RoleProfile::Learner { .. }, year, true) => Some(RoleProfile::Learner { year_of_study: year }),
    (RoleProfile::Instructor { .. }, None, false) => {
      Some(RoleProfile::Instructor { subjects: args.subjects })
    }
    _ => bail!(ROLE_FIELDS_MISMATCH),
  };

  let patch = IdentityPatch {
    name: args.name,
    profile,
    avatar: args.avatar,
    bio: args.bio,
    department: args.department,
    ..Default::default()
  };
  if patch.is_empty() {
    bail!("nothing to update");
  }
  session.identities.update_current(patch).await?;

  Ok(serde_json::to_value(session.identities.current())?)
}

async fn post<S: KeyValueStore + Clone>(
  session: &mut Session<S>,
  cmd: PostCommand,
) -> Result<Value> {
  match cmd {
    PostCommand::Add { title, body, category } => {
      let me = session.me()?;
      let post = session
        .content
        .add_post(NewPost::new(&me, title, body, category.into()))
        .await?;
      Ok(serde_json::to_value(post)?)
    }
    PostCommand::List { author, category, mine } => {
      let author = if mine { Some(session.me()?.id) } else { author };
      let posts = session
        .content
        .posts()
        .iter()
        .filter(|p| author.is_none_or(|id| p.author.id == id))
        .filter(|p| category.is_none_or(|c| p.category == Category::from(c)))
        .collect::<Vec<_>>();
      Ok(serde_json::to_value(posts)?)
    }
    PostCommand::Edit { id, title, body, category } => {
      let content = &mut session.content;
      let found = content.find_post(id).is_some();
      content
        .update_post(id, PostPatch {
          title,
          body,
          category: category.map(Category::from),
          ..Default::default()
        })
        .await?;
      Ok(json!({ "found": found, "post": content.find_post(id) }))
    }
    PostCommand::Delete { id } => {
      let found = session.content.find_post(id).is_some();
      session.content.delete_post(id).await?;
      Ok(json!({ "deleted": found, "id": id }))
    }
    PostCommand::Like { id } => {
      let post = session
        .content
        .like_post(id)
        .await?
        .context("no post with that id")?;
      Ok(serde_json::to_value(post)?)
    }
    PostCommand::Comment { id, body } => {
      let me = session.me()?;
      let comment = session
        .content
        .add_comment(id, Byline::from(&me), body)
        .await?
        .context("no post with that id")?;
      Ok(serde_json::to_value(comment)?)
    }
  }
}

async fn event<S: KeyValueStore + Clone>(
  session: &mut Session<S>,
  cmd: EventCommand,
) -> Result<Value> {
  match cmd {
    EventCommand::Add { title, description, location, date, time, image } => {
      let me = session.me()?;
      let event = session
        .content
        .add_event(NewEvent {
          title,
          description,
          organizer: Byline::from(&me),
          location,
          date,
          time,
          attendees: Vec::new(),
          image,
        })
        .await?;
      Ok(serde_json::to_value(event)?)
    }
    EventCommand::List { search, mine } => {
      let content = &session.content;
      let events = if mine {
        content.user_events(session.me()?.id)
      } else {
        content.search_events(search.as_deref().unwrap_or_default())
      };
      Ok(serde_json::to_value(events)?)
    }
    EventCommand::Edit { id, title, description, location, date, time } => {
      let content = &mut session.content;
      let found = content.find_event(id).is_some();
      content
        .update_event(id, EventPatch {
          title,
          description,
          location,
          date,
          time,
          ..Default::default()
        })
        .await?;
      Ok(json!({ "found": found, "event": content.find_event(id) }))
    }
    EventCommand::Delete { id } => {
      let found = session.content.find_event(id).is_some();
      session.content.delete_event(id).await?;
      Ok(json!({ "deleted": found, "id": id }))
    }
    EventCommand::Attend { id } => {
      let me = session.me()?;
      let event = session
        .content
        .attend_event(id, me.id)
        .await?
        .context("no event with that id")?;
      Ok(serde_json::to_value(event)?)
    }
  }
}

async fn group<S: KeyValueStore + Clone>(
  session: &mut Session<S>,
  cmd: GroupCommand,
) -> Result<Value> {
  match cmd {
    GroupCommand::Add { name, description, study } => {
      let me = session.me()?;
      let group = session
        .content
        .add_group(NewGroup {
          name,
          description,
          members: vec![me.id],
          created_by: me.id,
          avatar: None,
          is_study_group: study,
        })
        .await?;
      Ok(serde_json::to_value(group)?)
    }
    GroupCommand::List { search, mine, study, community } => {
      let me = if mine { Some(session.me()?.id) } else { None };
      let groups = session
        .content
        .search_groups(search.as_deref().unwrap_or_default())
        .into_iter()
        .filter(|g| me.is_none_or(|id| g.involves(id)))
        .filter(|g| !study || g.is_study_group)
        .filter(|g| !community || !g.is_study_group)
        .collect::<Vec<_>>();
      Ok(serde_json::to_value(groups)?)
    }
    GroupCommand::Edit { id, name, description } => {
      let content = &mut session.content;
      let found = content.find_group(id).is_some();
      content
        .update_group(id, GroupPatch { name, description, ..Default::default() })
        .await?;
      Ok(json!({ "found": found, "group": content.find_group(id) }))
    }
    GroupCommand::Delete { id } => {
      let found = session.content.find_group(id).is_some();
      session.content.delete_group(id).await?;
      Ok(json!({ "deleted": found, "id": id }))
    }
    GroupCommand::Join { id } => {
      let me = session.me()?;
      let group = session
        .content
        .join_group(id, me.id)
        .await?
        .context("no group with that id")?;
      Ok(serde_json::to_value(group)?)
    }
    GroupCommand::Leave { id } => {
      let me = session.me()?;
      let group = session
        .content
        .leave_group(id, me.id)
        .await?
        .context("no group with that id")?;
      Ok(serde_json::to_value(group)?)
    }
  }
}

async fn message<S: KeyValueStore + Clone>(
  session: &mut Session<S>,
  cmd: MessageCommand,
) -> Result<Value> {
  match cmd {
    MessageCommand::Send { group, body } => {
      let me = session.me()?;
      if session.content.find_group(group).is_none() {
        bail!("no group with that id");
      }
      let message = session
        .content
        .add_message(NewMessage {
          body,
          sender: Byline::from(&me),
          group_id: group,
          attachments: Vec::new(),
        })
        .await?;
      Ok(serde_json::to_value(message)?)
    }
    MessageCommand::List { group } => {
      // Chat reads oldest first.
      let mut messages = session.content.group_messages(group);
      messages.reverse();
      Ok(serde_json::to_value(messages)?)
    }
    MessageCommand::Delete { id } => {
      let found = session.content.messages().iter().any(|m| m.id == id);
      session.content.delete_message(id).await?;
      Ok(json!({ "deleted": found, "id": id }))
    }
  }
}

#[cfg(test)]
mod tests {
  use educollab_core::MemoryStore;

  use super::*;

  async fn session() -> Session<MemoryStore> {
    Session::open(Storage::new(MemoryStore::new()), IdentityConfig::default())
      .await
      .unwrap()
  }

  fn signup_args(email: &str) -> SignupArgs {
    SignupArgs {
      name:       "Ada".into(),
      email:      email.into(),
      password:   "p".into(),
      role:       RoleArg::Learner,
      year:       Some(3),
      subjects:   Vec::new(),
      department: None,
      bio:        None,
    }
  }

  #[tokio::test]
  async fn content_commands_require_a_session() {
    let mut s = session().await;
    let err = run(
      Command::Post(PostCommand::Add {
        title:    "t".into(),
        body:     "b".into(),
        category: CategoryArg::Idea,
      }),
      &mut s,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("not logged in"));
  }

  #[tokio::test]
  async fn signup_twice_reports_duplicate() {
    let mut s = session().await;
    run(Command::Signup(signup_args("a@x.edu")), &mut s).await.unwrap();
    let err = run(Command::Signup(signup_args("a@x.edu")), &mut s).await.unwrap_err();
    assert!(err.to_string().contains("already registered"));
  }

  #[tokio::test]
  async fn posts_listed_for_current_identity() {
    let mut s = session().await;
    run(Command::Signup(signup_args("a@x.edu")), &mut s).await.unwrap();

    for title in ["one", "two"] {
      run(
        Command::Post(PostCommand::Add {
          title:    title.into(),
          body:     "b".into(),
          category: CategoryArg::Note,
        }),
        &mut s,
      )
      .await
      .unwrap();
    }

    let listed = run(
      Command::Post(PostCommand::List { author: None, category: None, mine: true }),
      &mut s,
    )
    .await
    .unwrap();
    let titles: Vec<_> = listed
      .as_array()
      .unwrap()
      .iter()
      .map(|p| p["title"].as_str().unwrap())
      .collect();
    assert_eq!(titles, ["two", "one"]);
  }

  #[tokio::test]
  async fn group_chat_reads_oldest_first() {
    let mut s = session().await;
    run(Command::Signup(signup_args("a@x.edu")), &mut s).await.unwrap();
    let group = run(
      Command::Group(GroupCommand::Add {
        name:        "Algorithms".into(),
        description: "weekly".into(),
        study:       true,
      }),
      &mut s,
    )
    .await
    .unwrap();
    let group_id: Uuid = group["id"].as_str().unwrap().parse().unwrap();

    for body in ["first", "second"] {
      run(
        Command::Message(MessageCommand::Send { group: group_id, body: body.into() }),
        &mut s,
      )
      .await
      .unwrap();
    }

    let listed = run(Command::Message(MessageCommand::List { group: group_id }), &mut s)
      .await
      .unwrap();
    assert_eq!(listed[0]["body"], "first");
    assert_eq!(listed[1]["body"], "second");
  }

  #[tokio::test]
  async fn profile_rejects_fields_for_other_roles() {
    let mut s = session().await;
    run(Command::Signup(signup_args("a@x.edu")), &mut s).await.unwrap();

    let err = run(
      Command::Profile(ProfileArgs {
        name:       None,
        bio:        None,
        department: None,
        avatar:     None,
        year:       None,
        subjects:   vec!["Math".into()],
      }),
      &mut s,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("--subject"));
  }

  #[tokio::test]
  async fn signup_rejects_fields_for_other_roles() {
    let mut s = session().await;

    let learner = SignupArgs { subjects: vec!["Math".into()], ..signup_args("a@x.edu") };
    let err = run(Command::Signup(learner), &mut s).await.unwrap_err();
    assert!(err.to_string().contains("--subject"));

    let instructor = SignupArgs { role: RoleArg::Instructor, ..signup_args("b@x.edu") };
    let err = run(Command::Signup(instructor), &mut s).await.unwrap_err();
    assert!(err.to_string().contains("--year"));

    assert!(!s.identities.is_authenticated());
    assert!(s.identities.registry().await.unwrap().is_empty());
  }
}
