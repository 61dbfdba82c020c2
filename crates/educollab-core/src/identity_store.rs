//! [`IdentityStore`] — the authenticated session and the identity registry.

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Result,
  content::toggle_member,
  credential::CredentialScheme,
  identity::{
    Identity, IdentityPatch, NewIdentity, RegistryEntry, Role, default_avatar,
    default_bio,
  },
  storage::{KeyValueStore, Storage, StorageKey},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Behavioural knobs for an [`IdentityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IdentityConfig {
  #[serde(default)]
  pub credential_scheme:       CredentialScheme,
  /// When set, a login that matches no registry record creates and adopts a
  /// new identity instead of being rejected.
  #[serde(default = "default_true")]
  pub create_on_unknown_login: bool,
}

impl Default for IdentityConfig {
  fn default() -> Self {
    Self {
      credential_scheme:       CredentialScheme::default(),
      create_on_unknown_login: true,
    }
  }
}

fn default_true() -> bool { true }

// ─── Store ───────────────────────────────────────────────────────────────────

/// Owns the current session identity and the durable registry of all
/// identities with their secrets.
///
/// The session identity is persisted separately from the registry and is
/// trusted on [`IdentityStore::restore`] without re-checking credentials.
#[derive(Debug)]
pub struct IdentityStore<S> {
  storage: Storage<S>,
  config:  IdentityConfig,
  current: Option<Identity>,
}

impl<S: KeyValueStore> IdentityStore<S> {
  /// Build a store, adopting any previously saved session identity.
  pub async fn restore(storage: Storage<S>, config: IdentityConfig) -> Result<Self> {
    let current: Option<Identity> = storage.load(StorageKey::CurrentIdentity).await?;
    if let Some(identity) = &current {
      tracing::info!(id = %identity.id, email = %identity.email, "restored session");
    }
    Ok(Self { storage, config, current })
  }

  pub fn current(&self) -> Option<&Identity> { self.current.as_ref() }

  pub fn is_authenticated(&self) -> bool { self.current.is_some() }

  /// Log in as `email`.
  ///
  /// A registry record whose email and secret both match is adopted as the
  /// session identity. Otherwise, when `create_on_unknown_login` is set (the
  /// default), a new identity is synthesized from `email` and `role_hint`
  /// (learner if absent) and adopted, so this returns `Ok(true)` for any
  /// input. The synthesized identity joins the registry unless the email is
  /// already registered under a different secret.
  pub async fn authenticate(
    &mut self,
    email: &str,
    secret: &str,
    role_hint: Option<Role>,
  ) -> Result<bool> {
    let scheme = self.config.credential_scheme;
    let mut registry = self.load_registry().await?;

    let matched = registry
      .iter()
      .find(|entry| entry.identity.email == email && scheme.verify(&entry.secret, secret))
      .map(|entry| entry.identity.clone());

    if let Some(identity) = matched {
      tracing::info!(id = %identity.id, "authenticated");
      self.adopt(identity).await?;
      return Ok(true);
    }

    if !self.config.create_on_unknown_login {
      tracing::warn!(email, "login rejected: no matching credentials");
      return Ok(false);
    }

    let identity = synthesize(email, role_hint.unwrap_or(Role::Learner));

    if registry.iter().any(|entry| entry.identity.email == email) {
      tracing::debug!(email, "email registered under another secret; identity kept session-only");
    } else {
      registry.push(RegistryEntry {
        identity: identity.clone(),
        secret:   scheme.seal(secret)?,
      });
      self.storage.save(StorageKey::IdentityRegistry, &registry).await?;
    }

    tracing::info!(id = %identity.id, role = %identity.role(), "created identity on login");
    self.adopt(identity).await?;
    Ok(true)
  }

  /// Sign up a new identity and adopt it as the session identity.
  ///
  /// Returns `Ok(false)` without touching storage if the email is already in
  /// the registry.
  pub async fn register(&mut self, input: NewIdentity) -> Result<bool> {
    let mut registry = self.load_registry().await?;

    if registry.iter().any(|entry| entry.identity.email == input.email) {
      tracing::debug!(email = %input.email, "registration refused: email taken");
      return Ok(false);
    }

    let role   = input.profile.role();
    let avatar = input.avatar.unwrap_or_else(|| default_avatar(&input.email));
    let bio    = input.bio.unwrap_or_else(|| default_bio(role));

    let identity = Identity {
      id:         Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      profile:    input.profile,
      avatar:     Some(avatar),
      bio:        Some(bio),
      department: input.department,
      followers:  Vec::new(),
      following:  Vec::new(),
    };

    registry.push(RegistryEntry {
      identity: identity.clone(),
      secret:   self.config.credential_scheme.seal(&input.secret)?,
    });
    self.storage.save(StorageKey::IdentityRegistry, &registry).await?;

    tracing::info!(id = %identity.id, %role, "registered identity");
    self.adopt(identity).await?;
    Ok(true)
  }

  /// End the session. The registry is left untouched.
  pub async fn deauthenticate(&mut self) -> Result<()> {
    self.storage.clear(StorageKey::CurrentIdentity).await?;
    if let Some(identity) = self.current.take() {
      tracing::info!(id = %identity.id, "logged out");
    }
    Ok(())
  }

  /// Merge `patch` into the session identity and its registry record.
  /// Does nothing when no identity is current.
  pub async fn update_current(&mut self, patch: IdentityPatch) -> Result<()> {
    let Some(current) = self.current.as_ref() else {
      tracing::debug!("profile update ignored: no current identity");
      return Ok(());
    };

    let mut next = current.clone();
    patch.apply_to(&mut next);
    let id = next.id;
    self.storage.save(StorageKey::CurrentIdentity, &next).await?;
    self.current = Some(next);

    let mut registry = self.load_registry().await?;
    if let Some(entry) = registry.iter_mut().find(|entry| entry.identity.id == id) {
      patch.apply_to(&mut entry.identity);
      self.storage.save(StorageKey::IdentityRegistry, &registry).await?;
    }

    tracing::debug!(%id, "updated profile");
    Ok(())
  }

  /// All registered identities, secrets stripped, in registration order.
  pub async fn registry(&self) -> Result<Vec<Identity>> {
    Ok(
      self
        .load_registry()
        .await?
        .into_iter()
        .map(|entry| entry.identity)
        .collect(),
    )
  }

  /// Look up a registered identity by id.
  pub async fn find(&self, id: Uuid) -> Result<Option<Identity>> {
    Ok(
      self
        .load_registry()
        .await?
        .into_iter()
        .find(|entry| entry.identity.id == id)
        .map(|entry| entry.identity),
    )
  }

  /// Follow `target`. Returns `Ok(false)` when nobody is logged in, the
  /// target is the current identity, or the target is not registered.
  pub async fn follow(&mut self, target: Uuid) -> Result<bool> {
    self.set_following(target, true).await
  }

  /// Stop following `target`. Same `Ok(false)` cases as [`Self::follow`].
  pub async fn unfollow(&mut self, target: Uuid) -> Result<bool> {
    self.set_following(target, false).await
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  async fn set_following(&mut self, target: Uuid, follow: bool) -> Result<bool> {
    let Some(me) = self.current.as_ref() else {
      return Ok(false);
    };
    if me.id == target {
      return Ok(false);
    }
    let me_id         = me.id;
    let mut following = me.following.clone();

    let mut registry = self.load_registry().await?;
    let Some(entry) = registry.iter_mut().find(|entry| entry.identity.id == target) else {
      tracing::debug!(%target, "follow target not registered");
      return Ok(false);
    };

    toggle_member(&mut entry.identity.followers, me_id, follow);
    self.storage.save(StorageKey::IdentityRegistry, &registry).await?;

    toggle_member(&mut following, target, follow);
    self
      .update_current(IdentityPatch { following: Some(following), ..Default::default() })
      .await?;

    tracing::debug!(%me_id, %target, follow, "updated follow edge");
    Ok(true)
  }

  async fn adopt(&mut self, identity: Identity) -> Result<()> {
    self.storage.save(StorageKey::CurrentIdentity, &identity).await?;
    self.current = Some(identity);
    Ok(())
  }

  async fn load_registry(&self) -> Result<Vec<RegistryEntry>> {
    self.storage.load_or_default(StorageKey::IdentityRegistry).await
  }
}

/// Build the identity a permissive login creates for an unknown email.
fn synthesize(email: &str, role: Role) -> Identity {
  let name = email.split('@').next().unwrap_or(email).to_owned();
  let department = (role == Role::Instructor).then(|| "Computer Science".to_owned());

  Identity {
    id: Uuid::new_v4(),
    name,
    email: email.to_owned(),
    profile: role.starter_profile(),
    avatar: Some(default_avatar(email)),
    bio: Some(default_bio(role)),
    department,
    followers: Vec::new(),
    following: Vec::new(),
  }
}
