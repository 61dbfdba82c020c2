//! Identity types — who is using the application.
//!
//! An identity carries only the fields that make sense for its role: the
//! role-specific data lives in [`RoleProfile`], which is flattened into the
//! stored record under a `"role"` tag.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Avatar service used for identities that never set their own picture.
pub const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg?seed=";

// ─── Role ────────────────────────────────────────────────────────────────────

/// The closed set of community roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Learner,
  Instructor,
  Organization,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Learner => "learner",
      Self::Instructor => "instructor",
      Self::Organization => "organization",
    }
  }

  /// The profile a freshly synthesized identity of this role starts with.
  pub fn starter_profile(self) -> RoleProfile {
    match self {
      Self::Learner => RoleProfile::Learner { year_of_study: Some(2) },
      Self::Instructor => RoleProfile::Instructor {
        subjects: vec!["Computer Science".into(), "Web Development".into()],
      },
      Self::Organization => RoleProfile::Organization,
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Role plus the fields that only exist for that role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleProfile {
  Learner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    year_of_study: Option<u8>,
  },
  Instructor {
    #[serde(default)]
    subjects: Vec<String>,
  },
  Organization,
}

impl RoleProfile {
  pub fn role(&self) -> Role {
    match self {
      Self::Learner { .. } => Role::Learner,
      Self::Instructor { .. } => Role::Instructor,
      Self::Organization => Role::Organization,
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// A community member as held in the session. Never carries a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:         Uuid,
  pub name:       String,
  /// Unique within the registry; the login key.
  pub email:      String,
  #[serde(flatten)]
  pub profile:    RoleProfile,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bio:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub department: Option<String>,
  #[serde(default)]
  pub followers:  Vec<Uuid>,
  #[serde(default)]
  pub following:  Vec<Uuid>,
}

impl Identity {
  pub fn role(&self) -> Role { self.profile.role() }
}

/// The text every new identity gets when it does not supply a biography.
pub fn default_bio(role: Role) -> String {
  format!("Welcome to EduCollab! I'm a {role} passionate about learning and collaboration.")
}

pub fn default_avatar(email: &str) -> String {
  format!("{AVATAR_BASE_URL}{email}")
}

// ─── Registry record ─────────────────────────────────────────────────────────

/// An identity as stored in the registry: the identity plus its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
  #[serde(flatten)]
  pub identity: Identity,
  /// Stored according to the configured
  /// [`CredentialScheme`](crate::credential::CredentialScheme).
  pub secret:   String,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::IdentityStore::register`].
/// `id`, follower lists and defaults are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub name:       String,
  pub email:      String,
  pub secret:     String,
  pub profile:    RoleProfile,
  pub avatar:     Option<String>,
  pub bio:        Option<String>,
  pub department: Option<String>,
}

impl NewIdentity {
  /// Convenience constructor with all optional fields left unset.
  pub fn new(
    name: impl Into<String>,
    email: impl Into<String>,
    secret: impl Into<String>,
    profile: RoleProfile,
  ) -> Self {
    Self {
      name: name.into(),
      email: email.into(),
      secret: secret.into(),
      profile,
      avatar: None,
      bio: None,
      department: None,
    }
  }
}

/// A partial update to an identity. `None` leaves a field untouched.
///
/// The id and the email (the registry's login key) are not patchable.
#[derive(Debug, Clone, Default)]
pub struct IdentityPatch {
  pub name:       Option<String>,
  pub profile:    Option<RoleProfile>,
  pub avatar:     Option<String>,
  pub bio:        Option<String>,
  pub department: Option<String>,
  pub followers:  Option<Vec<Uuid>>,
  pub following:  Option<Vec<Uuid>>,
}

impl IdentityPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.profile.is_none()
      && self.avatar.is_none()
      && self.bio.is_none()
      && self.department.is_none()
      && self.followers.is_none()
      && self.following.is_none()
  }

  /// Merge the set fields into `identity`.
  pub fn apply_to(&self, identity: &mut Identity) {
    if let Some(name) = &self.name {
      identity.name = name.clone();
    }
    if let Some(profile) = &self.profile {
      identity.profile = profile.clone();
    }
    if let Some(avatar) = &self.avatar {
      identity.avatar = Some(avatar.clone());
    }
    if let Some(bio) = &self.bio {
      identity.bio = Some(bio.clone());
    }
    if let Some(department) = &self.department {
      identity.department = Some(department.clone());
    }
    if let Some(followers) = &self.followers {
      identity.followers = followers.clone();
    }
    if let Some(following) = &self.following {
      identity.following = following.clone();
    }
  }
}
