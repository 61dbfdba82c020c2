//! How registry secrets are stored and compared.

use argon2::{
  Argon2,
  password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Storage format for secrets in the identity registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScheme {
  /// Stored verbatim and compared with exact, case-sensitive equality.
  #[default]
  Plain,
  /// Stored as an argon2 PHC string, e.g. `$argon2id$v=19$…`
  Argon2,
}

impl CredentialScheme {
  /// Turn a supplied secret into the form written to the registry.
  pub fn seal(self, secret: &str) -> Result<String> {
    match self {
      Self::Plain => Ok(secret.to_owned()),
      Self::Argon2 => {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
          .hash_password(secret.as_bytes(), &salt)
          .map(|hash| hash.to_string())
          .map_err(|e| Error::Credential(format!("argon2 error: {e}")))
      }
    }
  }

  /// Check `supplied` against a `stored` registry secret.
  ///
  /// Under [`CredentialScheme::Argon2`] a stored value that is not a PHC
  /// string never matches.
  pub fn verify(self, stored: &str, supplied: &str) -> bool {
    match self {
      Self::Plain => stored == supplied,
      Self::Argon2 => match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
          .verify_password(supplied.as_bytes(), &parsed)
          .is_ok(),
        Err(_) => false,
      },
    }
  }
}
