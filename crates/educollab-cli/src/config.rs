//! Runtime configuration, layered from an optional TOML file and
//! `EDUCOLLAB_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use educollab_core::{IdentityConfig, storage::DEFAULT_NAMESPACE};
use serde::Deserialize;

/// Shape of `educollab.toml`.
#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
  /// SQLite file holding every durable key. A leading `~/` is expanded.
  pub store_path: PathBuf,
  /// Prefix for every durable key.
  pub namespace:  String,
  /// `credential_scheme` and `create_on_unknown_login`, at the top level.
  #[serde(flatten)]
  pub identity:   IdentityConfig,
}

impl AppConfig {
  /// Read `path` (if it exists), then let the environment override it.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("store_path", "educollab.db")?
      .set_default("namespace", DEFAULT_NAMESPACE)?
      .add_source(config::File::from(path.to_path_buf()).required(false))
      // Flattened fields are buffered before they reach their types, so env
      // values must already be typed (`false`, not `"false"`).
      .add_source(config::Environment::with_prefix("EDUCOLLAB").try_parsing(true))
      .build()
      .context("failed to read config file")?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use educollab_core::credential::CredentialScheme;

  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = AppConfig::load(Path::new("/nonexistent/educollab.toml")).unwrap();
    assert_eq!(cfg.namespace, "educollab");
    assert_eq!(cfg.identity, IdentityConfig::default());
    assert_eq!(cfg.identity.credential_scheme, CredentialScheme::Plain);
    assert!(cfg.identity.create_on_unknown_login);
  }

  #[test]
  fn identity_settings_are_read_from_the_top_level() {
    let path = std::env::temp_dir().join(format!("educollab-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
      &path,
      "namespace = \"demo\"\ncredential_scheme = \"argon2\"\ncreate_on_unknown_login = false\n",
    )
    .unwrap();

    let cfg = AppConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.namespace, "demo");
    assert_eq!(cfg.identity, IdentityConfig {
      credential_scheme:       CredentialScheme::Argon2,
      create_on_unknown_login: false,
    });
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    assert_eq!(expand_tilde(Path::new("/tmp/a~/b")), PathBuf::from("/tmp/a~/b"));
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    }
  }
}
