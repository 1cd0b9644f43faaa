use crate::Schedule;
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use rpmrepo_compress::Compression;
use rpmrepo_metadata::NamingPolicy;
use rpmrepo_rpm::Digest;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

const ENV_PREFIX: &str = "RPMREPO_";

/// When a repository's metadata is regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// After every upload.
    #[default]
    Upload,
    /// Periodically, by rescanning the whole repository. Uploads are only
    /// stored.
    Cron(Schedule),
}

/// What a batch does when another batch holds the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Queue until the running batch finishes.
    #[default]
    Wait,
    /// Fail immediately with "update in progress".
    Fail,
}

impl FromStr for ConflictPolicy {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wait" | "queue" => Ok(Self::Wait),
            "fail" | "fail-fast" => Ok(Self::Fail),
            _ => Err(()),
        }
    }
}

/// Resolved, validated settings of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Algorithm for package checksums and `repomd.xml`.
    pub digest: Digest,
    pub naming: NamingPolicy,
    /// Whether `filelists.xml` is generated.
    pub filelists: bool,
    pub mode: UpdateMode,
    pub on_conflict: ConflictPolicy,
    /// Compression of the generated metadata files.
    pub compression: Compression,
    /// Upper bound on every single storage operation.
    pub storage_timeout: Duration,
    /// Store RPMs under a content-derived name and publish that location.
    pub content_addressed_packages: bool,
    /// Newest changelog entries kept per package.
    pub changelog_limit: usize,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            digest: Digest::Sha256,
            naming: NamingPolicy::HashPrefixed(Digest::Sha256),
            filelists: true,
            mode: UpdateMode::Upload,
            on_conflict: ConflictPolicy::Wait,
            compression: Compression::Gzip,
            storage_timeout: Duration::from_secs(30),
            content_addressed_packages: false,
            changelog_limit: 10,
        }
    }
}

/// The settings as they are written down, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct Settings {
    digest: String,
    naming_policy: String,
    filelists: bool,
    update: Update,
    on_conflict: String,
    compression: String,
    /// Seconds
    storage_timeout: u64,
    content_addressed_packages: bool,
    changelog_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Update {
    on: Trigger,
}

/// `on: upload` or `on: { cron: "<expression>" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Trigger {
    Cron { cron: String },
    Event(String),
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = RepoConfig::default();
        Self {
            digest: defaults.digest.to_string(),
            naming_policy: defaults.naming.to_string(),
            filelists: defaults.filelists,
            update: Update::default(),
            on_conflict: "wait".to_string(),
            compression: defaults.compression.as_str().to_string(),
            storage_timeout: defaults.storage_timeout.as_secs(),
            content_addressed_packages: defaults.content_addressed_packages,
            changelog_limit: defaults.changelog_limit,
        }
    }
}

impl Default for Update {
    fn default() -> Self {
        Self {
            on: Trigger::Event("upload".to_string()),
        }
    }
}

impl RepoConfig {
    /// Built-in defaults only.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    /// Defaults, then the settings file at `path` (if given), then the
    /// environment.
    #[instrument(skip(path), fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Self::figment();
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "loading repository settings");
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => figment.merge(Yaml::file_exact(path)),
            };
        }
        Self::from_figment(figment.merge(Self::environment()))
    }

    /// Defaults overlaid with a YAML document, such as the settings block of
    /// a repository definition.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_figment(Self::figment().merge(Yaml::string(yaml)))
    }

    /// Extract and validate settings from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract().or_raise(|| ErrorKind::Load)?;
        Self::try_from(settings)
    }

    /// `RPMREPO_` variables, with `__` nesting and `_` standing for `-`.
    fn environment() -> Env {
        Env::prefixed(ENV_PREFIX).split("__").map(|key| key.as_str().replace('_', "-").into())
    }

    /// Where the CLI looks for settings when none are given.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rpmrepo").map(|dirs| dirs.config_dir().join("config.yaml"))
    }
}

impl TryFrom<Settings> for RepoConfig {
    type Error = crate::error::Error;

    fn try_from(settings: Settings) -> Result<Self> {
        let mode = match settings.update.on {
            Trigger::Event(event) if event.trim().eq_ignore_ascii_case("upload") => UpdateMode::Upload,
            Trigger::Event(event) => exn::bail!(invalid("update.on", &event)),
            Trigger::Cron { cron } => UpdateMode::Cron(Schedule::parse(&cron)?),
        };
        let on_conflict = settings
            .on_conflict
            .parse::<ConflictPolicy>()
            .map_err(|()| invalid("on-conflict", &settings.on_conflict))?;
        if settings.storage_timeout == 0 {
            exn::bail!(invalid("storage-timeout", "0"));
        }
        Ok(Self {
            digest: settings.digest.parse::<Digest>().or_raise(|| invalid("digest", &settings.digest))?,
            naming: settings.naming_policy.parse::<NamingPolicy>().or_raise(|| invalid("naming-policy", &settings.naming_policy))?,
            filelists: settings.filelists,
            mode,
            on_conflict,
            compression: settings.compression.parse::<Compression>().or_raise(|| invalid("compression", &settings.compression))?,
            storage_timeout: Duration::from_secs(settings.storage_timeout),
            content_addressed_packages: settings.content_addressed_packages,
            changelog_limit: settings.changelog_limit,
        })
    }
}

fn invalid(key: &'static str, value: &str) -> ErrorKind {
    ErrorKind::Invalid {
        key,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = RepoConfig::from_yaml("").unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.digest, Digest::Sha256);
        assert_eq!(config.naming, NamingPolicy::HashPrefixed(Digest::Sha256));
        assert!(config.filelists);
        assert_eq!(config.mode, UpdateMode::Upload);
        assert_eq!(RepoConfig::from_figment(RepoConfig::figment()).unwrap(), config);
    }

    #[test]
    fn test_reads_settings() {
        let config = RepoConfig::from_yaml(
            "digest: sha1\nnaming-policy: sha256\nfilelists: false\nupdate:\n  on: upload\n",
        )
        .unwrap();
        assert_eq!(config.digest, Digest::Sha1);
        assert_eq!(config.naming, NamingPolicy::HashPrefixed(Digest::Sha256));
        assert!(!config.filelists);
        assert_eq!(config.mode, UpdateMode::Upload);
    }

    #[test]
    fn test_reads_cron() {
        let config = RepoConfig::from_yaml("update:\n  on:\n    cron: \"0 * * * *\"\n").unwrap();
        match config.mode {
            UpdateMode::Cron(schedule) => assert_eq!(schedule.expression(), "0 * * * *"),
            mode => panic!("unexpected {mode:?}"),
        }
    }

    #[test]
    fn test_reads_additions() {
        let config = RepoConfig::from_yaml(
            concat!(
                "on-conflict: fail\ncompression: bz2\nstorage-timeout: 5\n",
                "content-addressed-packages: true\nchangelog-limit: 3\nnaming-policy: plain\n",
            ),
        )
        .unwrap();
        assert_eq!(config.on_conflict, ConflictPolicy::Fail);
        assert_eq!(config.compression, Compression::Bzip2);
        assert_eq!(config.storage_timeout, Duration::from_secs(5));
        assert!(config.content_addressed_packages);
        assert_eq!(config.changelog_limit, 3);
        assert_eq!(config.naming, NamingPolicy::Plain);
    }

    #[rstest]
    #[case("digest: md5", "digest")]
    #[case("naming-policy: md5", "naming-policy")]
    #[case("on-conflict: retry", "on-conflict")]
    #[case("compression: rar", "compression")]
    #[case("storage-timeout: 0", "storage-timeout")]
    #[case("update:\n  on: push", "update.on")]
    #[case("update:\n  on:\n    cron: \"not a cron\"", "update.on.cron")]
    fn test_invalid_values(#[case] yaml: &str, #[case] expected: &str) {
        let err = RepoConfig::from_yaml(yaml).unwrap_err();
        match &*err {
            ErrorKind::Invalid { key, .. } => assert_eq!(*key, expected),
            kind => panic!("unexpected {kind}"),
        }
    }

    #[test]
    fn test_wrong_shape() {
        let err = RepoConfig::from_yaml("filelists: [1, 2]").unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }

    #[test]
    fn test_file_and_environment() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("repo.yaml", "digest: sha1\nfilelists: false\n")?;
            jail.set_env("RPMREPO_NAMING_POLICY", "plain");
            jail.set_env("RPMREPO_UPDATE__ON__CRON", "*/5 * * * *");
            jail.set_env("RPMREPO_FILELISTS", "true");
            let config = RepoConfig::load(Some(Path::new("repo.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.digest, Digest::Sha1);
            assert_eq!(config.naming, NamingPolicy::Plain);
            assert!(config.filelists);
            assert!(matches!(config.mode, UpdateMode::Cron(_)));
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("repo.toml", "changelog-limit = 4\n[update.on]\ncron = \"0 0 * * *\"\n")?;
            let config = RepoConfig::load(Some(Path::new("repo.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.changelog_limit, 4);
            assert!(matches!(config.mode, UpdateMode::Cron(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = RepoConfig::load(Some(Path::new("/nonexistent/rpmrepo.yaml"))).unwrap_err();
        assert_eq!(*err, ErrorKind::Load);
    }
}
