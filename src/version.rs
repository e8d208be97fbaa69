//! Client identity sent in the upgrade request's `User-Agent`.

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Default client name in the `User-Agent`.
pub const DEFAULT_CLIENT_NAME: &str = "simlink";

/// Version and build identifier of the running client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub build_id: String,
}

/// Source of [`BuildInfo`], read once per connection attempt so that a build
/// updated during a retry loop shows up in the next handshake.
pub trait BuildInfoSource: Send + Sync {
    fn build_info(&self) -> BuildInfo;
}

impl<F> BuildInfoSource for F
where
    F: Fn() -> BuildInfo + Send + Sync,
{
    fn build_info(&self) -> BuildInfo {
        self()
    }
}

/// Build info compiled into this crate. The build id comes from the
/// `SIMLINK_BUILD_ID` environment variable at compile time.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackageBuildInfo;

impl BuildInfoSource for PackageBuildInfo {
    fn build_info(&self) -> BuildInfo {
        BuildInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_id: option_env!("SIMLINK_BUILD_ID")
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

#[derive(Deserialize)]
struct VersionJson {
    version: String,
    sha: String,
}

/// Reads `{"version": ..., "sha": ...}` from a file on every call, as written
/// next to the binary by the release build. Falls back to [`PackageBuildInfo`].
#[derive(Clone, Debug)]
pub struct VersionFile {
    path: PathBuf,
}

impl VersionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<BuildInfo> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let parsed: VersionJson = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(BuildInfo {
            version: parsed.version,
            build_id: parsed.sha,
        })
    }
}

impl BuildInfoSource for VersionFile {
    fn build_info(&self) -> BuildInfo {
        self.load().unwrap_or_else(|e| {
            tracing::debug!(error = %format!("{e:#}"), "version file unavailable");
            PackageBuildInfo.build_info()
        })
    }
}

/// Name plus build metadata of the connecting client.
#[derive(Clone)]
pub struct ClientIdentity {
    name: String,
    source: Arc<dyn BuildInfoSource>,
}

impl ClientIdentity {
    pub fn new(name: impl Into<String>, source: impl BuildInfoSource + 'static) -> Self {
        Self {
            name: name.into(),
            source: Arc::new(source),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>/<version> (<build id>)`, reading the build info now.
    pub fn user_agent(&self) -> String {
        let info = self.source.build_info();
        format!("{}/{} ({})", self.name, info.version, info.build_id)
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_NAME, PackageBuildInfo)
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn user_agent_format() {
        let identity = ClientIdentity::new("sim-cli", || BuildInfo {
            version: "1.2.3".into(),
            build_id: "abc123".into(),
        });
        assert_eq!(identity.user_agent(), "sim-cli/1.2.3 (abc123)");
    }

    #[test]
    fn source_is_read_on_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let identity = ClientIdentity::new("c", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            BuildInfo {
                version: format!("0.{n}"),
                build_id: "x".into(),
            }
        });
        assert_eq!(identity.user_agent(), "c/0.0 (x)");
        assert_eq!(identity.user_agent(), "c/0.1 (x)");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn package_build_info_uses_crate_version() {
        assert_eq!(
            PackageBuildInfo.build_info().version,
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn version_file_is_reread() {
        let path = std::env::temp_dir().join(format!("simlink-version-{}.json", std::process::id()));
        let source = VersionFile::new(&path);

        std::fs::write(&path, r#"{"version":"1.0.0","sha":"aaaa"}"#).unwrap();
        assert_eq!(source.build_info().build_id, "aaaa");

        std::fs::write(&path, r#"{"version":"1.0.1","sha":"bbbb"}"#).unwrap();
        let info = source.build_info();
        assert_eq!(info.version, "1.0.1");
        assert_eq!(info.build_id, "bbbb");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_version_file_falls_back() {
        let source = VersionFile::new("/nonexistent/simlink/version.json");
        assert!(source.load().is_err());
        assert_eq!(source.build_info(), PackageBuildInfo.build_info());
    }
}
