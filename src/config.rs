//! Configuration loading.
//!
//! Deserialized from a TOML document into [`Config`]. Every section except
//! `[media]` carries defaults so a minimal file only needs to name its media
//! folder groups.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::VdkError;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP bind address and related server knobs.
    #[serde(default)]
    pub server: ServerConfig,
    /// Where source files live and where indexes are written.
    pub media: MediaConfig,
    /// HLS playlist/segment generation knobs.
    #[serde(default)]
    pub hls: HlsConfig,
    /// Structured logging knobs.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address `axum` binds to, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

/// A named group of media, mapping a logical group name to a local root
/// directory. Mirrors the grouped media tree layout, so operators can mount
/// several disks under one URI namespace.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFolder {
    /// Logical group name as it appears in request URIs (first path segment).
    pub group_name: String,
    /// Local filesystem root this group resolves to.
    pub local_path: PathBuf,
}

/// Where sources live and where index sidecars are written.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Root directory under which `.tsidx` sidecars are stored, mirrored by
    /// group name the same way `folders` mirrors source groups.
    pub index_root: PathBuf,
    /// Source media folder groups.
    #[serde(default)]
    pub folders: Vec<MediaFolder>,
}

/// HLS-specific knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct HlsConfig {
    /// Target duration, in seconds, the segmenter aims for per segment.
    #[serde(default = "default_target_duration")]
    pub target_duration_secs: u32,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            target_duration_secs: default_target_duration(),
        }
    }
}

fn default_target_duration() -> u32 {
    10
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `vdkio=info`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Loads and parses a TOML configuration file from `path`.
    pub fn load(path: &Path) -> Result<Self, VdkError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VdkError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| VdkError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), VdkError> {
        if self.media.folders.is_empty() {
            return Err(VdkError::Config("media.folders must not be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for folder in &self.media.folders {
            if !seen.insert(folder.group_name.as_str()) {
                return Err(VdkError::Config(format!(
                    "duplicate media group name: {}",
                    folder.group_name
                )));
            }
        }
        Ok(())
    }

    /// Builds a lookup table from group name to local root.
    pub fn folder_map(&self) -> HashMap<String, PathBuf> {
        self.media
            .folders
            .iter()
            .map(|f| (f.group_name.clone(), f.local_path.clone()))
            .collect()
    }

    /// Resolves a group + relative path to a local source `.ts` file path.
    pub fn resolve_source(&self, group: &str, rel_path: &str) -> Result<PathBuf, VdkError> {
        let root = self
            .media
            .folders
            .iter()
            .find(|f| f.group_name == group)
            .ok_or_else(|| VdkError::GetStreamFailed(format!("unknown media group: {group}")))?;
        Ok(root.local_path.join(rel_path))
    }

    /// Resolves a group + relative path to the local `.tsidx` sidecar path.
    pub fn resolve_index(&self, group: &str, rel_path: &str) -> PathBuf {
        self.media.index_root.join(group).join(rel_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let toml = r#"
            [media]
            index_root = "/var/lib/vdkio/index"

            [[media.folders]]
            group_name = "movies"
            local_path = "/srv/movies"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.hls.target_duration_secs, 10);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.media.folders.len(), 1);
    }

    #[test]
    fn rejects_empty_folders() {
        let toml = r#"
            [media]
            index_root = "/var/lib/vdkio/index"
            folders = []
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_group_names() {
        let toml = r#"
            [media]
            index_root = "/idx"

            [[media.folders]]
            group_name = "movies"
            local_path = "/srv/movies"

            [[media.folders]]
            group_name = "movies"
            local_path = "/srv/movies2"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate media group name"));
    }

    fn write_temp_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_reads_and_validates_a_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp_config(
            &dir,
            r#"
                [media]
                index_root = "/var/lib/vdkio/index"

                [[media.folders]]
                group_name = "movies"
                local_path = "/srv/movies"
            "#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.media.folders.len(), 1);
        assert_eq!(config.hls.target_duration_secs, 10);
    }

    #[test]
    fn load_rejects_missing_required_key() {
        let dir = tempfile::tempdir().unwrap();
        // `media.index_root` is required and absent.
        let path = write_temp_config(
            &dir,
            r#"
                [media]

                [[media.folders]]
                group_name = "movies"
                local_path = "/srv/movies"
            "#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, VdkError::Config(_)));
    }

    #[test]
    fn load_rejects_duplicate_group_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp_config(
            &dir,
            r#"
                [media]
                index_root = "/idx"

                [[media.folders]]
                group_name = "movies"
                local_path = "/srv/movies"

                [[media.folders]]
                group_name = "movies"
                local_path = "/srv/movies2"
            "#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate media group name"));
    }

    #[test]
    fn load_rejects_unreadable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, VdkError::Config(_)));
    }

    #[test]
    fn resolves_source_and_index_paths() {
        let toml = r#"
            [media]
            index_root = "/idx"

            [[media.folders]]
            group_name = "movies"
            local_path = "/srv/movies"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.resolve_source("movies", "a/b.ts").unwrap(),
            PathBuf::from("/srv/movies/a/b.ts")
        );
        assert_eq!(
            config.resolve_index("movies", "a/b.tsidx"),
            PathBuf::from("/idx/movies/a/b.tsidx")
        );
        assert!(config.resolve_source("missing", "a.ts").is_err());
    }
}
