//! Durable project store.
//!
//! One pretty-printed JSON document per project at `<data_dir>/<name>.json`.
//!
//! # Write protocol
//!
//! ```text
//! lock <name>.lock ─► load ─► mutate in memory ─► copy .json → .json.backup
//!                                                  write .json.tmp + fsync
//!                                                  rename .json.tmp → .json
//! ```
//!
//! Readers never lock: the rename is atomic, so a concurrent reader sees the
//! old record or the new one, never a torn write.

pub mod lock;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use lock::ProjectLock;

use crate::config::EngineConfig;
use crate::error::{CoordError, CoordResult};
use crate::project::{Project, SCHEMA_VERSION};

const RECORD_EXT: &str = "json";

/// File-backed store of project records.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    config: EngineConfig,
}

impl ProjectStore {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Project names double as file stems: `[A-Za-z0-9._-]`, no leading dot.
    pub fn validate_name(name: &str) -> CoordResult<()> {
        if name.is_empty() {
            return Err(CoordError::validation("project name must not be empty"));
        }
        if name.starts_with('.') {
            return Err(CoordError::validation(format!(
                "project name '{}' must not start with '.'",
                name
            )));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(CoordError::validation(format!(
                "project name '{}' contains '{}' (allowed: letters, digits, '.', '_', '-')",
                name, bad
            )));
        }
        Ok(())
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir().join(format!("{}.{}", name, RECORD_EXT))
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.data_dir().join(format!("{}.lock", name))
    }

    pub fn exists(&self, name: &str) -> bool {
        Self::validate_name(name).is_ok() && self.path_for(name).is_file()
    }

    /// Read a record. A record that fails to parse is reported as corrupt.
    pub fn load(&self, name: &str) -> CoordResult<Project> {
        Self::validate_name(name)?;
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(CoordError::project_not_found(name));
        }

        let content = std::fs::read_to_string(&path)?;
        let project: Project =
            serde_json::from_str(&content).map_err(|e| CoordError::corrupt(&path, e.to_string()))?;

        if project.name != name {
            return Err(CoordError::corrupt(
                &path,
                format!("record names project '{}'", project.name),
            ));
        }
        if project.schema_version > SCHEMA_VERSION {
            warn!(
                project = name,
                found = project.schema_version,
                supported = SCHEMA_VERSION,
                "project record written by a newer schema; unknown fields are ignored"
            );
        }

        debug!(project = name, path = %path.display(), bytes = content.len(), "loaded project");
        Ok(project)
    }

    /// Write a record all-or-nothing.
    pub fn save(&self, project: &Project) -> CoordResult<()> {
        Self::validate_name(&project.name)?;
        std::fs::create_dir_all(self.data_dir())?;

        let path = self.path_for(&project.name);
        let temp_path = path.with_extension("json.tmp");

        if self.config.keep_backups && path.exists() {
            let backup_path = path.with_extension("json.backup");
            if let Err(e) = std::fs::copy(&path, &backup_path) {
                warn!(project = %project.name, error = %e, "failed to create backup");
            }
        }

        let content = serde_json::to_string_pretty(project)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }

        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(project = %project.name, path = %path.display(), bytes = content.len(), "saved project");
        Ok(())
    }

    /// Project names in lexicographic order.
    pub fn list(&self) -> CoordResult<Vec<String>> {
        let entries = match std::fs::read_dir(self.data_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if Self::validate_name(stem).is_ok() && path.is_file() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Take the exclusive per-project lock.
    pub fn lock(&self, name: &str) -> CoordResult<ProjectLock> {
        Self::validate_name(name)?;
        ProjectLock::acquire(
            name,
            &self.lock_path(name),
            self.config.lock_timeout,
            self.config.lock_poll_interval,
        )
    }

    /// Lock, load, apply `f`, save. Nothing is written when `f` fails.
    pub fn update<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Project) -> CoordResult<T>,
    ) -> CoordResult<T> {
        let _lock = self.lock(name)?;
        let mut project = self.load(name)?;
        let out = f(&mut project)?;
        self.save(&project)?;
        Ok(out)
    }

    /// Persist a new project, replacing an existing one only with `force`.
    pub fn create(&self, project: &Project, force: bool) -> CoordResult<()> {
        let _lock = self.lock(&project.name)?;
        if !force && self.path_for(&project.name).is_file() {
            return Err(CoordError::ProjectExists {
                project: project.name.clone(),
            });
        }
        self.save(project)
    }

    /// Remove a record and its backup.
    pub fn delete(&self, name: &str) -> CoordResult<()> {
        let _lock = self.lock(name)?;
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(CoordError::project_not_found(name));
        }
        std::fs::remove_file(&path)?;

        let backup_path = path.with_extension("json.backup");
        if backup_path.exists() {
            if let Err(e) = std::fs::remove_file(&backup_path) {
                warn!(project = name, error = %e, "failed to remove backup");
            }
        }
        debug!(project = name, "deleted project");
        Ok(())
    }
}
