/*!
Helpers pour préparer un répertoire de générateurs

Permet d'écrire des fichiers générateurs (valides ou non) dans un dossier
temporaire et de contrôler leur date de modification, qui décide de la
classification added / updated / unchanged.
*/

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

/// Dossier temporaire de générateurs, supprimé au drop
pub struct GeneratorDir {
    dir: TempDir,
}

impl GeneratorDir {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("Failed to create generators dir")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Écrit `<name>.json` contenant `{"name": name, ...fields}`
    pub fn write_generator(&self, name: &str, fields: Value) -> Result<PathBuf> {
        let mut object = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => anyhow::bail!("Generator fields must be an object, got {}", other),
        };
        object.insert("name".to_string(), Value::String(name.to_string()));

        self.write_json(&format!("{name}.json"), &Value::Object(object))
    }

    /// Écrit n'importe quel document JSON
    pub fn write_json(&self, file: &str, value: &Value) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(value)?;
        self.write_raw(file, &content)
    }

    /// Écrit un contenu brut (pour simuler des fichiers corrompus)
    pub fn write_raw(&self, file: &str, content: &str) -> Result<PathBuf> {
        let path = self.path().join(file);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("wrote generator file {}", path.display());
        Ok(path)
    }

    /// Fixe la date de modification d'un fichier
    pub fn set_modified(&self, file: &str, when: DateTime<Utc>) -> Result<()> {
        let path = self.path().join(file);
        let handle = File::options()
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        handle
            .set_modified(SystemTime::from(when))
            .with_context(|| format!("Failed to set mtime of {}", path.display()))?;
        Ok(())
    }

    /// Écrit un générateur puis fixe sa date de modification
    pub fn write_generator_at(
        &self,
        name: &str,
        fields: Value,
        when: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let path = self.write_generator(name, fields)?;
        self.set_modified(&format!("{name}.json"), when)?;
        Ok(path)
    }

    pub fn remove(&self, file: &str) -> Result<()> {
        let path = self.path().join(file);
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove {}", path.display()))
    }
}
