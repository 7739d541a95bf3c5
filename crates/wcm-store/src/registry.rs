//! Schema loading, caching and name inference.
//!
//! Schemas live as `<schema_dir>/<name>.yaml`. A parsed schema is cached until
//! it is invalidated, either explicitly or by the [`crate::watcher::SchemaWatcher`].

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde_yaml::Value;
use tracing::{debug, info};

use wcm_core::error::{Result, SchemaError, WcmError};
use wcm_core::schema::SchemaDefinition;

/// Substring rules mapping a collection or file name to its schema, checked
/// in order.
const INFERENCE_RULES: [(&str, &str); 10] = [
    ("employee", "employees"),
    ("vehicle", "vehicles"),
    ("tour", "tours"),
    ("point", "collection_points"),
    ("report", "reports"),
    ("notification", "notifications"),
    ("admin", "admins"),
    ("supervisor", "supervisors"),
    ("technician", "technicians"),
    ("user", "users"),
];

/// Built-in schema set, written by [`SchemaRegistry::install_defaults`].
pub const DEFAULT_SCHEMAS: [(&str, &str); 10] = [
    ("admins", include_str!("../schemas/admins.yaml")),
    ("collection_points", include_str!("../schemas/collection_points.yaml")),
    ("employees", include_str!("../schemas/employees.yaml")),
    ("notifications", include_str!("../schemas/notifications.yaml")),
    ("reports", include_str!("../schemas/reports.yaml")),
    ("supervisors", include_str!("../schemas/supervisors.yaml")),
    ("technicians", include_str!("../schemas/technicians.yaml")),
    ("tours", include_str!("../schemas/tours.yaml")),
    ("users", include_str!("../schemas/users.yaml")),
    ("vehicles", include_str!("../schemas/vehicles.yaml")),
];

/// Schema name for a collection or file name.
///
/// # Errors
///
/// Returns [`SchemaError::Uninferable`] if no rule matches.
pub fn infer_schema_name(collection: &str) -> std::result::Result<&'static str, SchemaError> {
    let lowered = collection.to_lowercase();
    INFERENCE_RULES
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, schema)| *schema)
        .ok_or_else(|| SchemaError::Uninferable(collection.to_string()))
}

#[derive(Debug)]
pub struct SchemaRegistry {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<SchemaDefinition>>>,
}

impl SchemaRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn schema_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.yaml"))
    }

    /// Parsed schema `name`, from the cache or from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotFound`] if the file is missing and
    /// [`SchemaError::ParseError`] if it is not a valid schema.
    pub fn get(&self, name: &str) -> Result<Arc<SchemaDefinition>> {
        if let Some(schema) = self.read_cache()?.get(name) {
            debug!(schema = name, "schema cache hit");
            return Ok(Arc::clone(schema));
        }

        let path = self.schema_path(name);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SchemaError::NotFound(path.display().to_string()).into())
            }
            Err(e) => return Err(e.into()),
        };
        let schema = Arc::new(SchemaDefinition::from_yaml(name, &source)?);
        debug!(schema = name, path = %path.display(), "schema loaded");

        self.write_cache()?
            .insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Check a collection document against schema `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Validation`] on a structural violation, or a
    /// [`WcmError::Schema`] error if the schema itself is unusable.
    pub fn validate(&self, document: &Value, name: &str) -> Result<()> {
        self.get(name)?.validate(document)?;
        Ok(())
    }

    /// Check the document of `collection`, whose root key is the collection
    /// name, against schema `name`.
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::validate`].
    pub fn validate_collection(&self, document: &Value, name: &str, collection: &str) -> Result<()> {
        self.get(name)?.validate_as(document, collection)?;
        Ok(())
    }

    /// Check each entry of an incoming document for `collection` against
    /// schema `name`, leaving `unique` fields to the save of the merged
    /// collection.
    ///
    /// # Errors
    ///
    /// See [`SchemaRegistry::validate`].
    pub fn validate_entries(&self, document: &Value, name: &str, collection: &str) -> Result<()> {
        self.get(name)?.validate_entries_as(document, collection)?;
        Ok(())
    }

    #[must_use]
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache
            .read()
            .map(|cache| cache.contains_key(name))
            .unwrap_or(false)
    }

    /// Drop `name` from the cache so the next use rereads the file.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Lock`] if the cache is poisoned.
    pub fn invalidate(&self, name: &str) -> Result<()> {
        if self.write_cache()?.remove(name).is_some() {
            debug!(schema = name, "schema invalidated");
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`WcmError::Lock`] if the cache is poisoned.
    pub fn invalidate_all(&self) -> Result<()> {
        self.write_cache()?.clear();
        Ok(())
    }

    /// Write every built-in schema that is not already present in the schema
    /// directory. Returns the number of files written.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Io`] if the directory or a file cannot be written.
    pub fn install_defaults(&self) -> Result<usize> {
        fs::create_dir_all(&self.dir)?;
        let mut written = 0;
        for (name, source) in DEFAULT_SCHEMAS {
            let path = self.schema_path(name);
            if path.exists() {
                continue;
            }
            fs::write(&path, source)?;
            written += 1;
        }
        self.invalidate_all()?;
        info!(dir = %self.dir.display(), count = written, "default schemas installed");
        Ok(written)
    }

    fn read_cache(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<SchemaDefinition>>>> {
        self.cache
            .read()
            .map_err(|_| WcmError::Lock("schema cache poisoned".to_string()))
    }

    fn write_cache(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<SchemaDefinition>>>> {
        self.cache
            .write()
            .map_err(|_| WcmError::Lock("schema cache poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_matches_substrings_in_order() {
        assert_eq!(infer_schema_name("employees").unwrap(), "employees");
        assert_eq!(infer_schema_name("Vehicles_2024").unwrap(), "vehicles");
        assert_eq!(infer_schema_name("tours").unwrap(), "tours");
        assert_eq!(infer_schema_name("collection_points").unwrap(), "collection_points");
        assert_eq!(infer_schema_name("citizen_reports").unwrap(), "reports");
        assert_eq!(infer_schema_name("notifications").unwrap(), "notifications");
        assert_eq!(infer_schema_name("admins").unwrap(), "admins");
        assert_eq!(infer_schema_name("supervisors").unwrap(), "supervisors");
        assert_eq!(infer_schema_name("technicians").unwrap(), "technicians");
        assert_eq!(infer_schema_name("users").unwrap(), "users");
        assert!(matches!(
            infer_schema_name("invoices"),
            Err(SchemaError::Uninferable(_))
        ));
    }

    #[test]
    fn every_default_schema_parses_and_names_its_root() {
        for (name, source) in DEFAULT_SCHEMAS {
            let schema = SchemaDefinition::from_yaml(name, source).unwrap();
            assert_eq!(schema.name, name);
            assert_eq!(schema.root, name);
            assert!(schema.fields.get("id").is_some_and(|f| f.unique));
        }
    }

    #[test]
    fn missing_schema_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::new(dir.path());
        match registry.get("vehicles").unwrap_err() {
            WcmError::Schema(SchemaError::NotFound(path)) => assert!(path.contains("vehicles")),
            other => panic!("expected missing schema, got {other:?}"),
        }
    }

    #[test]
    fn install_defaults_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::new(dir.path().join("schemas"));
        fs::create_dir_all(registry.dir()).unwrap();
        fs::write(registry.schema_path("tours"), "name: tours\nroot: tours\n").unwrap();

        assert_eq!(registry.install_defaults().unwrap(), DEFAULT_SCHEMAS.len() - 1);
        assert_eq!(
            fs::read_to_string(registry.schema_path("tours")).unwrap(),
            "name: tours\nroot: tours\n"
        );
        assert_eq!(registry.install_defaults().unwrap(), 0);
    }

    #[test]
    fn invalidate_rereads_changed_schema() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::new(dir.path());
        let path = registry.schema_path("reports");
        fs::write(&path, "name: reports\nroot: reports\n").unwrap();

        assert_eq!(registry.get("reports").unwrap().version, 1);
        assert!(registry.is_cached("reports"));

        fs::write(&path, "name: reports\nversion: 2\nroot: reports\n").unwrap();
        assert_eq!(registry.get("reports").unwrap().version, 1);

        registry.invalidate("reports").unwrap();
        assert!(!registry.is_cached("reports"));
        assert_eq!(registry.get("reports").unwrap().version, 2);
    }

    #[test]
    fn unparsable_schema_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::new(dir.path());
        fs::write(registry.schema_path("tours"), "fields: [").unwrap();
        assert!(matches!(
            registry.get("tours"),
            Err(WcmError::Schema(SchemaError::ParseError { .. }))
        ));
    }
}
