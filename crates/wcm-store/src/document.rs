//! Collection documents on disk.
//!
//! Each collection is one YAML file, `<data_dir>/<collection>.yaml`, holding a
//! single root key named after the collection:
//!
//! ```yaml
//! vehicles:
//!   - id: 1
//!     plate_number: AB-123-CD
//!     ...
//! ```
//!
//! Every save validates the fully assembled document against the
//! collection's schema, then replaces the file atomically through a
//! temporary file in the same directory. A rejected document never touches
//! the file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use wcm_core::error::{Result, WcmError};

use crate::registry::{infer_schema_name, SchemaRegistry};

#[derive(Debug)]
pub struct DocumentStore {
    data_dir: PathBuf,
    registry: Arc<SchemaRegistry>,
    schema_names: Mutex<HashMap<String, String>>,
}

impl DocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            data_dir: data_dir.into(),
            registry,
            schema_names: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.yaml"))
    }

    /// Schema used for `collection`, inferred from its name on first use.
    ///
    /// # Errors
    ///
    /// Returns a [`WcmError::Schema`] error if no schema can be inferred.
    pub fn schema_name(&self, collection: &str) -> Result<String> {
        let mut names = self
            .schema_names
            .lock()
            .map_err(|_| WcmError::Lock("schema name cache poisoned".to_string()))?;
        if let Some(name) = names.get(collection) {
            return Ok(name.clone());
        }
        let name = infer_schema_name(collection)?.to_string();
        debug!(collection, schema = %name, "schema name resolved");
        names.insert(collection.to_string(), name.clone());
        Ok(name)
    }

    /// Pin `collection` to an explicit schema, bypassing inference.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Lock`] if the name cache is poisoned.
    pub fn bind_schema(&self, collection: &str, schema: &str) -> Result<()> {
        self.schema_names
            .lock()
            .map_err(|_| WcmError::Lock("schema name cache poisoned".to_string()))?
            .insert(collection.to_string(), schema.to_string());
        Ok(())
    }

    /// Read every entity of `collection`. A missing or empty file is an
    /// empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Parse`] if the file is not a well-formed document
    /// for this collection.
    pub fn load<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let path = self.path(collection);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(collection, "no document on disk, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let items = parse_entities(collection, &text)?;
        debug!(collection, count = items.len(), "collection loaded");
        Ok(items)
    }

    /// Validate and write `items` as the whole of `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Validation`] if the document breaks its schema,
    /// in which case nothing is written.
    pub fn save<T: Serialize>(&self, collection: &str, items: &[T]) -> Result<()> {
        let schema = self.schema_name(collection)?;
        self.save_with_schema(collection, &schema, items)
    }

    /// Like [`DocumentStore::save`], with an explicit schema name.
    ///
    /// # Errors
    ///
    /// See [`DocumentStore::save`].
    pub fn save_with_schema<T: Serialize>(
        &self,
        collection: &str,
        schema: &str,
        items: &[T],
    ) -> Result<()> {
        let document = to_document(collection, items)?;
        if let Err(e) = self.registry.validate_collection(&document, schema, collection) {
            warn!(collection, schema, error = %e, "document rejected");
            return Err(e);
        }
        let text = render(collection, &document)?;
        self.write_atomic(&self.path(collection), &text)?;
        info!(collection, count = items.len(), "collection saved");
        Ok(())
    }

    /// The live collection serialized in its on-disk document shape.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Parse`] if the stored document is malformed.
    pub fn export<T: Serialize + DeserializeOwned>(&self, collection: &str) -> Result<String> {
        let items: Vec<T> = self.load(collection)?;
        let document = to_document(collection, &items)?;
        render(collection, &document)
    }

    /// Parse an externally supplied document for `collection`, checking each
    /// entry against the collection's schema first. Repeated keys are
    /// allowed here; the merged collection is checked for them when saved.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Parse`] for malformed YAML and
    /// [`WcmError::Validation`] for schema violations.
    pub fn parse_document<T: DeserializeOwned>(&self, collection: &str, text: &str) -> Result<Vec<T>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document = parse_value(collection, text)?;
        let schema = self.schema_name(collection)?;
        self.registry.validate_entries(&document, &schema, collection)?;
        parse_entities(collection, text)
    }

    /// Check the stored document for `collection` against its schema.
    /// Returns the number of entities it holds.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Parse`] or [`WcmError::Validation`] when the file
    /// on disk is not acceptable.
    pub fn validate_stored(&self, collection: &str) -> Result<usize> {
        let text = match fs::read_to_string(self.path(collection)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(0);
        }
        let document = parse_value(collection, &text)?;
        let schema = self.schema_name(collection)?;
        self.registry.validate_collection(&document, &schema, collection)?;
        Ok(document
            .get(collection)
            .and_then(Value::as_sequence)
            .map_or(0, Vec::len))
    }

    fn write_atomic(&self, path: &Path, text: &str) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let mut tmp = NamedTempFile::new_in(&self.data_dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| WcmError::Io(e.error))?;
        Ok(())
    }
}

fn parse_error(collection: &str, e: &serde_yaml::Error) -> WcmError {
    let location = e.location();
    let err = WcmError::Parse {
        document: collection.to_string(),
        line: location.as_ref().map(serde_yaml::Location::line),
        column: location.as_ref().map(serde_yaml::Location::column),
        message: e.to_string(),
    };
    error!(collection, error = %err, "malformed document");
    err
}

fn parse_value(collection: &str, text: &str) -> Result<Value> {
    serde_yaml::from_str(text).map_err(|e| parse_error(collection, &e))
}

/// Typed entities from document text, checking the root key.
fn parse_entities<T: DeserializeOwned>(collection: &str, text: &str) -> Result<Vec<T>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut root: BTreeMap<String, Option<Vec<T>>> =
        serde_yaml::from_str(text).map_err(|e| parse_error(collection, &e))?;

    if let Some(other) = root.keys().find(|k| k.as_str() != collection) {
        let err = WcmError::Parse {
            document: collection.to_string(),
            line: None,
            column: None,
            message: format!("unexpected root element '{other}', expected '{collection}'"),
        };
        error!(collection, error = %err, "malformed document");
        return Err(err);
    }
    Ok(root.remove(collection).flatten().unwrap_or_default())
}

fn to_document<T: Serialize>(collection: &str, items: &[T]) -> Result<Value> {
    let mut root = BTreeMap::new();
    root.insert(collection, items);
    serde_yaml::to_value(root).map_err(|e| {
        error!(collection, error = %e, "failed to serialize collection");
        WcmError::Serialization(e.to_string())
    })
}

fn render(collection: &str, document: &Value) -> Result<String> {
    serde_yaml::to_string(document).map_err(|e| {
        error!(collection, error = %e, "failed to render document");
        WcmError::Serialization(e.to_string())
    })
}
