//! Process-wide, lazily loaded License XML schema.

use std::fs;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use super::model::Schema;
use crate::config::SchemaConfig;
use crate::error::{LicenseXmlError, Result};
use crate::http::{create_client, download_text};

/// Schema shipped with the crate, used when no other source is available.
pub const PACKAGED_SCHEMA: &str = include_str!("../../resources/ListedLicense.xsd");

static GLOBAL_PROVIDER: LazyLock<SchemaProvider> =
    LazyLock::new(|| SchemaProvider::new(SchemaConfig::from_env()));

/// Provider configured from the process environment.
///
/// The schema is loaded on first use and shared by all callers afterwards.
pub fn global_schema_provider() -> &'static SchemaProvider {
    &GLOBAL_PROVIDER
}

/// Loads the schema at most once and hands out shared references to it.
///
/// A failed load is not cached; the next call tries again.
#[derive(Debug)]
pub struct SchemaProvider {
    config: SchemaConfig,
    schema: Mutex<Option<Arc<Schema>>>,
}

impl SchemaProvider {
    pub fn new(config: SchemaConfig) -> Self {
        Self {
            config,
            schema: Mutex::new(None),
        }
    }

    /// Provider that only ever uses [`PACKAGED_SCHEMA`].
    pub fn packaged() -> Self {
        Self::new(SchemaConfig::offline())
    }

    /// Return the cached schema, loading it first if necessary.
    ///
    /// Concurrent first callers block on the same lock, so the schema is
    /// compiled once.
    pub fn get_or_load(&self) -> Result<Arc<Schema>> {
        let mut cached = self.schema.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = cached.as_ref() {
            return Ok(Arc::clone(schema));
        }
        let schema = Arc::new(load_schema(&self.config)?);
        *cached = Some(Arc::clone(&schema));
        Ok(schema)
    }

    /// Drop the cached schema so the next use reloads it.
    pub fn reset(&self) {
        *self.schema.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.schema
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Resolve the schema: override path, then URL, then the packaged copy.
///
/// An unreadable override path is an error. A failed download or an
/// uncompilable downloaded schema falls back to the packaged copy.
fn load_schema(config: &SchemaConfig) -> Result<Schema> {
    if let Some(path) = &config.override_path {
        tracing::info!(path = %path.display(), "Loading License XML schema from override path");
        let text = fs::read_to_string(path).map_err(|e| {
            LicenseXmlError::SchemaLoad(format!(
                "unable to read schema file {}: {e}",
                path.display()
            ))
        })?;
        return Schema::compile(&text);
    }

    if let Some(url) = &config.url {
        match fetch_schema(url, config) {
            Ok(text) => match Schema::compile(&text) {
                Ok(schema) => {
                    tracing::debug!(url = %url, "Loaded License XML schema");
                    return Ok(schema);
                }
                Err(e) => {
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        "Downloaded License XML schema is unusable, using packaged copy"
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    error = %e,
                    "Unable to fetch License XML schema, using packaged copy"
                );
            }
        }
    }

    Schema::compile(PACKAGED_SCHEMA)
}

fn fetch_schema(url: &str, config: &SchemaConfig) -> Result<String> {
    let client = create_client(config.timeout)?;
    download_text(&client, url)
}
