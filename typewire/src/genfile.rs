//! Schema file emission, the only file I/O in the workspace.
//!
//! Emits the schema text for a service into `<dir>/<service>.proto`, with
//! an opt-out that reuses an existing file. File names key off the
//! lower-cased service name, so repeated runs target the same path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use typewire_core::emit_schema;
use typewire_core::error::SchemaError;
use typewire_core::schema::{SchemaRegistry, ServiceSchema};

use crate::config;

/// Failure while writing a schema file.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to write `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{0}` exists and is not a directory")]
    NotADirectory(PathBuf),
}

/// Where and whether to write schema files.
#[derive(Clone, Debug)]
pub struct GenerateOptions {
    out_dir: PathBuf,
    skip_existing: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            skip_existing: false,
        }
    }
}

impl GenerateOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            skip_existing: false,
        }
    }

    /// Options from `TYPEWIRE_PROTO_DIR` and `TYPEWIRE_SKIP_GENERATION`.
    pub fn from_env() -> Self {
        let out_dir = std::env::var_os(config::PROTO_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            out_dir,
            skip_existing: config::skip_generation(),
        }
    }

    /// Keep an existing schema file instead of rewriting it.
    pub fn skip_existing(mut self) -> Self {
        self.skip_existing = true;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

/// File name for a service's schema: lower-cased service name plus `.proto`.
pub fn schema_file_name(service: &ServiceSchema) -> String {
    format!("{}.proto", service.name().to_lowercase())
}

/// Emit the schema for a service and write it under the configured
/// directory. Returns the path written (or kept, when skipping).
pub fn write_schema(
    service: &ServiceSchema,
    registry: &SchemaRegistry,
    options: &GenerateOptions,
) -> Result<PathBuf, GenerateError> {
    let dir = options.out_dir.as_path();
    if dir.exists() && !dir.is_dir() {
        return Err(GenerateError::NotADirectory(dir.to_path_buf()));
    }
    std::fs::create_dir_all(dir).map_err(|source| GenerateError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(schema_file_name(service));
    if options.skip_existing && path.exists() {
        debug!(path = %path.display(), "schema file exists, skipping generation");
        return Ok(path);
    }

    let text = emit_schema(service, registry)?;
    std::fs::write(&path, text).map_err(|source| GenerateError::Io {
        path: path.clone(),
        source,
    })?;
    info!(service = service.name(), path = %path.display(), "schema file written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use typewire_core::schema::{FieldDescriptor, MessageSchema, MethodDescriptor, TypeRef};

    fn fixture() -> (ServiceSchema, SchemaRegistry) {
        let registry = SchemaRegistry::builder()
            .register(
                MessageSchema::builder("Note")
                    .field(FieldDescriptor::new("text", TypeRef::String))
                    .build(),
            )
            .build()
            .unwrap();
        let service = ServiceSchema::builder("NoteService")
            .method(MethodDescriptor::new(
                "Add",
                TypeRef::message("Note"),
                TypeRef::message("Note"),
            ))
            .build();
        (service, registry)
    }

    #[test]
    fn writes_schema_file_keyed_by_service_name() {
        let (service, registry) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let options = GenerateOptions::new(dir.path());

        let path = write_schema(&service, &registry, &options).unwrap();
        assert_eq!(path.file_name().unwrap(), "noteservice.proto");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("service NoteService {"));
        assert!(text.contains("string text = 1;"));
    }

    #[test]
    fn skip_existing_keeps_the_old_file() {
        let (service, registry) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(schema_file_name(&service));
        std::fs::write(&path, "// stale").unwrap();

        let options = GenerateOptions::new(dir.path()).skip_existing();
        let kept = write_schema(&service, &registry, &options).unwrap();
        assert_eq!(kept, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "// stale");

        // Without the skip flag the file is rewritten.
        let options = GenerateOptions::new(dir.path());
        write_schema(&service, &registry, &options).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("syntax"));
    }

    #[test]
    fn creates_missing_directories() {
        let (service, registry) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        let options = GenerateOptions::new(&nested);

        let path = write_schema(&service, &registry, &options).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn file_in_place_of_directory_is_rejected() {
        let (service, registry) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, "not a dir").unwrap();

        let err = write_schema(&service, &registry, &GenerateOptions::new(&blocker)).unwrap_err();
        assert!(matches!(err, GenerateError::NotADirectory(_)));
    }
}
