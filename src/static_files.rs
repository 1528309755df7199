//! # Archivos Estáticos
//! src/static_files.rs
//!
//! Sirve los paths bajo un prefijo reservado (por defecto `/static/`) desde
//! un directorio en disco. El Content-Type se adivina por la extensión.

use crate::http::{Response, StatusCode};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StaticFileError {
    /// No existe, no es un archivo, o el path intenta salir del root
    #[error("Static file not found: {0}")]
    NotFound(String),

    #[error("Failed to read static file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Archivo leído de disco
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl StaticAsset {
    pub fn into_response(self) -> Response {
        Response::new(self.bytes, StatusCode::Ok, &self.content_type)
    }
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    prefix: String,
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.into(),
        }
    }

    /// ¿El path pertenece al prefijo reservado?
    pub fn handles(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resuelve y lee el archivo para `path`
    pub fn serve(&self, path: &str) -> Result<StaticAsset, StaticFileError> {
        let file_path = self
            .resolve(path)
            .ok_or_else(|| StaticFileError::NotFound(path.to_string()))?;

        if !file_path.is_file() {
            return Err(StaticFileError::NotFound(path.to_string()));
        }

        let bytes = std::fs::read(&file_path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => StaticFileError::NotFound(path.to_string()),
            _ => StaticFileError::Io {
                path: path.to_string(),
                source,
            },
        })?;

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();

        tracing::debug!(
            path,
            content_type = %content_type,
            bytes = bytes.len(),
            "static file served"
        );

        Ok(StaticAsset { content_type, bytes })
    }

    /// Traduce el path del request a un archivo dentro de `root`.
    /// `None` si se sale del prefijo o del directorio.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = path.strip_prefix(&self.prefix)?;
        if relative.is_empty() {
            return None;
        }

        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        safe.then(|| self.root.join(relative))
    }
}
