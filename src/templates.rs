//! # Plantillas
//! src/templates.rs
//!
//! Renderizado ingenuo: lee `<template_folder>/<nombre>` y reemplaza cada
//! `{{ clave }}` por el valor correspondiente del contexto. No hay
//! escapado, condicionales ni loops.

use std::fmt::Display;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Nombre absoluto o con `..`
    #[error("Invalid template name: {0}")]
    InvalidName(String),

    #[error("Failed to read template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cargador de plantillas desde disco
#[derive(Debug, Clone)]
pub struct Templates {
    root: PathBuf,
}

impl Templates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Renderiza `template_name` con el contexto dado
    ///
    /// ```no_run
    /// use http_framework::templates::Templates;
    ///
    /// let templates = Templates::new("templates");
    /// let html = templates.render("index.html", [("title", "Home")]).unwrap();
    /// ```
    pub fn render<I, K, V>(&self, template_name: &str, context: I) -> Result<String, TemplateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Display,
    {
        let path = self.resolve(template_name)?;

        let mut template = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound(template_name.to_string())
            } else {
                TemplateError::Io {
                    name: template_name.to_string(),
                    source,
                }
            }
        })?;

        for (key, value) in context {
            let placeholder = format!("{{{{ {} }}}}", key.as_ref());
            template = template.replace(&placeholder, &value.to_string());
        }

        Ok(template)
    }

    fn resolve(&self, template_name: &str) -> Result<PathBuf, TemplateError> {
        let relative = Path::new(template_name);
        let is_safe = !template_name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_safe {
            return Err(TemplateError::InvalidName(template_name.to_string()));
        }

        Ok(self.root.join(relative))
    }
}
