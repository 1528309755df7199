//! # Patrones de Ruta
//! src/router/pattern.rs
//!
//! Convierte un patrón como `/user/<username>/posts/<id>` en una regex
//! anclada (`^...$`) donde cada `<nombre>` captura uno o más caracteres
//! distintos de `/`. El resto del patrón se compara literalmente.
//!
//! Los patrones sin placeholders se comparan por igualdad exacta, sin pasar
//! por la regex.

use super::params::PathParams;
use regex::Regex;
use thiserror::Error;

/// Segmento capturado por cada placeholder
const PLACEHOLDER_REGEX: &str = "[^/]+";

/// Motivo por el que un patrón es inválido
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("unclosed placeholder starting at byte {0}")]
    UnclosedPlaceholder(usize),

    #[error("invalid placeholder name {0:?}")]
    InvalidName(String),

    #[error("placeholder {0:?} appears more than once")]
    DuplicateName(String),

    #[error("regex compilation failed: {0}")]
    Regex(String),
}

/// Patrón de ruta compilado
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    param_names: Vec<String>,

    /// `None` para rutas estáticas
    regex: Option<Regex>,
}

impl RoutePattern {
    /// Compila un patrón
    ///
    /// ```
    /// use http_framework::router::RoutePattern;
    ///
    /// let pattern = RoutePattern::parse("/user/<username>").unwrap();
    /// let params = pattern.matches("/user/alice").unwrap();
    /// assert_eq!(params.get("username"), Some("alice"));
    /// assert!(pattern.matches("/user/").is_none());
    /// assert!(pattern.matches("/user/alice/extra").is_none());
    /// ```
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        if !source.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let mut expr = String::from("^");
        let mut param_names: Vec<String> = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find('<') {
            let Some(close) = rest[open..].find('>').map(|i| open + i) else {
                return Err(PatternError::UnclosedPlaceholder(offset + open));
            };

            let name = &rest[open + 1..close];
            if !is_valid_name(name) {
                return Err(PatternError::InvalidName(name.to_string()));
            }
            if param_names.iter().any(|existing| existing == name) {
                return Err(PatternError::DuplicateName(name.to_string()));
            }

            expr.push_str(&regex::escape(&rest[..open]));
            expr.push_str(&format!("(?P<{}>{})", name, PLACEHOLDER_REGEX));
            param_names.push(name.to_string());

            offset += close + 1;
            rest = &rest[close + 1..];
        }

        if param_names.is_empty() {
            return Ok(Self {
                source: source.to_string(),
                param_names,
                regex: None,
            });
        }

        expr.push_str(&regex::escape(rest));
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| PatternError::Regex(e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            param_names,
            regex: Some(regex),
        })
    }

    /// Compara contra el path completo. Retorna los parámetros extraídos
    /// si hay match.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let Some(regex) = &self.regex else {
            return (self.source == path).then(PathParams::new);
        };

        let captures = regex.captures(path)?;
        let mut params = PathParams::new();
        for name in &self.param_names {
            if let Some(value) = captures.name(name) {
                params.insert(name, value.as_str());
            }
        }
        Some(params)
    }

    /// Patrón tal cual se registró
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn is_static(&self) -> bool {
        self.regex.is_none()
    }
}

/// Nombres válidos: `[A-Za-z_][A-Za-z0-9_]*` (lo que acepta un grupo
/// nombrado de `regex`)
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
