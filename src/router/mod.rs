//! # Sistema de Routing
//! src/router/mod.rs
//!
//! El router guarda las rutas registradas `(patrón, métodos) → handler` y,
//! para cada request, busca la primera que acepte el método y cuyo patrón
//! haga match con el path completo.
//!
//! ```text
//! Request → Router → Handler(ctx, params) → Response
//! ```
//!
//! ## Reglas
//!
//! - Las rutas se prueban en orden de registro: gana el primer match.
//!   Los patrones pueden solaparse, así que el orden es parte del contrato.
//! - Registrar dos veces el mismo par (patrón, conjunto de métodos) es un
//!   error de configuración y no modifica la ruta existente.
//! - Que ninguna ruta haga match no es un error: el dispatcher lo convierte
//!   en un 404.
//! - El router se llena antes de arrancar el servidor y después solo se lee.

pub mod params;
pub mod pattern;

pub use params::PathParams;
pub use pattern::{PatternError, RoutePattern};

use crate::context::RequestContext;
use crate::http::{Method, Response};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Error genérico que puede devolver un handler
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Resultado de un handler
pub type HandlerResult = Result<Response, BoxError>;

/// Tipo de función handler
///
/// Recibe el contexto del request y los parámetros extraídos del path.
pub type Handler = Arc<dyn Fn(&RequestContext<'_>, &PathParams) -> HandlerResult + Send + Sync>;

/// Errores de registro de rutas
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Route '{pattern}' with methods {methods:?} is already registered")]
    DuplicateRoute {
        pattern: String,
        methods: Vec<Method>,
    },

    #[error("Invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("Route '{0}' must accept at least one method")]
    NoMethods(String),
}

/// Ruta registrada
pub struct Route {
    pattern: RoutePattern,

    /// Métodos en el orden en que se registraron, sin repetidos
    methods: Vec<Method>,

    handler: Handler,
}

impl Route {
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    fn accepts(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    fn same_key(&self, pattern: &str, methods: &BTreeSet<Method>) -> bool {
        self.pattern.as_str() == pattern
            && self.methods.iter().copied().collect::<BTreeSet<_>>() == *methods
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Resultado de un match: handler + parámetros
pub struct RouteMatch<'r> {
    pub route: &'r Route,
    pub params: PathParams,
}

impl RouteMatch<'_> {
    pub fn handler(&self) -> &Handler {
        &self.route.handler
    }
}

/// Router que mapea (path, método) a handlers
#[derive(Default)]
pub struct Router {
    /// Vec, no HashMap: el orden de registro decide los empates
    routes: Vec<Route>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta con su handler
    ///
    /// # Ejemplo
    /// ```
    /// use http_framework::http::{Method, Response};
    /// use http_framework::router::Router;
    ///
    /// let mut router = Router::new();
    /// router
    ///     .register("/user/<username>", &[Method::GET], |_ctx, params| {
    ///         Ok(Response::text(format!("Hello {}", params.get("username").unwrap_or(""))))
    ///     })
    ///     .unwrap();
    ///
    /// // El mismo par (patrón, métodos) no se puede registrar dos veces
    /// let again = router.register("/user/<username>", &[Method::GET], |_, _| {
    ///     Ok(Response::text(""))
    /// });
    /// assert!(again.is_err());
    /// ```
    pub fn register<F>(
        &mut self,
        pattern: &str,
        methods: &[Method],
        handler: F,
    ) -> Result<(), RouteError>
    where
        F: Fn(&RequestContext<'_>, &PathParams) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(pattern, methods, Arc::new(handler))
    }

    /// Igual que [`Router::register`] con un handler ya envuelto en `Arc`
    pub fn register_handler(
        &mut self,
        pattern: &str,
        methods: &[Method],
        handler: Handler,
    ) -> Result<(), RouteError> {
        if methods.is_empty() {
            return Err(RouteError::NoMethods(pattern.to_string()));
        }

        let key: BTreeSet<Method> = methods.iter().copied().collect();
        if self.routes.iter().any(|route| route.same_key(pattern, &key)) {
            return Err(RouteError::DuplicateRoute {
                pattern: pattern.to_string(),
                methods: methods.to_vec(),
            });
        }

        let compiled = RoutePattern::parse(pattern).map_err(|source| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let mut unique = Vec::with_capacity(methods.len());
        for method in methods {
            if !unique.contains(method) {
                unique.push(*method);
            }
        }

        tracing::debug!(pattern, methods = ?unique, "route registered");

        self.routes.push(Route {
            pattern: compiled,
            methods: unique,
            handler,
        });

        Ok(())
    }

    /// Busca la primera ruta que acepte `method` y haga match con `path`
    pub fn match_route(&self, path: &str, method: Method) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.accepts(method))
            .find_map(|route| {
                route
                    .pattern
                    .matches(path)
                    .map(|params| RouteMatch { route, params })
            })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
