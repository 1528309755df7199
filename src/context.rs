//! # Contexto de Request
//! src/context.rs
//!
//! Lo que un handler recibe además de los parámetros del path: el request
//! parseado y acceso a las plantillas del servidor. Vive en el stack del
//! worker que atiende la conexión y no se comparte entre threads.

use crate::http::Request;
use crate::templates::{TemplateError, Templates};
use std::fmt::Display;

pub struct RequestContext<'a> {
    request: &'a Request,
    templates: &'a Templates,
}

impl<'a> RequestContext<'a> {
    pub fn new(request: &'a Request, templates: &'a Templates) -> Self {
        Self { request, templates }
    }

    pub fn request(&self) -> &'a Request {
        self.request
    }

    /// Renderiza una plantilla del `template_folder` configurado
    pub fn render<I, K, V>(&self, template_name: &str, context: I) -> Result<String, TemplateError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Display,
    {
        self.templates.render(template_name, context)
    }
}
