//! # Aplicación de Demostración
//! src/app.rs
//!
//! Rutas que registra el binario:
//! - `/`: Página de inicio (plantilla `index.html`)
//! - `/time`: Hora actual en UTC (plantilla `time.html`)
//! - `/user/<username>`: Saludo en texto plano
//! - `/echo` (POST): Devuelve el request como JSON

use crate::context::RequestContext;
use crate::http::{Method, Response};
use crate::router::{HandlerResult, PathParams, RouteError};
use crate::server::Server;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Registra todas las rutas de la demo
pub fn register_routes(server: &mut Server) -> Result<(), RouteError> {
    server.route("/", &[Method::GET], index_handler)?;
    server.route("/time", &[Method::GET], time_handler)?;
    server.route("/user/<username>", &[Method::GET], user_handler)?;
    server.route("/echo", &[Method::POST], echo_handler)?;
    Ok(())
}

pub fn index_handler(ctx: &RequestContext<'_>, _params: &PathParams) -> HandlerResult {
    let html = ctx.render(
        "index.html",
        [("title", "Home"), ("message", "Welcome to the HTTP framework!")],
    )?;
    Ok(Response::html(html))
}

pub fn time_handler(ctx: &RequestContext<'_>, _params: &PathParams) -> HandlerResult {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let time = format_utc(now);
    let html = ctx.render("time.html", [("title", "Current Time"), ("time", time.as_str())])?;
    Ok(Response::html(html))
}

pub fn user_handler(_ctx: &RequestContext<'_>, params: &PathParams) -> HandlerResult {
    let username = params.get("username").ok_or("missing username")?;
    Ok(Response::text(format!("Hello {}", username)))
}

#[derive(Serialize)]
struct Echo<'a> {
    method: &'a str,
    path: &'a str,
    query: BTreeMap<&'a str, &'a str>,
    body: &'a str,
}

pub fn echo_handler(ctx: &RequestContext<'_>, _params: &PathParams) -> HandlerResult {
    let request = ctx.request();
    let echo = Echo {
        method: request.method().as_str(),
        path: request.path(),
        query: request
            .query_params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect(),
        body: request.body(),
    };
    Ok(Response::json(&echo)?)
}

/// Segundos desde epoch a `YYYY-MM-DD HH:MM:SS` (UTC)
fn format_utc(secs: u64) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Días desde 1970-01-01 a fecha del calendario gregoriano
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);

    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::{Request, StatusCode};
    use crate::templates::Templates;

    fn body(response: &Response) -> String {
        String::from_utf8(response.body().as_bytes().to_vec()).unwrap()
    }

    type HandlerFn = fn(&RequestContext<'_>, &PathParams) -> HandlerResult;

    fn call(handler: HandlerFn, raw: &str, params: PathParams) -> Response {
        let request = Request::parse(raw.as_bytes()).unwrap();
        let templates = Templates::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"));
        let ctx = RequestContext::new(&request, &templates);
        handler(&ctx, &params).unwrap()
    }

    #[test]
    fn test_format_utc() {
        assert_eq!(format_utc(0), "1970-01-01 00:00:00");
        assert_eq!(format_utc(951_782_400), "2000-02-29 00:00:00");
        assert_eq!(format_utc(1_704_067_199), "2023-12-31 23:59:59");
    }

    #[test]
    fn test_register_routes_once() {
        let mut server = Server::new(Config::default());
        register_routes(&mut server).unwrap();
        assert_eq!(server.router_mut().len(), 4);

        // Registrar dos veces es un error de arranque
        assert!(matches!(
            register_routes(&mut server),
            Err(RouteError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn test_index_renders_template() {
        let response = call(index_handler, "GET / HTTP/1.1\r\n\r\n", PathParams::new());
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.content_type(), "text/html");
        assert!(body(&response).contains("Welcome to the HTTP framework!"));
        assert!(!body(&response).contains("{{"));
    }

    #[test]
    fn test_time_renders_template() {
        let response = call(time_handler, "GET /time HTTP/1.1\r\n\r\n", PathParams::new());
        assert!(body(&response).contains("Current Time"));
        assert!(!body(&response).contains("{{ time }}"));
    }

    #[test]
    fn test_echo_is_json() {
        let response = call(
            echo_handler,
            "POST /echo?x=1 HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
            PathParams::new(),
        );
        assert_eq!(response.content_type(), "application/json");

        let value: serde_json::Value = serde_json::from_str(&body(&response)).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["path"], "/echo");
        assert_eq!(value["query"]["x"], "1");
        assert_eq!(value["body"], "hello");
    }
}
