//! ESP-IDF HTTP server adapter.
//!
//! Registers one wildcard handler per method and forwards every request to
//! [`QueryHandler::route`]. Each request runs on an httpd worker, so the
//! bounded snapshot read blocks only that worker.

#[cfg(target_os = "espidf")]
use crate::error::CommsError;
#[cfg(target_os = "espidf")]
use crate::http::{Method, QueryHandler};
use crate::http::HttpResponse;

/// Header list for the response, `Content-Type` first.
pub fn response_headers(resp: &HttpResponse) -> Vec<(&'static str, &'static str)> {
    let mut headers = Vec::with_capacity(resp.headers.len() + 1);
    if let Some(ct) = resp.content_type {
        headers.push(("Content-Type", ct));
    }
    headers.extend(resp.headers.iter().copied());
    headers
}

#[cfg(target_os = "espidf")]
fn method_of(m: esp_idf_svc::http::Method) -> Method {
    match m {
        esp_idf_svc::http::Method::Get => Method::Get,
        esp_idf_svc::http::Method::Options => Method::Options,
        _ => Method::Other,
    }
}

/// Running server. Dropping it stops httpd.
#[cfg(target_os = "espidf")]
pub struct HttpServer {
    _server: esp_idf_svc::http::server::EspHttpServer<'static>,
}

#[cfg(target_os = "espidf")]
impl HttpServer {
    pub fn start(handler: QueryHandler, port: u16, stack_size: usize) -> Result<Self, CommsError> {
        use esp_idf_svc::http::server::{Configuration, EspHttpServer};
        use esp_idf_svc::io::Write;
        use log::{error, info};

        const METHODS: [esp_idf_svc::http::Method; 6] = [
            esp_idf_svc::http::Method::Get,
            esp_idf_svc::http::Method::Post,
            esp_idf_svc::http::Method::Put,
            esp_idf_svc::http::Method::Delete,
            esp_idf_svc::http::Method::Patch,
            esp_idf_svc::http::Method::Options,
        ];

        let conf = Configuration {
            http_port: port,
            stack_size,
            uri_match_wildcard: true,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf).map_err(|e| {
            error!("HTTP: server start failed: {}", e);
            CommsError::HttpServerFailed
        })?;

        for m in METHODS {
            let handler = handler.clone();
            server
                .fn_handler("/*", m, move |req| {
                    let resp = handler.route(method_of(req.method()), req.uri());
                    let headers = response_headers(&resp);
                    let mut out = req.into_response(resp.status, None, &headers)?;
                    out.write_all(resp.body.as_bytes())?;
                    Ok::<(), esp_idf_svc::io::EspIOError>(())
                })
                .map_err(|e| {
                    error!("HTTP: handler registration failed: {}", e);
                    CommsError::HttpServerFailed
                })?;
        }

        info!(
            "HTTP: listening on :{} (device {})",
            port,
            handler.device_id()
        );
        Ok(Self { _server: server })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_leads_headers() {
        let resp = HttpResponse {
            status: 200,
            content_type: Some("application/json"),
            headers: vec![("Access-Control-Allow-Origin", "*")],
            body: String::new(),
        };
        assert_eq!(
            response_headers(&resp),
            vec![
                ("Content-Type", "application/json"),
                ("Access-Control-Allow-Origin", "*"),
            ]
        );
    }

    #[test]
    fn bodiless_response_has_no_content_type() {
        let resp = HttpResponse {
            status: 204,
            content_type: None,
            headers: vec![],
            body: String::new(),
        };
        assert!(response_headers(&resp).is_empty());
    }
}
