//! Live HTTP servers for transport and client tests

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

/// Start an actix server on an ephemeral port and return its base URL.
///
/// Must be called from inside a tokio runtime.
pub(crate) fn spawn_server<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Failed to bind test server");
    let addr = server.addrs()[0];
    tokio::spawn(server.run());
    format!("http://{}", addr)
}

/// Respond with every received header as a list of `[name, value]` pairs
pub(crate) async fn echo_headers(req: HttpRequest) -> HttpResponse {
    let pairs: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    HttpResponse::Ok().json(pairs)
}

/// Parsed body of [`echo_headers`]
pub(crate) struct HeaderEcho(Vec<(String, String)>);

impl HeaderEcho {
    pub(crate) fn parse(body: &[u8]) -> Self {
        Self(serde_json::from_slice(body).expect("header echo body"))
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.0
            .iter()
            .filter(|(header, _)| header.eq_ignore_ascii_case(name))
            .count()
    }
}
