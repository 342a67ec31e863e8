//! HTTP response handlers.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::reload;
use crate::utils::mime::{self, types};

/// Respond with a static file, injecting the reload script into HTML.
pub fn respond_file(request: Request, path: &Path, reload_port: Option<u16>) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = match reload_port {
        Some(_) if mime::is_html(content_type) => inject_reload_script(&body),
        _ => body,
    };

    send_body(request, 200, content_type, body)
}

pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 404, types::PLAIN);
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, types::PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with the reload client, bound to the WebSocket port.
pub fn respond_reload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = reload::script(ws_port);
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes())
}

/// Inject the reload script tag before the last `</body>`, or append it.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let tag = format!(r#"<script src="{}"></script>"#, reload::SCRIPT_PATH);
    let tag = tag.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    let pos = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(content.len());

    let mut result = Vec::with_capacity(content.len() + tag.len());
    result.extend_from_slice(&content[..pos]);
    result.extend_from_slice(tag);
    result.extend_from_slice(&content[pos..]);
    result
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status)).with_header(make_header(content_type)?);
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header(content_type)?)
        .with_header(no_cache()?);
    request.respond(response)?;
    Ok(())
}

fn make_header(content_type: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", content_type)
        .map_err(|()| anyhow::anyhow!("invalid content type `{content_type}`"))
}

/// Files change under the developer constantly; never let the page cache them.
fn no_cache() -> Result<Header> {
    Header::from_bytes("Cache-Control", "no-store")
        .map_err(|()| anyhow::anyhow!("invalid cache header"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injected(html: &str) -> String {
        String::from_utf8(inject_reload_script(html.as_bytes())).unwrap()
    }

    #[test]
    fn test_inject_before_body_close() {
        let html = injected("<html><body><p>hi</p></body></html>");
        assert_eq!(
            html,
            format!(
                r#"<html><body><p>hi</p><script src="{}"></script></body></html>"#,
                reload::SCRIPT_PATH
            )
        );
    }

    #[test]
    fn test_inject_uses_last_body_close() {
        let html = injected("<body><pre>&lt;/body&gt; </body></pre></BODY>");
        assert!(html.ends_with(&format!(
            r#"<script src="{}"></script></BODY>"#,
            reload::SCRIPT_PATH
        )));
    }

    #[test]
    fn test_inject_appends_without_body() {
        let html = injected("<p>fragment</p>");
        assert!(html.starts_with("<p>fragment</p><script"));
    }
}
