use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::registry::{Registry, ResourceHandler};
use crate::errors::{ProbeError, ResourceError};
use crate::harness::{ProbeRequest, ProbeResponse, Transport};
use crate::scoring::Category;

const JSON: &str = "application/json";
const HTML: &str = "text/html; charset=utf-8";

fn json_response(status: StatusCode, body: serde_json::Value) -> ProbeResponse {
    ProbeResponse {
        status,
        content_type: Some(JSON.to_string()),
        body: body.to_string().into_bytes(),
    }
}

fn success<T: Serialize>(status: StatusCode, data: &T) -> ProbeResponse {
    match serde_json::to_value(data) {
        Ok(data) => json_response(status, json!({ "success": true, "data": data })),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn failure(status: StatusCode, message: &str) -> ProbeResponse {
    json_response(status, json!({ "success": false, "error": message }))
}

fn resource_failure(error: ResourceError) -> ProbeResponse {
    let status = match error {
        ResourceError::NotFound => StatusCode::NOT_FOUND,
        ResourceError::InvalidId
        | ResourceError::MalformedBody(_)
        | ResourceError::Validation(_) => StatusCode::BAD_REQUEST,
    };
    failure(status, &error.to_string())
}

fn decode_body<T: DeserializeOwned>(body: Option<&serde_json::Value>) -> Result<T, ResourceError> {
    let body = body.ok_or_else(|| ResourceError::MalformedBody("missing body".to_string()))?;
    serde_json::from_value(body.clone()).map_err(|e| ResourceError::MalformedBody(e.to_string()))
}

fn respond<T: Serialize>(status: StatusCode, outcome: Result<T, ResourceError>) -> ProbeResponse {
    match outcome {
        Ok(data) => success(status, &data),
        Err(e) => resource_failure(e),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_page(handler: &dyn ResourceHandler) -> ProbeResponse {
    let info = handler.info();
    let count = handler.list().map(|items| items.len()).unwrap_or(0);
    let page = format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body><h1>{icon} {title}</h1><p>{description}</p><p>{count} items</p></body></html>",
        title = escape_html(&info.display_name),
        icon = escape_html(&info.icon),
        description = escape_html(&info.description),
        count = count,
    );
    ProbeResponse {
        status: StatusCode::OK,
        content_type: Some(HTML.to_string()),
        body: page.into_bytes(),
    }
}

fn not_found_page() -> ProbeResponse {
    ProbeResponse {
        status: StatusCode::NOT_FOUND,
        content_type: Some(HTML.to_string()),
        body: b"<!DOCTYPE html><html><body><h1>404</h1></body></html>".to_vec(),
    }
}

impl Registry {
    /// Route a request the way the web app routes `/{category}/{module}` and
    /// `/api/{category}/{module}[/{id}]`.
    pub fn dispatch(&self, request: &ProbeRequest) -> ProbeResponse {
        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();

        match segments.as_slice() {
            ["api", category, module, rest @ ..] if rest.len() <= 1 => {
                let Ok(category) = category.parse::<Category>() else {
                    return failure(StatusCode::BAD_REQUEST, "Invalid category");
                };
                let Some(handler) = self.get(category, module) else {
                    return failure(StatusCode::NOT_FOUND, "Module not found");
                };
                let handler = handler.as_ref();
                let body = request.body.as_ref();

                match (rest.first(), &request.method) {
                    (None, &Method::GET) => respond(StatusCode::OK, handler.list()),
                    (None, &Method::POST) => respond(
                        StatusCode::CREATED,
                        decode_body(body).and_then(|input| handler.create(input)),
                    ),
                    (Some(id), &Method::GET) => respond(StatusCode::OK, handler.get_by_id(id)),
                    (Some(id), &Method::PUT) => respond(
                        StatusCode::OK,
                        decode_body(body).and_then(|patch| handler.update(id, patch)),
                    ),
                    (Some(id), &Method::DELETE) => respond(StatusCode::OK, handler.delete(id)),
                    _ => failure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
                }
            }
            [category, module] if request.method == Method::GET => {
                match category
                    .parse::<Category>()
                    .ok()
                    .and_then(|c| self.get(c, module))
                {
                    Some(handler) => render_page(handler.as_ref()),
                    None => not_found_page(),
                }
            }
            _ => failure(StatusCode::NOT_FOUND, "Not found"),
        }
    }
}

#[async_trait]
impl Transport for Registry {
    async fn send(&self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
        Ok(self.dispatch(&request))
    }
}
