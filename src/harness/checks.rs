use http::{Method, StatusCode};
use regex::Regex;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::envelope::Envelope;
use super::transport::{ProbeRequest, Transport};
use crate::errors::ProbeError;
use crate::scoring::Category;

pub const CREATE_NAME: &str = "Test Item";
pub const CREATE_DESCRIPTION: &str = "Automated test item";
pub const CREATE_PRICE: f64 = 9.99;
pub const CREATE_QUANTITY: i64 = 10;
pub const UPDATED_PRICE: f64 = 19.99;
pub const UPDATED_QUANTITY: i64 = 5;
pub const XSS_NAME: &str = "<script>alert(1)</script>";
pub const RAW_SCRIPT_TAG: &str = "<script>";
pub const INVALID_ID: &str = "not-a-valid-id";

/// Issues the rubric's HTTP probes against one module.
///
/// Each method is one check. `Err` means the probe could not be evaluated;
/// callers score that as a failed check.
pub struct Prober<'a> {
    transport: &'a dyn Transport,
    category: Category,
    module: &'a str,
}

impl<'a> Prober<'a> {
    pub fn new(transport: &'a dyn Transport, category: Category, module: &'a str) -> Self {
        Self {
            transport,
            category,
            module,
        }
    }

    fn collection(&self, method: Method) -> ProbeRequest {
        ProbeRequest::new(method, &["api", self.category.as_str(), self.module])
    }

    fn item(&self, method: Method, id: &str) -> ProbeRequest {
        ProbeRequest::new(method, &["api", self.category.as_str(), self.module, id])
    }

    /// UI route answers 2xx with an HTML content type.
    pub async fn page_renders(&self) -> Result<bool, ProbeError> {
        let request = ProbeRequest::get(&[self.category.as_str(), self.module]);
        let response = self.transport.send(request).await?;
        Ok(response.is_success() && response.is_html())
    }

    /// Collection GET answers 2xx with `success` and an array payload.
    pub async fn list(&self) -> Result<bool, ProbeError> {
        let response = self.transport.send(self.collection(Method::GET)).await?;
        if !response.is_success() {
            return Ok(false);
        }
        let envelope = response.envelope()?;
        Ok(envelope.success && envelope.data_is_array())
    }

    /// POST a well-formed record. Returns the generated id on a 201 with
    /// `success` and `data._id`.
    pub async fn create(&self) -> Result<Option<String>, ProbeError> {
        let request = self.collection(Method::POST).with_json(json!({
            "name": CREATE_NAME,
            "description": CREATE_DESCRIPTION,
            "price": CREATE_PRICE,
            "inStock": true,
            "quantity": CREATE_QUANTITY,
        }));
        let response = self.transport.send(request).await?;
        if response.status != StatusCode::CREATED {
            return Ok(None);
        }
        let envelope = response.envelope()?;
        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope.record_id().map(str::to_string))
    }

    /// GET by id returns the same record.
    pub async fn get_by_id(&self, id: &str) -> Result<bool, ProbeError> {
        let response = self.transport.send(self.item(Method::GET, id)).await?;
        if !response.is_success() {
            return Ok(false);
        }
        let envelope = response.envelope()?;
        Ok(envelope.success && envelope.record_id() == Some(id))
    }

    /// PUT a two-field partial change. Both the PUT response and a fresh read
    /// must show the new values with `name` untouched.
    pub async fn update(&self, id: &str) -> Result<bool, ProbeError> {
        let request = self.item(Method::PUT, id).with_json(json!({
            "price": UPDATED_PRICE,
            "quantity": UPDATED_QUANTITY,
        }));
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Ok(false);
        }
        if !reflects_update(&response.envelope()?) {
            return Ok(false);
        }

        let reread = self.transport.send(self.item(Method::GET, id)).await?;
        if !reread.is_success() {
            return Ok(false);
        }
        Ok(reflects_update(&reread.envelope()?))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ProbeError> {
        let response = self.transport.send(self.item(Method::DELETE, id)).await?;
        if !response.is_success() {
            return Ok(false);
        }
        Ok(response.envelope()?.success)
    }

    pub async fn rejects_empty_name(&self) -> Result<bool, ProbeError> {
        self.expect_bad_request(json!({ "name": "", "price": 10 })).await
    }

    pub async fn rejects_negative_price(&self) -> Result<bool, ProbeError> {
        self.expect_bad_request(json!({ "name": "Test", "price": -5 })).await
    }

    /// A script-tag name is either rejected with 400 or stored without the raw tag.
    pub async fn contains_xss(&self) -> Result<bool, ProbeError> {
        let request = self
            .collection(Method::POST)
            .with_json(json!({ "name": XSS_NAME, "price": 10 }));
        let response = self.transport.send(request).await?;
        match response.status {
            StatusCode::BAD_REQUEST => Ok(true),
            StatusCode::CREATED => {
                let envelope = response.envelope()?;
                match envelope.str_field("name") {
                    Some(name) => Ok(!name.contains(RAW_SCRIPT_TAG)),
                    None => Err(ProbeError::Envelope(
                        "created record has no readable name".to_string(),
                    )),
                }
            }
            _ => Ok(false),
        }
    }

    /// A syntactically invalid id must be a 400, not a 404 or 500.
    pub async fn rejects_invalid_id(&self) -> Result<bool, ProbeError> {
        let response = self.transport.send(self.item(Method::GET, INVALID_ID)).await?;
        Ok(response.status == StatusCode::BAD_REQUEST)
    }

    async fn expect_bad_request(&self, body: serde_json::Value) -> Result<bool, ProbeError> {
        let request = self.collection(Method::POST).with_json(body);
        let response = self.transport.send(request).await?;
        Ok(response.status == StatusCode::BAD_REQUEST)
    }
}

fn reflects_update(envelope: &Envelope) -> bool {
    envelope.success
        && envelope.f64_field("price") == Some(UPDATED_PRICE)
        && envelope.f64_field("quantity") == Some(UPDATED_QUANTITY as f64)
        && envelope.str_field("name") == Some(CREATE_NAME)
}

/// Count escape-hatch annotations across a module's source files.
///
/// `files` are names or glob patterns relative to `module_dir`. Missing or
/// unreadable files contribute nothing; a file matched by several patterns is
/// counted once.
pub fn count_escape_hatches(module_dir: &Path, files: &[String], pattern: &Regex) -> usize {
    let escaped_dir = glob::Pattern::escape(&module_dir.to_string_lossy());
    let mut paths: BTreeSet<PathBuf> = BTreeSet::new();

    for file in files {
        let full = format!("{}/{}", escaped_dir.trim_end_matches('/'), file);
        match glob::glob(&full) {
            Ok(matches) => paths.extend(matches.filter_map(Result::ok).filter(|p| p.is_file())),
            Err(e) => tracing::debug!(pattern = %file, error = %e, "skipping bad file pattern"),
        }
    }

    paths
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|content| pattern.find_iter(&content).count())
        .sum()
}
