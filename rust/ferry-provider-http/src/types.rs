//! Request configurations decoded from bucketed arguments, and the plain
//! result records handed back to scripts.

use ferry_core::{AsyncArgs, TypedResult};
use serde::Deserialize;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Client-wide defaults. Per-call timeouts override `timeout_ms` when they
/// are positive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_ms: u64,
    pub follow_redirects: bool,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            follow_redirects: true,
            user_agent: format!("ferry/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A positive millisecond count, or `None` to use the client default.
fn timeout_from(ms: f64) -> Option<Duration> {
    (ms > 0.0).then(|| Duration::from_millis(ms as u64))
}

/// Consecutive strings read as key/value pairs; a trailing odd key is
/// dropped.
fn pairs(strings: &[String]) -> Vec<(String, String)> {
    strings
        .chunks_exact(2)
        .map(|kv| (kv[0].clone(), kv[1].clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Unknown names fall back to `GET`.
    pub fn parse(name: &str) -> Self {
        match name {
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Get,
        }
    }

    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
}

impl RequestConfig {
    /// Strings are `[url, method, k1, v1, ..., body?]`. With no buffer
    /// argument, an odd number of strings after the method means the last
    /// one is a text body.
    pub fn from_args(args: &AsyncArgs) -> Result<Self, ferry_core::CallError> {
        let url = args.str(0)?.to_string();
        let method = HttpMethod::parse(args.str(1)?);
        let mut rest = args.strings_from(2);
        let mut body = args.buffers.first().cloned();
        if body.is_none() && rest.len() % 2 == 1 {
            if let Some((text, head)) = rest.split_last() {
                body = Some(text.clone().into_bytes());
                rest = head;
            }
        }
        Ok(Self {
            url,
            method,
            headers: pairs(rest),
            body,
            timeout: timeout_from(args.num_or(0, 0.0)),
            follow_redirects: args.bool_or(0, true),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub success: bool,
    pub status_code: u16,
    pub status_message: String,
    pub url: String,
    pub error_message: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    pub fn failure(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            error_message: message.into(),
            ..Self::default()
        }
    }
}

impl From<HttpResponse> for TypedResult {
    fn from(r: HttpResponse) -> Self {
        let (keys, values): (Vec<String>, Vec<String>) = r.headers.into_iter().unzip();
        TypedResult::map([
            ("success", r.success.into()),
            ("statusCode", u32::from(r.status_code).into()),
            ("statusMessage", r.status_message.into()),
            ("url", r.url.into()),
            ("errorMessage", r.error_message.into()),
            ("body", r.body.into()),
            ("headerKeys", keys.into()),
            ("headerValues", values.into()),
        ])
    }
}

// ---------------------------------------------------------------------------
// download
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    pub url: String,
    pub destination: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub resumable: bool,
}

impl DownloadConfig {
    /// Strings are `[url, destination, k1, v1, ...]`.
    pub fn from_args(args: &AsyncArgs) -> Result<Self, ferry_core::CallError> {
        Ok(Self {
            url: args.str(0)?.to_string(),
            destination: args.str(1)?.to_string(),
            headers: pairs(args.strings_from(2)),
            timeout: timeout_from(args.num_or(0, 0.0)),
            resumable: args.bool_or(0, false),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadResult {
    pub success: bool,
    pub status_code: u16,
    pub file_path: String,
    pub file_size: u64,
    pub error_message: String,
}

impl From<DownloadResult> for TypedResult {
    fn from(r: DownloadResult) -> Self {
        TypedResult::map([
            ("success", r.success.into()),
            ("statusCode", u32::from(r.status_code).into()),
            ("filePath", r.file_path.into()),
            ("fileSize", r.file_size.into()),
            ("errorMessage", r.error_message.into()),
        ])
    }
}

// ---------------------------------------------------------------------------
// upload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub url: String,
    pub file_path: String,
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub headers: Vec<(String, String)>,
    pub form_fields: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl UploadConfig {
    /// Strings are `[url, filePath, fieldName, fileName, mimeType,
    /// headers (2 * headerCount), formKeys, formValues]`; numbers are
    /// `[timeout, headerCount, formFieldCount]`.
    pub fn from_args(args: &AsyncArgs) -> Result<Self, ferry_core::CallError> {
        // Counts come from the script; no count can exceed the strings on hand.
        let available = args.strings.len();
        let header_count = count_arg(args, 1, available);
        let form_count = count_arg(args, 2, available);

        let header_strings = args.strings_from(5);
        let header_len = header_count.saturating_mul(2).min(header_strings.len());
        let header_strings = &header_strings[..header_len];

        let form_strings = args.strings_from(5 + header_len);
        let form_fields = (0..form_count)
            .filter_map(|i| {
                let key = form_strings.get(i)?;
                let value = form_strings.get(form_count + i)?;
                Some((key.clone(), value.clone()))
            })
            .collect();

        let field_name = args.str_or(2, "");
        Ok(Self {
            url: args.str(0)?.to_string(),
            file_path: args.str(1)?.to_string(),
            field_name: if field_name.is_empty() { "file" } else { field_name }.to_string(),
            file_name: args.str_or(3, "").to_string(),
            mime_type: args.str_or(4, "").to_string(),
            headers: pairs(header_strings),
            form_fields,
            timeout: timeout_from(args.num_or(0, 0.0)),
        })
    }
}

fn count_arg(args: &AsyncArgs, index: usize, limit: usize) -> usize {
    let n = args.num_or(index, 0.0);
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        (n as usize).min(limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadResult {
    pub success: bool,
    pub status_code: u16,
    pub response_body: Vec<u8>,
    pub error_message: String,
}

impl From<UploadResult> for TypedResult {
    fn from(r: UploadResult) -> Self {
        TypedResult::map([
            ("success", r.success.into()),
            ("statusCode", u32::from(r.status_code).into()),
            ("responseBody", r.response_body.into()),
            ("errorMessage", r.error_message.into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn odd_trailing_string_is_the_body() {
        let args = AsyncArgs::new()
            .with_text("http://h/x")
            .with_text("POST")
            .with_text_list(["accept", "text/plain"])
            .with_text("payload")
            .with_number(500.0)
            .with_bool(false);
        let config = RequestConfig::from_args(&args).unwrap();
        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.headers, vec![kv("accept", "text/plain")]);
        assert_eq!(config.body.as_deref(), Some(&b"payload"[..]));
        assert_eq!(config.timeout, Some(Duration::from_millis(500)));
        assert!(!config.follow_redirects);
    }

    #[test]
    fn buffer_body_wins_and_even_strings_are_headers() {
        let args = AsyncArgs::new()
            .with_text("http://h/x")
            .with_text("PUT")
            .with_text_list(["a", "1", "b"])
            .with_buffer(vec![1, 2]);
        let config = RequestConfig::from_args(&args).unwrap();
        assert_eq!(config.body, Some(vec![1, 2]));
        assert_eq!(config.headers, vec![kv("a", "1")]);
        assert_eq!(config.timeout, None);
        assert!(config.follow_redirects);
    }

    #[test]
    fn unknown_methods_default_to_get() {
        assert_eq!(HttpMethod::parse("BREW"), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("get"), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("OPTIONS"), HttpMethod::Options);
    }

    #[test]
    fn request_without_url_is_rejected() {
        let err = RequestConfig::from_args(&AsyncArgs::new()).unwrap_err();
        assert_eq!(err.to_string(), "missing string argument at position 0");
    }

    #[test]
    fn upload_splits_headers_and_form_fields_by_count() {
        let args = AsyncArgs::new()
            .with_text("http://h/up")
            .with_text("/tmp/f.bin")
            .with_text("")
            .with_text("f.bin")
            .with_text("application/octet-stream")
            .with_text_list(["x-token", "t"])
            .with_text_list(["k1", "k2"])
            .with_text_list(["v1", "v2"])
            .with_number(0.0)
            .with_number(1.0)
            .with_number(2.0);
        let config = UploadConfig::from_args(&args).unwrap();
        assert_eq!(config.field_name, "file");
        assert_eq!(config.headers, vec![kv("x-token", "t")]);
        assert_eq!(config.form_fields, vec![kv("k1", "v1"), kv("k2", "v2")]);
    }

    #[test]
    fn oversized_upload_counts_are_clamped() {
        let base = || {
            AsyncArgs::new()
                .with_text("http://h/up")
                .with_text("/tmp/f.bin")
                .with_text("data")
                .with_text("")
                .with_text("")
                .with_text_list(["a", "1", "k", "v"])
                .with_number(0.0)
        };

        let args = base().with_number(1e300).with_number(1.0);
        let config = UploadConfig::from_args(&args).unwrap();
        assert_eq!(config.headers, vec![kv("a", "1"), kv("k", "v")]);
        assert!(config.form_fields.is_empty());

        let args = base().with_number(0.0).with_number(f64::INFINITY);
        let config = UploadConfig::from_args(&args).unwrap();
        assert!(config.headers.is_empty());
        assert!(config.form_fields.is_empty());
        assert_eq!(config.field_name, "data");
    }

    #[test]
    fn response_record_lists_headers_in_parallel_arrays() {
        let result: TypedResult = HttpResponse {
            success: true,
            status_code: 200,
            headers: vec![kv("a", "1"), kv("b", "2")],
            ..HttpResponse::default()
        }
        .into();
        let keys = result.get("headerKeys").and_then(TypedResult::as_list).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1].as_text(), Some("b"));
        assert_eq!(result.get("statusCode").and_then(TypedResult::as_number), Some(200.0));
    }
}
