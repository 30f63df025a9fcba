//! Blocking HTTP transport used from worker threads.

use crate::error::HttpError;
use crate::types::{
    DownloadConfig, DownloadResult, HttpResponse, HttpSettings, RequestConfig, UploadConfig,
    UploadResult,
};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::RANGE;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;

/// Two clients share the settings: one follows redirects, one does not.
#[derive(Debug, Clone)]
pub struct HttpClient {
    follow: Client,
    no_follow: Client,
    settings: HttpSettings,
}

fn parse_url(url: &str) -> Result<Url, String> {
    Url::parse(url).map_err(|e| format!("Invalid URL '{}': {}", url, e))
}

fn with_common(
    mut req: RequestBuilder,
    headers: &[(String, String)],
    timeout: Option<Duration>,
) -> RequestBuilder {
    for (key, value) in headers {
        req = req.header(key.as_str(), value.as_str());
    }
    if let Some(timeout) = timeout {
        req = req.timeout(timeout);
    }
    req
}

impl HttpClient {
    pub fn new(settings: HttpSettings) -> Result<Self, HttpError> {
        let build = |policy: Policy| {
            Client::builder()
                .timeout(settings.timeout())
                .user_agent(settings.user_agent.as_str())
                .redirect(policy)
                .build()
        };
        let follow = build(Policy::limited(MAX_REDIRECTS))?;
        let no_follow = build(Policy::none())?;
        Ok(Self {
            follow,
            no_follow,
            settings,
        })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    // -- request --------------------------------------------------------------

    /// Any response counts as success, whatever its status. Only transport
    /// failures set `success: false`.
    pub fn request(&self, config: &RequestConfig) -> HttpResponse {
        let url = match parse_url(&config.url) {
            Ok(url) => url,
            Err(message) => return HttpResponse::failure(&config.url, message),
        };
        let follow = config.follow_redirects && self.settings.follow_redirects;
        let client = if follow { &self.follow } else { &self.no_follow };

        tracing::debug!(method = ?config.method, url = %url, "http request");
        let mut req = with_common(
            client.request(config.method.as_reqwest(), url),
            &config.headers,
            config.timeout,
        );
        if let Some(body) = &config.body {
            req = req.body(body.clone());
        }

        let response = match req.send() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %config.url, error = %e, "http request failed");
                return HttpResponse::failure(&config.url, format!("HTTP request failed: {}", e));
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        match response.bytes() {
            Ok(body) => {
                tracing::debug!(status = status.as_u16(), bytes = body.len(), "http response");
                HttpResponse {
                    success: true,
                    status_code: status.as_u16(),
                    status_message: status.canonical_reason().unwrap_or_default().to_string(),
                    url: final_url,
                    error_message: String::new(),
                    body: body.to_vec(),
                    headers,
                }
            }
            Err(e) => HttpResponse {
                status_code: status.as_u16(),
                ..HttpResponse::failure(&final_url, format!("Failed to read response body: {}", e))
            },
        }
    }

    // -- download -------------------------------------------------------------

    /// Stream the body to `destination`. A resumable download of a partial
    /// file asks for the remaining range and appends when the server answers
    /// 206; a 200 rewrites the file from the start.
    pub fn download(&self, config: &DownloadConfig) -> DownloadResult {
        let mut result = DownloadResult {
            file_path: config.destination.clone(),
            ..DownloadResult::default()
        };
        let url = match parse_url(&config.url) {
            Ok(url) => url,
            Err(message) => {
                result.error_message = message;
                return result;
            }
        };

        let existing = if config.resumable {
            fs::metadata(&config.destination).map(|m| m.len()).unwrap_or(0)
        } else {
            0
        };

        let mut req = with_common(self.follow.get(url), &config.headers, config.timeout);
        if existing > 0 {
            req = req.header(RANGE, format!("bytes={}-", existing));
        }

        tracing::debug!(url = %config.url, dest = %config.destination, resume_from = existing, "http download");
        let mut response = match req.send() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %config.url, error = %e, "http download failed");
                result.error_message = format!("HTTP request failed: {}", e);
                return result;
            }
        };

        let status = response.status().as_u16();
        result.status_code = status;
        if status != 200 && status != 206 {
            result.error_message = format!("HTTP error: {}", status);
            return result;
        }

        let append = status == 206 && existing > 0;
        match write_body(&mut response, &config.destination, append) {
            Ok(size) => {
                result.success = true;
                result.file_size = size;
            }
            Err(e) => {
                result.error_message =
                    format!("Failed to write file {}: {}", config.destination, e);
            }
        }
        result
    }

    // -- upload ---------------------------------------------------------------

    /// Multipart POST of one file plus text form fields. Success means a
    /// 2xx status.
    pub fn upload(&self, config: &UploadConfig) -> UploadResult {
        let mut result = UploadResult::default();
        let url = match parse_url(&config.url) {
            Ok(url) => url,
            Err(message) => {
                result.error_message = message;
                return result;
            }
        };
        if !Path::new(&config.file_path).is_file() {
            result.error_message = format!("File not found: {}", config.file_path);
            return result;
        }

        let form = match build_form(config) {
            Ok(form) => form,
            Err(message) => {
                result.error_message = message;
                return result;
            }
        };

        tracing::debug!(url = %config.url, file = %config.file_path, "http upload");
        let req = with_common(self.follow.post(url), &config.headers, config.timeout).multipart(form);
        let response = match req.send() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %config.url, error = %e, "http upload failed");
                result.error_message = format!("HTTP request failed: {}", e);
                return result;
            }
        };

        let status = response.status();
        result.status_code = status.as_u16();
        result.success = status.is_success();
        if !result.success {
            result.error_message = format!("HTTP error: {}", status.as_u16());
        }
        match response.bytes() {
            Ok(body) => result.response_body = body.to_vec(),
            Err(e) => {
                result.success = false;
                result.error_message = format!("Failed to read response body: {}", e);
            }
        }
        result
    }
}

fn write_body(body: &mut impl io::Read, destination: &str, append: bool) -> io::Result<u64> {
    if let Some(parent) = Path::new(destination).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut options = OpenOptions::new();
    if append {
        options.append(true);
    } else {
        options.write(true).create(true).truncate(true);
    }
    let mut file = options.open(destination)?;
    io::copy(body, &mut file)?;
    Ok(fs::metadata(destination)?.len())
}

fn build_form(config: &UploadConfig) -> Result<Form, String> {
    let mut part = Part::file(&config.file_path)
        .map_err(|e| format!("Cannot read file {}: {}", config.file_path, e))?;
    if !config.file_name.is_empty() {
        part = part.file_name(config.file_name.clone());
    }
    if !config.mime_type.is_empty() {
        part = part
            .mime_str(&config.mime_type)
            .map_err(|e| format!("Invalid MIME type '{}': {}", config.mime_type, e))?;
    }

    let mut form = Form::new();
    for (key, value) in &config.form_fields {
        form = form.text(key.clone(), value.clone());
    }
    Ok(form.part(config.field_name.clone(), part))
}
