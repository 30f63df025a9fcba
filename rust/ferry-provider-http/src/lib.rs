//! HTTP provider for Ferry host objects.
//!
//! [`HttpModule`] installs the `http` object with a `version` property and
//! three async methods:
//! - `request(url, method, headers[], body?, timeout, followRedirects)`
//! - `download(url, destinationPath, headers[], timeout, resumable)`
//! - `upload(url, filePath, fieldName, fileName, mimeType, headers[],
//!   formKeys[], formValues[], timeout, headerCount, formFieldCount)`
//!
//! Requests run on worker threads through a blocking `reqwest` client.
//! Network failures resolve with `success: false`; malformed arguments
//! reject.

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpClient;
pub use error::HttpError;
pub use types::{
    DownloadConfig, DownloadResult, HttpMethod, HttpResponse, HttpSettings, RequestConfig,
    UploadConfig, UploadResult,
};

use ferry_core::Engine;
use ferry_runtime::{HostModule, HostObjectBuilder};
use std::sync::Arc;

pub const VERSION: &str = "1.0.0";

#[derive(Debug, Clone)]
pub struct HttpModule {
    client: Arc<HttpClient>,
}

impl HttpModule {
    pub fn new(settings: HttpSettings) -> Result<Self, HttpError> {
        Ok(Self {
            client: Arc::new(HttpClient::new(settings)?),
        })
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

impl<E: Engine> HostModule<E> for HttpModule {
    fn name(&self) -> &str {
        "http"
    }

    fn install(&self, builder: &mut HostObjectBuilder<E>) {
        builder.constant("version", VERSION);

        let client = Arc::clone(&self.client);
        builder.asynchronous("request", 6, move |args| {
            let config = RequestConfig::from_args(args)?;
            Ok(client.request(&config).into())
        });

        let client = Arc::clone(&self.client);
        builder.asynchronous("download", 5, move |args| {
            let config = DownloadConfig::from_args(args)?;
            Ok(client.download(&config).into())
        });

        let client = Arc::clone(&self.client);
        builder.asynchronous("upload", 11, move |args| {
            let config = UploadConfig::from_args(args)?;
            Ok(client.upload(&config).into())
        });
    }
}
