//! Request preparation, sending and status dispatch.
//!
//! Both client flavours share [`Endpoint`] for URL, header and credential
//! handling and the status dispatch functions. They differ only in the
//! `reqwest` client they send through.

use crate::config::{ClientConfig, RequestOptions, SDK_NAME, SDK_VERSION, USER_AGENT};
use crate::credential::{authorization_header, Credential};
use crate::error::{ApiBody, Error, Result};
use crate::types::HttpValidationError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// Request preparation
// ============================================================================

/// Everything needed to issue one request.
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) timeout: Option<Duration>,
}

/// Base URL, credential and staging settings shared by all requests.
#[derive(Debug)]
pub(crate) struct Endpoint {
    base: Url,
    credential: Option<Credential>,
    temp_dir: Option<PathBuf>,
}

impl Endpoint {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self> {
        let raw = config.resolved_base_url();
        let base = Url::parse(raw)
            .map_err(|e| Error::Config(format!("invalid base URL {raw:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("{raw:?} cannot be used as a base URL")));
        }
        Ok(Self {
            base,
            credential: config.credential.clone(),
            temp_dir: config.temp_dir.clone(),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub(crate) fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Resolve the credential and build URL, headers and timeout.
    ///
    /// Fails before anything touches the network if the credential is
    /// unusable.
    pub(crate) fn prepare(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        options: Option<&RequestOptions>,
    ) -> Result<PreparedRequest> {
        let mut headers = sdk_headers();
        headers.insert(AUTHORIZATION, authorization_header(self.credential.as_ref())?);

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config(format!("{} cannot be used as a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);

        let extra_query = options.map_or(&[][..], |o| &o.additional_query_parameters[..]);
        if !query.is_empty() || !extra_query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
            for (name, value) in extra_query {
                pairs.append_pair(name, value);
            }
        }

        if let Some(options) = options {
            for (name, value) in &options.additional_headers {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| Error::Config(format!("invalid header name {name:?}: {e}")))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| Error::Config(format!("invalid value for header {name}: {e}")))?;
                headers.insert(name, value);
            }
        }

        Ok(PreparedRequest {
            method,
            url,
            headers,
            timeout: options.and_then(|o| o.timeout),
        })
    }
}

fn sdk_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-fern-language", HeaderValue::from_static("Rust"));
    headers.insert("x-fern-sdk-name", HeaderValue::from_static(SDK_NAME));
    headers.insert("x-fern-sdk-version", HeaderValue::from_static(SDK_VERSION));
    headers
}

// ============================================================================
// Status dispatch
// ============================================================================

/// Map a non-2xx response to an error.
///
/// 403, 404 and 422 get their own variants when the body decodes; anything
/// else, including a body that does not decode, becomes [`Error::Api`].
pub(crate) fn error_for_status(status: StatusCode, body: &[u8]) -> Error {
    let code = status.as_u16();
    match code {
        403 => match optional_json(body) {
            Some(body) => Error::Forbidden { body },
            None => Error::Api {
                status: code,
                body: ApiBody::text(body),
            },
        },
        404 => match optional_json(body) {
            Some(body) => Error::NotFound { body },
            None => Error::Api {
                status: code,
                body: ApiBody::text(body),
            },
        },
        422 => match serde_json::from_slice::<HttpValidationError>(body) {
            Ok(details) => Error::ValidationFailed(details),
            Err(_) => Error::Api {
                status: code,
                body: ApiBody::from_bytes(body),
            },
        },
        _ => Error::Api {
            status: code,
            body: ApiBody::from_bytes(body),
        },
    }
}

/// `Some(None)` for an empty or `null` body, `None` if it is not JSON.
fn optional_json(body: &[u8]) -> Option<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Some(None);
    }
    serde_json::from_slice::<Option<Value>>(body).ok()
}

/// Decode a 2xx body; an undecodable body is reported with its raw text.
pub(crate) fn decode_success<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| {
        debug!(%status, error = %err, "response body did not match the expected shape");
        Error::Api {
            status: status.as_u16(),
            body: ApiBody::text(body),
        }
    })
}

// ============================================================================
// Async transport
// ============================================================================

/// Sends requests through an async `reqwest::Client`.
#[derive(Debug, Clone)]
pub(crate) struct AsyncTransport {
    endpoint: Arc<Endpoint>,
    http: reqwest::Client,
}

impl AsyncTransport {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self> {
        let http = match &config.http_client {
            Some(client) => client.clone(),
            None => {
                let mut builder = reqwest::Client::builder()
                    .user_agent(USER_AGENT)
                    .redirect(redirect_policy(config.follow_redirects));
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                builder
                    .build()
                    .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?
            }
        };
        Ok(Self {
            endpoint: Arc::new(Endpoint::new(config)?),
            http,
        })
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        options: Option<&RequestOptions>,
    ) -> Result<reqwest::RequestBuilder> {
        let prepared = self.endpoint.prepare(method, segments, query, options)?;
        debug!(method = %prepared.method, url = %prepared.url, "sending request");
        let mut builder = self
            .http
            .request(prepared.method, prepared.url)
            .headers(prepared.headers);
        if let Some(timeout) = prepared.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }

    /// Send and return the response if its status is 2xx.
    pub(crate) async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(%status, url = %response.url(), "received response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await?;
        Err(error_for_status(status, &body))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self.send(builder).await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode_success(status, &body)
    }

    pub(crate) async fn send_empty(&self, builder: reqwest::RequestBuilder) -> Result<()> {
        self.send(builder).await?;
        Ok(())
    }
}

// ============================================================================
// Blocking transport
// ============================================================================

/// Sends requests through a `reqwest::blocking::Client`.
#[cfg(feature = "blocking")]
#[derive(Debug, Clone)]
pub(crate) struct BlockingTransport {
    endpoint: Arc<Endpoint>,
    http: reqwest::blocking::Client,
}

#[cfg(feature = "blocking")]
impl BlockingTransport {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self> {
        let http = match &config.blocking_http_client {
            Some(client) => client.clone(),
            None => reqwest::blocking::Client::builder()
                .user_agent(USER_AGENT)
                .redirect(redirect_policy(config.follow_redirects))
                .timeout(config.timeout)
                .build()
                .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?,
        };
        Ok(Self {
            endpoint: Arc::new(Endpoint::new(config)?),
            http,
        })
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub(crate) fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        options: Option<&RequestOptions>,
    ) -> Result<reqwest::blocking::RequestBuilder> {
        let prepared = self.endpoint.prepare(method, segments, query, options)?;
        debug!(method = %prepared.method, url = %prepared.url, "sending request");
        let mut builder = self
            .http
            .request(prepared.method, prepared.url)
            .headers(prepared.headers);
        if let Some(timeout) = prepared.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }

    pub(crate) fn send(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let response = builder.send()?;
        let status = response.status();
        debug!(%status, url = %response.url(), "received response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes()?;
        Err(error_for_status(status, &body))
    }

    pub(crate) fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> Result<T> {
        let response = self.send(builder)?;
        let status = response.status();
        let body = response.bytes()?;
        decode_success(status, &body)
    }

    pub(crate) fn send_empty(&self, builder: reqwest::blocking::RequestBuilder) -> Result<()> {
        self.send(builder)?;
        Ok(())
    }
}

fn redirect_policy(follow: bool) -> reqwest::redirect::Policy {
    if follow {
        reqwest::redirect::Policy::default()
    } else {
        reqwest::redirect::Policy::none()
    }
}
