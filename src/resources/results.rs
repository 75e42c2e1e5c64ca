//! `/model-results`: stored execution results.

use super::MODEL_RESULTS;
use crate::config::RequestOptions;
use crate::error::{Error, Result};
use crate::transport::AsyncTransport;
use crate::types::{ListParams, ModelResultInfo, ModelResultMasked, ResultId};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::Method;

/// Async client for the model results collection.
#[derive(Debug, Clone)]
pub struct AsyncResultsClient {
    transport: AsyncTransport,
    options: Option<RequestOptions>,
}

impl AsyncResultsClient {
    pub(crate) fn new(transport: AsyncTransport) -> Self {
        Self {
            transport,
            options: None,
        }
    }

    /// Copy of this client that applies `options` to every call.
    #[must_use]
    pub fn with_options(&self, options: RequestOptions) -> Self {
        Self {
            transport: self.transport.clone(),
            options: Some(options),
        }
    }

    /// List the caller's results, without input file details.
    pub async fn list(&self, params: ListParams) -> Result<Vec<ModelResultMasked>> {
        let request = self.transport.request(
            Method::GET,
            &[MODEL_RESULTS],
            &params.query(),
            self.options.as_ref(),
        )?;
        self.transport.send_json(request).await
    }

    /// Fetch one result.
    pub async fn info(&self, id: ResultId) -> Result<ModelResultInfo> {
        let id = id.to_string();
        let request = self.transport.request(
            Method::GET,
            &[MODEL_RESULTS, id.as_str()],
            &[],
            self.options.as_ref(),
        )?;
        self.transport.send_json(request).await
    }

    /// Delete one result. Later lookups of `id` fail with
    /// [`Error::NotFound`].
    pub async fn delete(&self, id: ResultId) -> Result<()> {
        let id = id.to_string();
        let request = self.transport.request(
            Method::DELETE,
            &[MODEL_RESULTS, id.as_str()],
            &[],
            self.options.as_ref(),
        )?;
        self.transport.send_empty(request).await
    }

    /// Stream the result archive (a ZIP file) chunk by chunk.
    ///
    /// Error statuses are reported here, before any chunk is produced.
    /// Dropping the stream releases the connection.
    pub async fn download(&self, id: ResultId) -> Result<BoxStream<'static, Result<Bytes>>> {
        let id = id.to_string();
        let request = self.transport.request(
            Method::GET,
            &[MODEL_RESULTS, id.as_str(), "download"],
            &[],
            self.options.as_ref(),
        )?;
        let response = self.transport.send(request).await?;
        Ok(response.bytes_stream().map_err(Error::from).boxed())
    }

    /// Download the whole result archive into memory.
    pub async fn download_bytes(&self, id: ResultId) -> Result<Vec<u8>> {
        let mut stream = self.download(id).await?;
        let mut archive = Vec::new();
        while let Some(chunk) = stream.try_next().await? {
            archive.extend_from_slice(&chunk);
        }
        Ok(archive)
    }
}

#[cfg(feature = "blocking")]
pub use blocking::{ResultDownload, ResultsClient};

#[cfg(feature = "blocking")]
mod blocking {
    use super::MODEL_RESULTS;
    use crate::config::RequestOptions;
    use crate::error::{Error, Result};
    use crate::transport::BlockingTransport;
    use crate::types::{ListParams, ModelResultInfo, ModelResultMasked, ResultId};
    use reqwest::Method;
    use std::io::{self, Read};

    const CHUNK_SIZE: usize = 64 * 1024;

    /// Blocking client for the model results collection.
    #[derive(Debug, Clone)]
    pub struct ResultsClient {
        transport: BlockingTransport,
        options: Option<RequestOptions>,
    }

    impl ResultsClient {
        pub(crate) fn new(transport: BlockingTransport) -> Self {
            Self {
                transport,
                options: None,
            }
        }

        /// Copy of this client that applies `options` to every call.
        #[must_use]
        pub fn with_options(&self, options: RequestOptions) -> Self {
            Self {
                transport: self.transport.clone(),
                options: Some(options),
            }
        }

        /// List the caller's results, without input file details.
        pub fn list(&self, params: ListParams) -> Result<Vec<ModelResultMasked>> {
            let request = self.transport.request(
                Method::GET,
                &[MODEL_RESULTS],
                &params.query(),
                self.options.as_ref(),
            )?;
            self.transport.send_json(request)
        }

        /// Fetch one result.
        pub fn info(&self, id: ResultId) -> Result<ModelResultInfo> {
            let id = id.to_string();
            let request = self.transport.request(
                Method::GET,
                &[MODEL_RESULTS, id.as_str()],
                &[],
                self.options.as_ref(),
            )?;
            self.transport.send_json(request)
        }

        /// Delete one result.
        pub fn delete(&self, id: ResultId) -> Result<()> {
            let id = id.to_string();
            let request = self.transport.request(
                Method::DELETE,
                &[MODEL_RESULTS, id.as_str()],
                &[],
                self.options.as_ref(),
            )?;
            self.transport.send_empty(request)
        }

        /// Open the result archive (a ZIP file) for chunked reading.
        ///
        /// Error statuses are reported here, before any chunk is read.
        pub fn download(&self, id: ResultId) -> Result<ResultDownload> {
            let id = id.to_string();
            let request = self.transport.request(
                Method::GET,
                &[MODEL_RESULTS, id.as_str(), "download"],
                &[],
                self.options.as_ref(),
            )?;
            let response = self.transport.send(request)?;
            Ok(ResultDownload {
                response,
                done: false,
            })
        }

        /// Download the whole result archive into memory.
        pub fn download_bytes(&self, id: ResultId) -> Result<Vec<u8>> {
            self.download(id)?.into_bytes()
        }
    }

    /// Body of a result download.
    ///
    /// Iterating yields chunks of up to 64 KiB; it also implements [`Read`].
    /// Not seekable. Dropping it releases the connection.
    #[derive(Debug)]
    pub struct ResultDownload {
        response: reqwest::blocking::Response,
        done: bool,
    }

    impl ResultDownload {
        /// Size announced by the server, if any.
        #[must_use]
        pub fn content_length(&self) -> Option<u64> {
            self.response.content_length()
        }

        /// Read the remaining body into memory.
        pub fn into_bytes(mut self) -> Result<Vec<u8>> {
            let mut archive = Vec::new();
            self.read_to_end(&mut archive)?;
            Ok(archive)
        }
    }

    impl Iterator for ResultDownload {
        type Item = Result<Vec<u8>>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.done {
                return None;
            }
            let mut chunk = vec![0; CHUNK_SIZE];
            loop {
                match self.response.read(&mut chunk) {
                    Ok(0) => {
                        self.done = true;
                        return None;
                    }
                    Ok(n) => {
                        chunk.truncate(n);
                        return Some(Ok(chunk));
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(Error::Io(err)));
                    }
                }
            }
        }
    }

    impl Read for ResultDownload {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.done {
                return Ok(0);
            }
            self.response.read(buf)
        }
    }
}
