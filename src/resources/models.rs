//! `/models`: catalogue lookup and model execution.

use super::MODELS;
use crate::config::RequestOptions;
use crate::error::Result;
use crate::transport::AsyncTransport;
use crate::types::{ListParams, ModelInfo, ModelResultInfo};
use crate::upload::{ExecuteRequest, StagedUpload, UploadBody, FILE_FIELD, UPLOAD_MIME};
use reqwest::Method;
use tracing::debug;

/// Async client for the models collection.
#[derive(Debug, Clone)]
pub struct AsyncModelsClient {
    transport: AsyncTransport,
    options: Option<RequestOptions>,
}

impl AsyncModelsClient {
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

    /// List the models available to the caller.
    pub async fn list(&self, params: ListParams) -> Result<Vec<ModelInfo>> {
        let request = self.transport.request(
            Method::GET,
            &[MODELS],
            &params.query(),
            self.options.as_ref(),
        )?;
        self.transport.send_json(request).await
    }

    /// Fetch one model by id.
    pub async fn info(&self, model: &str) -> Result<ModelInfo> {
        let request =
            self.transport
                .request(Method::GET, &[MODELS, model], &[], self.options.as_ref())?;
        self.transport.send_json(request).await
    }

    /// Run a model on the request's input data.
    ///
    /// The credential is checked before any input is staged. A temporary
    /// `.npy` file created for array input is removed before this returns,
    /// or when the future is dropped.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ModelResultInfo> {
        let builder = self
            .transport
            .request(Method::POST, &[MODELS], &[], self.options.as_ref())?;
        let fields = request.form_fields();
        let mut staged = StagedUpload::stage(request.data, self.transport.endpoint().temp_dir())?;
        debug!(
            model = %request.model,
            file = %staged.file_name(),
            temporary = staged.is_temporary(),
            "executing model"
        );

        let outcome = match async_form(fields, &mut staged) {
            Ok(form) => self.transport.send_json(builder.multipart(form)).await,
            Err(err) => Err(err),
        };
        staged.finish();
        outcome
    }
}

fn async_form(
    fields: Vec<(&'static str, String)>,
    staged: &mut StagedUpload,
) -> Result<reqwest::multipart::Form> {
    use reqwest::multipart::{Form, Part};

    let part = match staged.open()? {
        UploadBody::File { file, len } => Part::stream_with_length(
            reqwest::Body::from(tokio::fs::File::from_std(file)),
            len,
        ),
        UploadBody::Memory(data) => Part::bytes(data),
    };
    let part = part
        .file_name(staged.file_name().to_string())
        .mime_str(UPLOAD_MIME)?;

    let form = fields
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));
    Ok(form.part(FILE_FIELD, part))
}

#[cfg(feature = "blocking")]
pub use blocking::ModelsClient;

#[cfg(feature = "blocking")]
mod blocking {
    use super::MODELS;
    use crate::config::RequestOptions;
    use crate::error::Result;
    use crate::transport::BlockingTransport;
    use crate::types::{ListParams, ModelInfo, ModelResultInfo};
    use crate::upload::{ExecuteRequest, StagedUpload, UploadBody, FILE_FIELD, UPLOAD_MIME};
    use reqwest::blocking::multipart::{Form, Part};
    use reqwest::Method;
    use tracing::debug;

    /// Blocking client for the models collection.
    #[derive(Debug, Clone)]
    pub struct ModelsClient {
        transport: BlockingTransport,
        options: Option<RequestOptions>,
    }

    impl ModelsClient {
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

        /// List the models available to the caller.
        pub fn list(&self, params: ListParams) -> Result<Vec<ModelInfo>> {
            let request = self.transport.request(
                Method::GET,
                &[MODELS],
                &params.query(),
                self.options.as_ref(),
            )?;
            self.transport.send_json(request)
        }

        /// Fetch one model by id.
        pub fn info(&self, model: &str) -> Result<ModelInfo> {
            let request =
                self.transport
                    .request(Method::GET, &[MODELS, model], &[], self.options.as_ref())?;
            self.transport.send_json(request)
        }

        /// Run a model on the request's input data.
        ///
        /// See [`AsyncModelsClient::execute`](super::AsyncModelsClient::execute).
        pub fn execute(&self, request: ExecuteRequest) -> Result<ModelResultInfo> {
            let builder = self
                .transport
                .request(Method::POST, &[MODELS], &[], self.options.as_ref())?;
            let fields = request.form_fields();
            let mut staged =
                StagedUpload::stage(request.data, self.transport.endpoint().temp_dir())?;
            debug!(
                model = %request.model,
                file = %staged.file_name(),
                temporary = staged.is_temporary(),
                "executing model"
            );

            let outcome = blocking_form(fields, &mut staged)
                .and_then(|form| self.transport.send_json(builder.multipart(form)));
            staged.finish();
            outcome
        }
    }

    fn blocking_form(
        fields: Vec<(&'static str, String)>,
        staged: &mut StagedUpload,
    ) -> Result<Form> {
        let part = match staged.open()? {
            UploadBody::File { file, len } => Part::reader_with_length(file, len),
            UploadBody::Memory(data) => Part::bytes(data),
        };
        let part = part
            .file_name(staged.file_name().to_string())
            .mime_str(UPLOAD_MIME)?;

        let form = fields
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));
        Ok(form.part(FILE_FIELD, part))
    }
}
