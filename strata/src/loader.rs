// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Loader adapters fetch a model through an inference runtime and install it,
//! together with a matching predictor, into a shared model context.
//!
//! Loading happens in three steps:
//! 1. Load the model through the runtime. This is the only suspension point.
//! 2. Build the predictor and commit resource, model type and predictor to the context.
//! 3. Fire the completion callback and the completion channel.
//!
//! Nothing is written to the context unless the runtime load succeeded.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::config::{ConfigError, LoaderConfig};
use crate::context::{LoadedModel, ModelContext};
use crate::error::{Error, Result};
use crate::predictor::{PredictionMicros, Predictor, TractPredictor};
use crate::runtime::{InferenceRuntime, ModelHandle, TractRuntime};

pub type LoaderFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Capability set every loader variant provides.
pub trait Loader: Send {
    fn context(&self) -> &Arc<ModelContext>;

    /// Loads the model and installs it with its predictor into the context.
    fn load(&mut self) -> LoaderFuture<'_>;

    /// Creates and configures the predictor for a freshly loaded model, then
    /// commits both to the context.
    fn set_predictor(&self, resource: Arc<dyn ModelHandle>) -> Result<()>;

    /// Copies the host's input shapes into a predictor.
    fn configure_input_shape(&self, predictor: &mut dyn Predictor) {
        let input_shapes = self.context().input_shapes();
        if !input_shapes.is_empty() {
            predictor.set_input_shapes(input_shapes.to_vec());
        }
    }
}

/// Loads an ONNX topology and its weight file through tract, or through any
/// other `InferenceRuntime` producing compatible handles.
pub struct TractLoader<R: InferenceRuntime = TractRuntime> {
    context: Arc<ModelContext>,
    runtime: R,
    model_url: Option<String>,
    weight_url: Option<String>,
    outputs_name: Option<Vec<String>>,
    config_errors: Vec<ConfigError>,
    on_complete: Option<Box<dyn FnOnce() + Send>>,
    completion: Option<oneshot::Sender<()>>,
    metrics_sender: Option<mpsc::Sender<PredictionMicros>>,
}

impl TractLoader<TractRuntime> {
    /// Creates a loader reading local and HTTP(S) locations.
    ///
    /// A configuration missing a required location is logged and kept; the
    /// load itself then fails in the runtime. Use `try_new` to fail here instead.
    pub fn new(context: Arc<ModelContext>, config: LoaderConfig) -> Self {
        TractLoader::with_runtime(context, config, TractRuntime::default())
    }

    pub fn try_new(
        context: Arc<ModelContext>,
        config: LoaderConfig,
    ) -> std::result::Result<Self, ConfigError> {
        TractLoader::try_with_runtime(context, config, TractRuntime::default())
    }
}

impl<R: InferenceRuntime> TractLoader<R> {
    pub fn with_runtime(context: Arc<ModelContext>, config: LoaderConfig, runtime: R) -> Self {
        let config_errors = config.missing_fields();
        for error in &config_errors {
            tracing::error!(%error, "invalid loader configuration");
        }
        let LoaderConfig {
            model_url,
            weight_url,
            outputs_name,
        } = config;

        TractLoader {
            context,
            runtime,
            model_url,
            weight_url,
            outputs_name,
            config_errors,
            on_complete: None,
            completion: None,
            metrics_sender: None,
        }
    }

    pub fn try_with_runtime(
        context: Arc<ModelContext>,
        config: LoaderConfig,
        runtime: R,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(TractLoader::with_runtime(context, config, runtime))
    }

    /// Registers a callback fired once, after a successful load.
    pub fn with_on_complete(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Returns a receiver resolved once, after a successful load. The sender is
    /// dropped without a value if the loader is dropped first.
    pub fn completion(&mut self) -> oneshot::Receiver<()> {
        let (sender, receiver) = oneshot::channel();
        self.completion = Some(sender);
        receiver
    }

    /// Attaches a metrics channel to the predictor this loader installs.
    pub fn with_metrics(mut self, sender: mpsc::Sender<PredictionMicros>) -> Self {
        self.metrics_sender = Some(sender);
        self
    }

    pub fn config_errors(&self) -> &[ConfigError] {
        &self.config_errors
    }

    pub fn model_url(&self) -> Option<&str> {
        self.model_url.as_deref()
    }

    pub fn weight_url(&self) -> Option<&str> {
        self.weight_url.as_deref()
    }

    pub fn outputs_name(&self) -> Option<&[String]> {
        self.outputs_name.as_deref()
    }

    async fn load_model(&mut self) -> Result<()> {
        if self.context.is_loaded() {
            return Err(Error::AlreadyLoaded);
        }

        let resource = self
            .runtime
            .load(self.model_url.as_deref(), self.weight_url.as_deref())
            .await?;
        self.set_predictor(resource)?;
        tracing::info!(
            model_type = self.runtime.model_type(),
            model_url = self.model_url.as_deref(),
            "model installed"
        );

        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
        if let Some(completion) = self.completion.take() {
            let _ = completion.send(());
        }
        Ok(())
    }
}

impl<R: InferenceRuntime> Loader for TractLoader<R> {
    fn context(&self) -> &Arc<ModelContext> {
        &self.context
    }

    fn load(&mut self) -> LoaderFuture<'_> {
        Box::pin(self.load_model())
    }

    fn set_predictor(&self, resource: Arc<dyn ModelHandle>) -> Result<()> {
        let mut predictor = TractPredictor::new(&self.context);
        predictor.set_outputs_name(self.outputs_name.clone());
        if let Some(sender) = &self.metrics_sender {
            predictor = predictor.with_metrics(sender.clone());
        }
        self.configure_input_shape(&mut predictor);

        self.context.install(LoadedModel {
            resource,
            model_type: self.runtime.model_type(),
            predictor: Arc::new(predictor),
        })
    }
}
