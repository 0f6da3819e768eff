// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Shared model context linking a host to one loaded model and its predictor.

use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::predictor::{InputData, PredictCallback, Predictor};
use crate::runtime::{ModelHandle, PredictionResult};

/// Everything a successful load produces, committed to the context in one step.
pub struct LoadedModel {
    pub resource: Arc<dyn ModelHandle>,
    pub model_type: &'static str,
    pub predictor: Arc<dyn Predictor>,
}

/// Record owned by the host and shared with the adapters as `Arc<ModelContext>`.
///
/// `resource`, `model_type` and `predictor` start unset and are set together,
/// exactly once, by a loader after its runtime load succeeded.
#[derive(Default)]
pub struct ModelContext {
    input_shapes: Vec<Vec<usize>>,
    loaded: OnceLock<LoadedModel>,
}

impl ModelContext {
    pub fn new() -> Self {
        ModelContext::default()
    }

    /// Input shape of every model input, batch dimension excluded.
    pub fn with_input_shapes(mut self, input_shapes: Vec<Vec<usize>>) -> Self {
        self.input_shapes = input_shapes;
        self
    }

    pub fn input_shapes(&self) -> &[Vec<usize>] {
        &self.input_shapes
    }

    pub fn resource(&self) -> Option<&Arc<dyn ModelHandle>> {
        self.loaded.get().map(|loaded| &loaded.resource)
    }

    pub fn model_type(&self) -> Option<&'static str> {
        self.loaded.get().map(|loaded| loaded.model_type)
    }

    pub fn predictor(&self) -> Option<&Arc<dyn Predictor>> {
        self.loaded.get().map(|loaded| &loaded.predictor)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Commits a finished load. Fails if another load already committed.
    pub fn install(&self, loaded: LoadedModel) -> Result<()> {
        self.loaded.set(loaded).map_err(|_| Error::AlreadyLoaded)
    }

    /// Runs the installed predictor.
    pub fn predict(
        &self,
        data: &InputData,
        callback: Option<PredictCallback<'_>>,
    ) -> Result<PredictionResult> {
        self.predictor()
            .ok_or(Error::NotLoaded)?
            .predict(data, callback)
    }
}

impl std::fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelContext")
            .field("input_shapes", &self.input_shapes)
            .field("model_type", &self.model_type())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
