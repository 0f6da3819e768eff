// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Predictor adapters turn application input into runtime inference calls.

use serde::Deserialize;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::mpsc;
use tract_onnx::prelude::*;

use crate::context::ModelContext;
use crate::error::{Error, Result};
use crate::runtime::{materialize, PredictionResult};

/// Receives the values of the last output tensor of one prediction.
pub type PredictCallback<'a> = Box<dyn FnOnce(Vec<f32>) + 'a>;

/// Capability set every predictor variant provides.
pub trait Predictor: Send + Sync {
    /// Runs one prediction and returns the raw output tensors.
    ///
    /// When a callback is given it is invoked exactly once with the
    /// materialized values of the last output tensor.
    fn predict(
        &self,
        data: &InputData,
        callback: Option<PredictCallback<'_>>,
    ) -> Result<PredictionResult>;

    /// Shape of every model input, batch dimension excluded.
    fn set_input_shapes(&mut self, input_shapes: Vec<Vec<usize>>);
}

/// Application data for one prediction.
///
/// Deserializes from a flat JSON array for single-input models, or from an
/// array of arrays with one entry per model input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputData {
    Single(Vec<f32>),
    Multiple(Vec<Vec<f32>>),
}

impl InputData {
    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    fn inputs(&self) -> Vec<&[f32]> {
        match self {
            InputData::Single(values) => vec![values.as_slice()],
            InputData::Multiple(inputs) => inputs.iter().map(Vec::as_slice).collect(),
        }
    }
}

impl From<Vec<f32>> for InputData {
    fn from(values: Vec<f32>) -> Self {
        InputData::Single(values)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionMicros {
    pub tensor_time: u128,
    pub inference_time: u128,
    pub materialize_time: u128,
}

/// Predictor bound to a model context holding a tract model.
///
/// Holds the context weakly: the context owns the installed predictor.
#[derive(Debug)]
pub struct TractPredictor {
    context: Weak<ModelContext>,
    outputs_name: Option<Vec<String>>,
    input_shapes: Vec<Vec<usize>>,
    metrics_sender: Option<mpsc::Sender<PredictionMicros>>,
}

impl TractPredictor {
    pub fn new(context: &Arc<ModelContext>) -> Self {
        TractPredictor {
            context: Arc::downgrade(context),
            outputs_name: None,
            input_shapes: Vec::new(),
            metrics_sender: None,
        }
    }

    /// Reports the timing of every prediction on `sender`. Timings are dropped
    /// while the channel is full.
    pub fn with_metrics(mut self, sender: mpsc::Sender<PredictionMicros>) -> Self {
        self.metrics_sender = Some(sender);
        self
    }

    pub fn set_outputs_name(&mut self, names: Option<Vec<String>>) {
        self.outputs_name = names;
    }

    pub fn outputs_name(&self) -> Option<&[String]> {
        self.outputs_name.as_deref()
    }

    pub fn input_shapes(&self) -> &[Vec<usize>] {
        &self.input_shapes
    }

    /// Builds one `[1, ..shape]` tensor per model input. Without configured
    /// shapes, a single input becomes a `[1, len]` row.
    fn create_input_tensors(&self, data: &InputData) -> Result<TVec<TValue>> {
        let inputs = data.inputs();
        if self.input_shapes.is_empty() {
            return inputs
                .into_iter()
                .map(|values| -> Result<TValue> {
                    Ok(Tensor::from_shape(&[1, values.len()], values)?.into())
                })
                .collect();
        }

        if inputs.len() != self.input_shapes.len() {
            return Err(Error::InputCount {
                expected: self.input_shapes.len(),
                actual: inputs.len(),
            });
        }
        inputs
            .into_iter()
            .zip(&self.input_shapes)
            .enumerate()
            .map(|(index, (values, shape))| -> Result<TValue> {
                let expected = shape
                    .iter()
                    .try_fold(1usize, |acc, dim| acc.checked_mul(*dim));
                if expected != Some(values.len()) {
                    return Err(Error::InputShape {
                        index,
                        shape: shape.clone(),
                        expected: expected.unwrap_or(usize::MAX),
                        actual: values.len(),
                    });
                }
                let mut batched = Vec::with_capacity(shape.len() + 1);
                batched.push(1);
                batched.extend_from_slice(shape);
                Ok(Tensor::from_shape(&batched, values)?.into())
            })
            .collect()
    }
}

impl Predictor for TractPredictor {
    fn predict(
        &self,
        data: &InputData,
        callback: Option<PredictCallback<'_>>,
    ) -> Result<PredictionResult> {
        let context = self.context.upgrade().ok_or(Error::NotLoaded)?;
        let resource = context.resource().ok_or(Error::NotLoaded)?;

        let tensor_start_time = Instant::now();
        let inputs = self.create_input_tensors(data)?;

        let inference_start_time = Instant::now();
        let predict_result = match &self.outputs_name {
            Some(names) => resource.execute(inputs, names)?,
            None => resource.predict(inputs)?,
        };

        let materialize_start_time = Instant::now();
        if let Some(callback) = callback {
            let last = predict_result.last().ok_or(Error::EmptyResult)?;
            callback(materialize(last)?);
        }
        let end_time = Instant::now();

        if let Some(sender) = &self.metrics_sender {
            let _ = sender.try_send(PredictionMicros {
                tensor_time: (inference_start_time - tensor_start_time).as_micros(),
                inference_time: (materialize_start_time - inference_start_time).as_micros(),
                materialize_time: (end_time - materialize_start_time).as_micros(),
            });
        }

        Ok(predict_result)
    }

    fn set_input_shapes(&mut self, input_shapes: Vec<Vec<usize>>) {
        self.input_shapes = input_shapes;
    }
}
