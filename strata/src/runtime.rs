// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Seam between the adapters and the external inference runtime.
//!
//! The loader only needs a way to turn two locations into a model handle, and the
//! predictor only needs the two inference entry points on that handle. Tensor
//! execution, graph parsing and weight deserialization all stay behind these traits.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tract_onnx::prelude::*;

use crate::error::Result;

pub mod tract_runtime;

pub use tract_runtime::*;

/// Ordered output tensors of one inference call, left unmaterialized.
pub type PredictionResult = TVec<TValue>;

pub type LoadFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Arc<dyn ModelHandle>>> + Send + 'a>>;

pub(crate) type TractRunnableModel =
    RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Asynchronous model-load entry point of an inference runtime.
pub trait InferenceRuntime: Send + Sync {
    /// Tag written to the model context to identify which runtime produced the handle.
    fn model_type(&self) -> &'static str;

    /// Loads a model from its topology and weight locations.
    ///
    /// Either location may be unset when the loader was built from an incomplete
    /// configuration; implementations must fail on that rather than guess.
    fn load<'a>(
        &'a self,
        model_url: Option<&'a str>,
        weight_url: Option<&'a str>,
    ) -> LoadFuture<'a>;
}

/// A loaded model, as seen by a predictor.
pub trait ModelHandle: Send + Sync {
    /// Runs the model and returns its declared outputs.
    fn predict(&self, inputs: TVec<TValue>) -> Result<PredictionResult>;

    /// Runs the model and returns the tensors of the named nodes, in the order given.
    fn execute(&self, inputs: TVec<TValue>, outputs_name: &[String]) -> Result<PredictionResult>;
}

/// Reads the values of an output tensor as `f32`, casting from other numeric types.
pub fn materialize(tensor: &TValue) -> Result<Vec<f32>> {
    let values = tensor.cast_to::<f32>()?;
    Ok(values.as_slice::<f32>()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_f32() {
        let tensor = Tensor::from_shape(&[1, 3], &[0.25f32, 0.5, 0.75]).unwrap();
        let values = materialize(&tensor.into()).unwrap();

        assert_eq!(values, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_materialize_casts_integers() {
        let tensor = Tensor::from_shape(&[2, 2], &[1i64, 2, 3, 4]).unwrap();
        let values = materialize(&tensor.into()).unwrap();

        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
