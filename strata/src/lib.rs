// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Loader and predictor adapters that install a pretrained model into a shared
//! model context and run predictions against it through an inference runtime.

pub mod config;
pub mod context;
pub mod error;
pub mod io;
pub mod loader;
pub mod predictor;
pub mod runtime;

pub use config::{ConfigError, LoaderConfig};
pub use context::{LoadedModel, ModelContext};
pub use error::{Error, Result};
pub use loader::{Loader, TractLoader};
pub use predictor::{InputData, PredictCallback, PredictionMicros, Predictor, TractPredictor};
pub use runtime::{materialize, InferenceRuntime, ModelHandle, PredictionResult, TractRuntime};
