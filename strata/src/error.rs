// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Error types shared by the loader, predictor and runtime adapters.

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The runtime was asked to load a location the configuration never provided.
    #[error("no {0} location was provided to the runtime")]
    MissingLocation(&'static str),

    #[error("failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("runtime error: {0}")]
    Runtime(#[from] anyhow::Error),

    #[error("input {index} has {actual} values, shape {shape:?} expects {expected}")]
    InputShape {
        index: usize,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("model expects {expected} inputs, got {actual}")]
    InputCount { expected: usize, actual: usize },

    #[error("prediction produced no output tensor")]
    EmptyResult,

    #[error("no model is loaded in the model context")]
    NotLoaded,

    #[error("the model context already holds a loaded model")]
    AlreadyLoaded,

    #[error("invalid input data: {0}")]
    Input(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn fetch(
        location: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Fetch {
            location: location.into(),
            source,
        }
    }
}
