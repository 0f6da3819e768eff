// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! Loader configuration module to read the host's loader configuration from a JSON string.

use serde::Deserialize;

pub const MODEL_URL: &str = "modelUrl";
pub const WEIGHT_URL: &str = "weightUrl";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("\"{0}\" property is required to load the model")]
    MissingField(&'static str),

    #[error("{} properties are required to load the model", quoted(.0))]
    MissingFields(Vec<&'static str>),

    #[error("invalid loader configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

fn quoted(fields: &[&'static str]) -> String {
    fields
        .iter()
        .map(|field| format!("\"{}\"", field))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration surface handed to a loader by the host.
///
/// Both locations are required for a load to succeed, but a configuration
/// missing them still deserializes so the loader can decide whether to
/// degrade or fail fast.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Location of the model topology file.
    #[serde(default)]
    pub model_url: Option<String>,
    /// Location of the weight file.
    #[serde(default)]
    pub weight_url: Option<String>,
    /// Output node names, in the order their tensors should be returned.
    #[serde(default)]
    pub outputs_name: Option<Vec<String>>,
}

impl LoaderConfig {
    pub fn new(model_url: impl Into<String>, weight_url: impl Into<String>) -> Self {
        LoaderConfig {
            model_url: Some(model_url.into()),
            weight_url: Some(weight_url.into()),
            outputs_name: None,
        }
    }

    pub fn with_outputs_name<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs_name = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: LoaderConfig = serde_json::from_str(json_str)?;
        Ok(config)
    }

    /// Returns one error per missing required property, in declaration order.
    pub fn missing_fields(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.model_url.is_none() {
            errors.push(ConfigError::MissingField(MODEL_URL));
        }
        if self.weight_url.is_none() {
            errors.push(ConfigError::MissingField(WEIGHT_URL));
        }
        errors
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = self
            .missing_fields()
            .into_iter()
            .filter_map(|error| match error {
                ConfigError::MissingField(field) => Some(field),
                _ => None,
            })
            .collect();
        match missing.len() {
            0 => Ok(()),
            1 => Err(ConfigError::MissingField(missing[0])),
            _ => Err(ConfigError::MissingFields(missing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let json = r#"{
            "modelUrl": "s3://strata-models/mnist/model.onnx",
            "weightUrl": "s3://strata-models/mnist/model.onnx.data",
            "outputsName": ["conv_1", "dense_2"]
        }"#;

        let config = LoaderConfig::from_json(json).unwrap();

        assert_eq!(
            config.model_url.as_deref(),
            Some("s3://strata-models/mnist/model.onnx")
        );
        assert_eq!(
            config.weight_url.as_deref(),
            Some("s3://strata-models/mnist/model.onnx.data")
        );
        assert_eq!(
            config.outputs_name,
            Some(vec!["conv_1".to_string(), "dense_2".to_string()])
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_outputs_name_is_optional() {
        let config = LoaderConfig::from_json(r#"{"modelUrl": "m.pb", "weightUrl": "w.json"}"#)
            .unwrap();

        assert_eq!(config, LoaderConfig::new("m.pb", "w.json"));
        assert!(config.outputs_name.is_none());
    }

    #[test]
    fn test_missing_weight_url() {
        let config = LoaderConfig::from_json(r#"{"modelUrl": "m.pb"}"#).unwrap();

        let missing = config.missing_fields();
        assert_eq!(missing.len(), 1);
        assert!(matches!(missing[0], ConfigError::MissingField(WEIGHT_URL)));
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "\"weightUrl\" property is required to load the model"
        );
    }

    #[test]
    fn test_missing_both_urls() {
        let config = LoaderConfig::from_json("{}").unwrap();

        match config.validate() {
            Err(ConfigError::MissingFields(fields)) => {
                assert_eq!(fields, vec![MODEL_URL, WEIGHT_URL])
            }
            other => panic!("unexpected validation result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_types() {
        let invalid_json = r#"{
            "modelUrl": "m.pb",
            "weightUrl": "w.json",
            "outputsName": "not-a-list"
        }"#;

        let result = LoaderConfig::from_json(invalid_json);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
