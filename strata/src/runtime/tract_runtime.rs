// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

//! tract backed implementation of the runtime traits, for ONNX models.
//!
//! The topology file and the weight file are fetched independently and staged
//! side by side under their own file names, since ONNX external tensor data is
//! resolved relative to the topology file. A topology that embeds its weights
//! simply ignores the staged weight file.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tract_onnx::prelude::*;

use crate::error::{Error, Result};
use crate::io::{file_name, ReaderSet};
use crate::runtime::{
    InferenceRuntime, LoadFuture, ModelHandle, PredictionResult, TractRunnableModel,
};

pub const ONNX_MODEL_TYPE: &str = "onnx";

const DEFAULT_MODEL_FILE: &str = "model.onnx";

/// File names the topology and weight files are staged under. The weight file
/// falls back to `<model>.data` when its location has no usable name or when
/// it would overwrite the topology.
fn staged_names(model_url: &str, weight_url: &str) -> (String, String) {
    let model_name = file_name(model_url).unwrap_or(DEFAULT_MODEL_FILE);
    let weight_name = match file_name(weight_url) {
        Some(name) if name != model_name => name.to_string(),
        _ => format!("{}.data", model_name),
    };
    (model_name.to_string(), weight_name)
}

#[derive(Debug, Default)]
pub struct TractRuntime {
    readers: ReaderSet,
}

impl TractRuntime {
    pub fn new(readers: ReaderSet) -> Self {
        TractRuntime { readers }
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let reader = self.readers.reader_for(location).ok_or_else(|| {
            Error::fetch(location, "no reader is configured for this location".into())
        })?;
        reader
            .read_bytes(location)
            .await
            .map_err(|e| Error::fetch(location, e))
    }

    async fn load_model(
        &self,
        model_url: Option<&str>,
        weight_url: Option<&str>,
    ) -> Result<Arc<dyn ModelHandle>> {
        let model_url = model_url.ok_or(Error::MissingLocation("model"))?;
        let weight_url = weight_url.ok_or(Error::MissingLocation("weight"))?;

        let (model_name, weight_name) = staged_names(model_url, weight_url);

        tracing::debug!(model_url, weight_url, "fetching model files");
        let (model_bytes, weight_bytes) =
            tokio::try_join!(self.fetch(model_url), self.fetch(weight_url))?;

        let staging = tempfile::tempdir()?;
        let model_path = staging.path().join(model_name);
        tokio::fs::write(&model_path, model_bytes).await?;
        tokio::fs::write(staging.path().join(weight_name), weight_bytes).await?;

        let model = tokio::task::spawn_blocking(move || {
            let model = tract_onnx::onnx().model_for_path(&model_path);
            drop(staging);
            model
        })
        .await??;
        tracing::info!(
            model_url,
            nodes = model.nodes().len(),
            "parsed onnx model"
        );

        Ok(Arc::new(TractModel::new(model)))
    }
}

impl InferenceRuntime for TractRuntime {
    fn model_type(&self) -> &'static str {
        ONNX_MODEL_TYPE
    }

    fn load<'a>(
        &'a self,
        model_url: Option<&'a str>,
        weight_url: Option<&'a str>,
    ) -> LoadFuture<'a> {
        Box::pin(self.load_model(model_url, weight_url))
    }
}

/// A parsed ONNX model plus one optimized plan per requested output-name list.
///
/// Plans are built on first use; the default outputs are keyed by the empty list.
pub struct TractModel {
    model: InferenceModel,
    plans: Mutex<HashMap<Vec<String>, Arc<TractRunnableModel>>>,
}

impl TractModel {
    pub fn new(model: InferenceModel) -> Self {
        TractModel {
            model,
            plans: Mutex::new(HashMap::new()),
        }
    }

    fn plan(&self, outputs_name: &[String]) -> Result<Arc<TractRunnableModel>> {
        let mut plans = self
            .plans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(plan) = plans.get(outputs_name) {
            return Ok(Arc::clone(plan));
        }

        let mut model = self.model.clone();
        if !outputs_name.is_empty() {
            model = model.with_output_names(outputs_name)?;
        }
        let plan = Arc::new(model.into_optimized()?.into_runnable()?);
        tracing::debug!(?outputs_name, "built runnable plan");
        plans.insert(outputs_name.to_vec(), Arc::clone(&plan));
        Ok(plan)
    }
}

impl ModelHandle for TractModel {
    fn predict(&self, inputs: TVec<TValue>) -> Result<PredictionResult> {
        Ok(self.plan(&[])?.run(inputs)?)
    }

    fn execute(&self, inputs: TVec<TValue>, outputs_name: &[String]) -> Result<PredictionResult> {
        Ok(self.plan(outputs_name)?.run(inputs)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::materialize;
    use std::io::Write;
    use tract_hir::ops::binary::BinIntoHir;
    use tract_hir::ops::math::Add;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_load_without_model_url() {
        let runtime = TractRuntime::default();
        let result = runtime.load(None, Some("weights.bin")).await;

        assert!(matches!(result, Err(Error::MissingLocation("model"))));
    }

    #[tokio::test]
    async fn test_load_without_weight_url() {
        let runtime = TractRuntime::default();
        let result = runtime.load(Some("model.onnx"), None).await;

        assert!(matches!(result, Err(Error::MissingLocation("weight"))));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let weight_url = write_temp(&dir, "model.onnx.data", b"\0\0\0\0");
        let model_url = dir.path().join("absent.onnx");

        let runtime = TractRuntime::default();
        let result = runtime
            .load(Some(model_url.to_str().unwrap()), Some(&weight_url))
            .await;

        match result {
            Err(Error::Fetch { location, .. }) => {
                assert_eq!(location, model_url.to_str().unwrap())
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("loading an absent file should fail"),
        }
    }

    #[tokio::test]
    async fn test_load_s3_without_client() {
        let runtime = TractRuntime::new(ReaderSet::new());
        let result = runtime
            .load(Some("s3://bucket/model.onnx"), Some("s3://bucket/model.onnx.data"))
            .await;

        assert!(matches!(result, Err(Error::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_load_malformed_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_url = write_temp(&dir, "model.onnx", b"not an onnx model");
        let weight_url = write_temp(&dir, "model.onnx.data", b"\0\0\0\0");

        let runtime = TractRuntime::default();
        let result = runtime.load(Some(&model_url), Some(&weight_url)).await;

        assert!(matches!(result, Err(Error::Runtime(_))));
    }

    /// input -> a = input + 1 -> b = a + 1, with `b` as the declared output.
    fn chained_add_model() -> TractModel {
        let mut model = InferenceModel::default();
        let input = model
            .add_source("input", f32::fact([1usize, 3]).into())
            .unwrap();
        let one = model.add_const("one", tensor0(1.0f32)).unwrap();
        let a = model.wire_node("a", Add.into_hir(), &[input, one]).unwrap()[0];
        let b = model.wire_node("b", Add.into_hir(), &[a, one]).unwrap()[0];
        model.set_output_outlets(&[b]).unwrap();
        TractModel::new(model)
    }

    fn input() -> TVec<TValue> {
        tvec!(tensor2(&[[1.0f32, 2.0, 3.0]]).into())
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn values(result: &PredictionResult) -> Vec<Vec<f32>> {
        result.iter().map(|value| materialize(value).unwrap()).collect()
    }

    fn plan_count(model: &TractModel) -> usize {
        model.plans.lock().unwrap().len()
    }

    #[test]
    fn test_tract_model_predict_declared_output() {
        let model = chained_add_model();

        let result = model.predict(input()).unwrap();
        assert_eq!(values(&result), vec![vec![3.0, 4.0, 5.0]]);
        assert_eq!(plan_count(&model), 1);
    }

    #[test]
    fn test_tract_model_execute_named_outputs_in_order() {
        let model = chained_add_model();

        let result = model.execute(input(), &names(&["b", "a"])).unwrap();
        assert_eq!(
            values(&result),
            vec![vec![3.0, 4.0, 5.0], vec![2.0, 3.0, 4.0]]
        );

        let result = model.execute(input(), &names(&["a"])).unwrap();
        assert_eq!(values(&result), vec![vec![2.0, 3.0, 4.0]]);
    }

    #[test]
    fn test_tract_model_reuses_plans() {
        let model = chained_add_model();

        model.predict(input()).unwrap();
        model.execute(input(), &names(&["b", "a"])).unwrap();
        assert_eq!(plan_count(&model), 2);

        let result = model.execute(input(), &names(&["b", "a"])).unwrap();
        model.predict(input()).unwrap();
        assert_eq!(plan_count(&model), 2);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_tract_model_unknown_output_name() {
        let model = chained_add_model();

        let result = model.execute(input(), &names(&["missing"]));
        assert!(matches!(result, Err(Error::Runtime(_))));
        assert_eq!(plan_count(&model), 0);
    }

    #[test]
    fn test_staged_names() {
        assert_eq!(
            staged_names("s3://bucket/net.onnx", "s3://bucket/net.weights"),
            ("net.onnx".to_string(), "net.weights".to_string())
        );
        assert_eq!(
            staged_names("https://host/models/", "https://host/weights/"),
            ("model.onnx".to_string(), "model.onnx.data".to_string())
        );
    }

    #[test]
    fn test_staged_names_never_overwrite_topology() {
        let (model_name, weight_name) =
            staged_names("/models/model.onnx.data", "https://host/weights/");
        assert_eq!(model_name, "model.onnx.data");
        assert_eq!(weight_name, "model.onnx.data.data");

        let (model_name, weight_name) =
            staged_names("/models/net.onnx", "/weights/net.onnx");
        assert_ne!(model_name, weight_name);
    }

    #[test]
    fn test_model_type() {
        assert_eq!(TractRuntime::default().model_type(), "onnx");
    }
}
