// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub type FileReaderResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
pub mod file_reader;
pub mod reader_set;

pub use file_reader::*;
pub use reader_set::*;

use crate::predictor::PredictionMicros;

fn prediction_metric_data(
    micros: &PredictionMicros,
) -> Vec<aws_sdk_cloudwatch::types::MetricDatum> {
    vec![
        aws_sdk_cloudwatch::types::MetricDatum::builder()
            .metric_name("InferenceTime")
            .value(micros.inference_time as f64)
            .unit(aws_sdk_cloudwatch::types::StandardUnit::Microseconds)
            .build(),
        aws_sdk_cloudwatch::types::MetricDatum::builder()
            .metric_name("ToTensorTime")
            .value(micros.tensor_time as f64)
            .unit(aws_sdk_cloudwatch::types::StandardUnit::Microseconds)
            .build(),
        aws_sdk_cloudwatch::types::MetricDatum::builder()
            .metric_name("MaterializeTime")
            .value(micros.materialize_time as f64)
            .unit(aws_sdk_cloudwatch::types::StandardUnit::Microseconds)
            .build(),
    ]
}

async fn flush_metrics(
    cloudwatch_client: &aws_sdk_cloudwatch::Client,
    namespace: &str,
    metric_buffer: &mut Vec<aws_sdk_cloudwatch::types::MetricDatum>,
    worker_id: usize,
) {
    if metric_buffer.is_empty() {
        return;
    }
    let metrics_to_send = std::mem::take(metric_buffer);
    if let Err(e) = cloudwatch_client
        .put_metric_data()
        .namespace(namespace)
        .set_metric_data(Some(metrics_to_send))
        .send()
        .await
    {
        tracing::warn!(worker_id, error = %e, "failed to publish prediction metrics");
    }
}

/// Publishes prediction timings received from predictors to CloudWatch.
///
/// Datums are buffered until `buffer_capacity` is reached; whatever is left is
/// flushed once every sender has been dropped.
pub async fn prediction_metrics_sidecar(
    buffer_capacity: usize,
    cloudwatch_client: Arc<aws_sdk_cloudwatch::Client>,
    namespace: &'static str,
    receiver: Arc<Mutex<mpsc::Receiver<PredictionMicros>>>,
    worker_id: usize,
) {
    tracing::info!(worker_id, "starting prediction metrics worker");
    let mut metric_buffer = Vec::new();
    loop {
        let mut receiver_lock = receiver.lock().await;
        match receiver_lock.recv().await {
            Some(micros) => {
                drop(receiver_lock);
                metric_buffer.extend(prediction_metric_data(&micros));
                if metric_buffer.len() >= buffer_capacity {
                    flush_metrics(&cloudwatch_client, namespace, &mut metric_buffer, worker_id)
                        .await;
                }
            }
            None => {
                drop(receiver_lock);
                flush_metrics(&cloudwatch_client, namespace, &mut metric_buffer, worker_id).await;
                tracing::info!(worker_id, "metrics channel closed, shutting down");
                break;
            }
        }
    }
}
