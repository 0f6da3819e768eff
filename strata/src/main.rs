// Copyright (c) 2025 Pratik Barhate
// Licensed under the MIT License. See the LICENSE file in the project root for more information.

use std::env;
use std::error::Error;
use std::sync::Arc;
use strata::io::{self, ReaderSet};
use strata::{
    InputData, Loader, LoaderConfig, ModelContext, PredictionMicros, TractLoader, TractRuntime,
};
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Parses "28,28,1" or "2,2;3" (one shape per model input, separated by ';').
fn parse_input_shapes(arg: &str) -> Result<Vec<Vec<usize>>, std::num::ParseIntError> {
    arg.split(';')
        .map(|shape| {
            shape
                .split(',')
                .map(|dim| dim.trim().parse::<usize>())
                .collect()
        })
        .collect()
}

async fn read_location(
    readers: &ReaderSet,
    location: &str,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    let reader = readers
        .reader_for(location)
        .ok_or_else(|| format!("no reader is configured for {}", location))?;
    Ok(reader.read_string(location).await?)
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let config_location = args
        .get(1)
        .ok_or("CLI argument (1) loader configuration location is missing")?;
    let input_location = args
        .get(2)
        .ok_or("CLI argument (2) input data location is missing")?;
    let input_shapes = match args.get(3) {
        Some(arg) if !arg.is_empty() => parse_input_shapes(arg)?,
        _ => Vec::new(),
    };
    let met_thread_cnt = match args.get(4) {
        Some(arg) => arg.parse::<usize>()?,
        None => 0,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("strata-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let aws_config = aws_config::load_from_env().await;
        let readers = ReaderSet::new().with_s3(aws_sdk_s3::Client::new(&aws_config));

        let config = LoaderConfig::from_json(&read_location(&readers, config_location).await.map_err(|e| -> Box<dyn Error> { e })?)?;
        let data = InputData::from_json(&read_location(&readers, input_location).await.map_err(|e| -> Box<dyn Error> { e })?)?;

        let context = Arc::new(ModelContext::new().with_input_shapes(input_shapes));
        let mut loader =
            TractLoader::try_with_runtime(Arc::clone(&context), config, TractRuntime::new(readers))?;

        let mut metrics_workers = Vec::with_capacity(met_thread_cnt);
        if met_thread_cnt > 0 {
            let (metrics_sender, metrics_receiver) = mpsc::channel::<PredictionMicros>(200);
            let cloudwatch_client = Arc::new(aws_sdk_cloudwatch::Client::new(&aws_config));
            let shared_metrics_receiver = Arc::new(Mutex::new(metrics_receiver));
            for worker_id in 0..met_thread_cnt {
                metrics_workers.push(tokio::spawn(io::prediction_metrics_sidecar(
                    500,
                    Arc::clone(&cloudwatch_client),
                    "StrataPredictor",
                    Arc::clone(&shared_metrics_receiver),
                    worker_id,
                )));
            }
            loader = loader.with_metrics(metrics_sender);
        }

        let completion = loader.completion();
        loader.load().await?;
        completion.await?;

        context.predict(
            &data,
            Some(Box::new(|values: Vec<f32>| {
                match serde_json::to_string(&values) {
                    Ok(json) => println!("{}", json),
                    Err(_) => println!("{:?}", values),
                }
            })),
        )?;

        // The loader and the installed predictor hold the last metrics senders.
        drop(loader);
        drop(context);
        for worker in metrics_workers {
            worker.await?;
        }
        Ok::<(), Box<dyn Error>>(())
    })?;

    runtime.shutdown_background();

    Ok(())
}
