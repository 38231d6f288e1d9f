// src/bin/model_check.rs - load a model directory and run one dummy inference
use sign_stream::buffer::SequenceBuffer;
use sign_stream::features::FEATURE_COUNT;
use sign_stream::inference::{InferenceEngine, Schedule};
use sign_stream::model::load_model;
use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt::init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models"));
    println!("Checking model directory {}...\n", dir.display());

    let model = match load_model(&dir) {
        Ok(model) => {
            println!("✓ Model loaded: {} ({:?})", model.model.name(), model.model.layout());
            println!("✓ {} labels", model.labels.len());
            model
        }
        Err(e) => {
            println!("✗ Failed to load model: {}", e);
            println!("\nExpected files:");
            println!("1. model_config.json and labels.json (or lstm_config.json and lstm_labels.json)");
            println!("2. lstm_model.onnx (needs the `onnx` feature) or mlp_model.json");
            std::process::exit(1);
        }
    };

    let mut engine = match InferenceEngine::new(model.model, model.labels, 1) {
        Ok(engine) => engine,
        Err(e) => {
            println!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let mut buffer = SequenceBuffer::new();
    while !buffer.is_full() {
        buffer.push([0.0; FEATURE_COUNT]);
    }

    match engine.schedule(&buffer) {
        Schedule::Run(input) => match engine.infer(&input) {
            Some(prediction) => println!(
                "✓ Dummy inference: {} ({:.2})",
                prediction.label, prediction.confidence
            ),
            None => {
                println!("✗ Dummy inference failed, see log output");
                std::process::exit(1);
            }
        },
        other => {
            println!("✗ Unexpected schedule {:?}", other);
            std::process::exit(1);
        }
    }
}
