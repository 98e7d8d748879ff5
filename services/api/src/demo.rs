//! One-off CLI commands for demos and smoke checks.

use crate::infra::default_sentiment_engine;
use clap::Args;
use serde_json::json;
use std::io::{Error as IoError, ErrorKind};
use supply_insights::config::SentimentConfig;
use supply_insights::error::AppError;
use supply_insights::scoring::{compute_score, SupplierScoreInput, WeightTable};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    #[arg(long)]
    pub(crate) timeliness: f64,
    #[arg(long)]
    pub(crate) quantity_accuracy: f64,
    #[arg(long)]
    pub(crate) quality: f64,
    #[arg(long)]
    pub(crate) complaint: f64,
    #[arg(long)]
    pub(crate) consistency: f64,
    #[arg(long)]
    pub(crate) trust_index: f64,
    #[arg(long, default_value_t = 0.0)]
    pub(crate) risk_index: f64,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let input = SupplierScoreInput {
        timeliness: args.timeliness,
        quantity_accuracy: args.quantity_accuracy,
        quality: args.quality,
        complaint: args.complaint,
        consistency: args.consistency,
        trust_index: args.trust_index,
        risk_index: args.risk_index,
    };

    let result = compute_score(&input, &WeightTable::default())?;
    print_json(&json!({
        "final_score": result.final_score,
        "rating_category": result.rating_category.label(),
        "computed_at": result.computed_at,
    }))
}

#[derive(Args, Debug)]
pub(crate) struct SentimentArgs {
    /// Review text to analyze
    pub(crate) text: String,
}

pub(crate) fn run_sentiment(args: SentimentArgs) -> Result<(), AppError> {
    let engine = default_sentiment_engine(SentimentConfig::default());
    let result = engine.analyze(&args.text);
    print_json(&json!({
        "polarity": result.polarity,
        "label": result.label,
    }))
}

fn print_json(value: &serde_json::Value) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(IoError::new(ErrorKind::InvalidData, err)))?;
    println!("{rendered}");
    Ok(())
}
