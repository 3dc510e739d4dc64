use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::cli::RewriteArgs;
use crate::util::{ensure_directory, read_json_value, write_json_pretty};

pub fn run(args: RewriteArgs) -> Result<()> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.inputs));
    ensure_directory(&output_dir)?;

    for path in &args.inputs {
        if !path.is_file() {
            warn!(path = %path.display(), "not a file, skipped");
            continue;
        }

        info!(path = %path.display(), "rewriting payload");

        let mut document = match read_json_value(path) {
            Ok(document) => document,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable payload, skipped");
                continue;
            }
        };

        rewrite_document(&mut document)
            .with_context(|| format!("failed to rewrite {}", path.display()))?;

        let filename = path
            .file_name()
            .with_context(|| format!("input has no filename: {}", path.display()))?;
        let out_path = output_dir.join(filename);
        write_json_pretty(&out_path, &document)?;
        info!(path = %out_path.display(), "wrote rewritten payload");
    }

    Ok(())
}

fn trigger_info() -> Value {
    json!({
        "coupon": {"value": 0},
        "level": {"value": 99.99},
        "level_up": true,
    })
}

/// Turns a callable-product payload into the double-trigger autocall form:
/// the American Monte Carlo model and parameter set are dropped, every
/// `callable_info` event date becomes a `cancel_trigger`, and the final
/// payoff is merged into the new `autocall` section.
pub fn rewrite_document(document: &mut Value) -> Result<()> {
    let payload = document
        .get_mut("payload")
        .context("payload section missing")?;

    payload
        .get_mut("model")
        .and_then(Value::as_object_mut)
        .context("model section missing")?
        .remove("american_montecarlo_model");

    let product = payload
        .get_mut("product")
        .and_then(Value::as_object_mut)
        .context("product section missing")?;

    let mut cancel_option = match product.remove("callable") {
        Some(Value::Object(map)) => map,
        _ => bail!("callable section missing"),
    };

    let mut trigger_dates = match cancel_option.remove("event_date") {
        Some(Value::Array(dates)) => dates,
        _ => bail!("event_date list missing"),
    };
    for event in &mut trigger_dates {
        let Some(event) = event.as_object_mut() else {
            continue;
        };
        if let Some(callable_info) = event.remove("callable_info") {
            let date = callable_info
                .get("funding_end_date")
                .cloned()
                .context("funding_end_date missing in callable_info")?;
            event.insert(
                "cancel_trigger".to_string(),
                json!({"cancel_date": date, "trigger_info": trigger_info()}),
            );
        }
    }

    cancel_option.insert("trigger_dates".to_string(), Value::Array(trigger_dates));
    cancel_option.insert("type".to_string(), json!("DOUBLETRIGGER"));
    cancel_option.insert("pay_at_fixings".to_string(), json!(true));

    let hedge = cancel_option
        .get("coupon_cost_of_hedge")
        .cloned()
        .context("coupon_cost_of_hedge missing")?;
    cancel_option.insert("cancel_cost_of_hedge".to_string(), hedge);

    // An empty funding leg stays out of the new list.
    let mut funding_legs = Vec::new();
    if let Some(leg) = cancel_option.remove("funding_leg") {
        if !is_empty_value(&leg) {
            funding_legs.push(leg);
        }
    }
    cancel_option.insert("funding_legs".to_string(), Value::Array(funding_legs));

    cancel_option.remove("memory");
    let final_payoff = match cancel_option.remove("final_payoff") {
        Some(Value::Object(map)) => map,
        _ => bail!("final_payoff missing"),
    };

    let mut autocall = Map::new();
    autocall.insert("cancel_option".to_string(), Value::Object(cancel_option));
    autocall.insert("memory".to_string(), json!({}));
    autocall.insert("tarn".to_string(), json!({"basic_tarn": {"type": "NONE"}}));
    autocall.insert(
        "asian_tail".to_string(),
        json!({"performance": {"type": "EUROPEAN"}}),
    );
    for (key, value) in final_payoff {
        autocall.insert(key, value);
    }
    product.insert("autocall".to_string(), Value::Object(autocall));

    let parameters = payload
        .pointer_mut("/simulation_parameters/monte_carlo_parameters_array/monte_carlo_parameters")
        .and_then(Value::as_array_mut)
        .context("monte_carlo_parameters missing")?;
    parameters.retain(|entry| entry.get("id").and_then(Value::as_str) != Some("AMERICAN_MONTECARLO"));

    Ok(())
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(values) => values.is_empty(),
        _ => false,
    }
}

fn default_output_dir(inputs: &[PathBuf]) -> PathBuf {
    let parent = inputs
        .first()
        .and_then(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = parent
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("payloads");
    parent.with_file_name(format!("{name}_nocal"))
}
