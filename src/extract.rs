use serde_json::Value;

use crate::error::{ExtractError, Result};
use crate::query::{Resolved, resolve};

/// Flat metric-name → value mapping pulled from one trace document.
/// Stored as a vector to keep the extraction order for merge reproducibility.
pub type ExtractedRecord = Vec<(String, f64)>;

/// Result of running the fixed queries against one document. A non-OK
/// status is an expected exclusion, not an error, so it travels as data.
#[derive(Debug)]
pub enum Extraction {
    Record(ExtractedRecord),
    Skipped { status: String },
}

/// Extracts the timing metrics of one valuation trace.
///
/// The document must carry `status.code` and the
/// `time_record.children.Valuate.children` record list; anything missing
/// beyond that point fails the document as a whole. The sampling block is
/// only present for callable products, but once `CallableSampling` is seen
/// the document has committed to that shape and its sub-paths are required.
pub fn extract(document: &Value) -> Result<Extraction> {
    let status = match resolve(document, &["status", "code"])? {
        Resolved::Node(node) => node
            .as_str()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| node.to_string()),
        Resolved::Seconds(seconds) => seconds.to_string(),
        Resolved::Count(count) => count.to_string(),
    };
    if status != "OK" {
        return Ok(Extraction::Skipped { status });
    }

    let mut record = ExtractedRecord::new();

    // base narrows every later query to the Valuate record list.
    let base = resolve_node(document, &["time_record", "children", "Valuate", "children"])?;

    if has_named_element(base, "CallableSampling") {
        push_metric(&mut record, "Sampling", base, &["CallableSampling", "span", "duration"])?;
        push_metric(
            &mut record,
            "SamplingLV",
            base,
            &["CallableSampling", "children", "LOCAL_VOL_VALUATION", "span", "duration"],
        )?;
        push_metric(
            &mut record,
            "SamplingHV",
            base,
            &["CallableSampling", "children", "HESTON_VOL_VALUATION", "span", "duration"],
        )?;
        push_metric(
            &mut record,
            "SamplingSV",
            base,
            &["CallableSampling", "children", "LOCAL_STOCH_VOL_VALUATION", "span", "duration"],
        )?;
        push_metric(&mut record, "Regressors", base, &["Regressors", "span", "duration"])?;
    }

    let base = resolve_node(base, &["HestonTotal"])?;
    push_metric(&mut record, "HestonTotal", base, &["span", "duration"])?;
    push_metric(
        &mut record,
        "HestonLV",
        base,
        &["children", "LOCAL_VOL_VALUATION", "span", "duration"],
    )?;

    let base = resolve_node(
        base,
        &["children", "HestonCorr", "children", "Valuate", "children", "HestonCorr", "children"],
    )?;
    push_metric(&mut record, "HestonV", base, &["HESTON_VOL_VALUATION", "span", "duration"])?;
    push_metric(
        &mut record,
        "HestonSV",
        base,
        &["LOCAL_STOCH_VOL_VALUATION", "span", "duration"],
    )?;

    push_metric(
        &mut record,
        "Total Internal",
        document,
        &["time_record", "span", "duration"],
    )?;

    Ok(Extraction::Record(record))
}

fn resolve_node<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value> {
    match resolve(value, path)? {
        Resolved::Node(node) => Ok(node),
        _ => Err(ExtractError::NotANode(path.join("."))),
    }
}

fn has_named_element(value: &Value, name: &str) -> bool {
    value
        .as_array()
        .is_some_and(|elements| {
            elements
                .iter()
                .any(|element| element.get("name").and_then(Value::as_str) == Some(name))
        })
}

fn push_metric(
    record: &mut ExtractedRecord,
    metric: &str,
    value: &Value,
    path: &[&str],
) -> Result<()> {
    let resolved = resolve(value, path)?;
    let number = resolved
        .as_number()
        .ok_or_else(|| ExtractError::NotNumeric(path.join(".")))?;
    record.push((metric.to_string(), number));
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn named(name: &str, duration: &str, children: Value) -> Value {
        json!({"name": name, "span": {"duration": duration}, "children": children})
    }

    fn heston_tree() -> Value {
        // HestonTotal subtree with the doubly-nested HestonCorr record list.
        named(
            "HestonTotal",
            "8s",
            json!([
                named("LOCAL_VOL_VALUATION", "1s", json!([])),
                named(
                    "HestonCorr",
                    "6s",
                    json!([named(
                        "Valuate",
                        "6s",
                        json!([named(
                            "HestonCorr",
                            "6s",
                            json!([
                                named("HESTON_VOL_VALUATION", "2s", json!([])),
                                named("LOCAL_STOCH_VOL_VALUATION", "3s", json!([])),
                            ])
                        )])
                    )])
                ),
            ]),
        )
    }

    fn plain_document() -> Value {
        json!({
            "status": {"code": "OK"},
            "time_record": {
                "span": {"duration": "10s"},
                "children": [named("Valuate", "9s", json!([heston_tree()]))],
            },
        })
    }

    fn callable_document() -> Value {
        let sampling = named(
            "CallableSampling",
            "4s",
            json!([
                named("LOCAL_VOL_VALUATION", "1.5s", json!([])),
                named("HESTON_VOL_VALUATION", "1s", json!([])),
                named("LOCAL_STOCH_VOL_VALUATION", "0.5s", json!([])),
            ]),
        );
        let regressors = named("Regressors", "250ms", json!([]));
        json!({
            "status": {"code": "OK"},
            "time_record": {
                "span": {"duration": "20s"},
                "children": [named(
                    "Valuate",
                    "19s",
                    json!([sampling, regressors, heston_tree()])
                )],
            },
        })
    }

    fn record_value(record: &ExtractedRecord, metric: &str) -> f64 {
        record
            .iter()
            .find(|(name, _)| name == metric)
            .map(|(_, value)| *value)
            .unwrap_or_else(|| panic!("metric {metric} missing"))
    }

    #[test]
    fn plain_document_yields_heston_and_total_metrics_only() {
        let Extraction::Record(record) = extract(&plain_document()).unwrap() else {
            panic!("expected a record");
        };

        let names: Vec<&str> = record.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            ["HestonTotal", "HestonLV", "HestonV", "HestonSV", "Total Internal"]
        );
        assert_eq!(record_value(&record, "HestonTotal"), 8.0);
        assert_eq!(record_value(&record, "HestonLV"), 1.0);
        assert_eq!(record_value(&record, "HestonV"), 2.0);
        assert_eq!(record_value(&record, "HestonSV"), 3.0);
        assert_eq!(record_value(&record, "Total Internal"), 10.0);
    }

    #[test]
    fn callable_document_adds_the_sampling_block() {
        let Extraction::Record(record) = extract(&callable_document()).unwrap() else {
            panic!("expected a record");
        };

        assert_eq!(record_value(&record, "Sampling"), 4.0);
        assert_eq!(record_value(&record, "SamplingLV"), 1.5);
        assert_eq!(record_value(&record, "SamplingHV"), 1.0);
        assert_eq!(record_value(&record, "SamplingSV"), 0.5);
        assert_eq!(record_value(&record, "Regressors"), 0.25);
        assert_eq!(record_value(&record, "Total Internal"), 20.0);
    }

    #[test]
    fn non_ok_status_is_a_skip_not_an_error() {
        let mut doc = plain_document();
        doc["status"]["code"] = json!("FAILED");

        match extract(&doc).unwrap() {
            Extraction::Skipped { status } => assert_eq!(status, "FAILED"),
            Extraction::Record(_) => panic!("FAILED document must not extract"),
        }
    }

    #[test]
    fn missing_status_fails_the_document() {
        let doc = json!({"time_record": {}});
        assert!(matches!(
            extract(&doc),
            Err(ExtractError::MissingKey(k)) if k == "status"
        ));
    }

    #[test]
    fn incomplete_sampling_block_fails_once_committed() {
        let mut doc = callable_document();
        // Drop Regressors; CallableSampling is still present, so the shape
        // is committed and the missing sibling is a hard failure.
        let children = doc["time_record"]["children"][0]["children"]
            .as_array_mut()
            .unwrap();
        children.retain(|element| element["name"] != "Regressors");

        assert!(matches!(
            extract(&doc),
            Err(ExtractError::MissingName(k)) if k == "Regressors"
        ));
    }

    #[test]
    fn missing_valuate_base_fails_the_document() {
        let doc = json!({
            "status": {"code": "OK"},
            "time_record": {"span": {"duration": "1s"}, "children": []},
        });
        assert!(matches!(
            extract(&doc),
            Err(ExtractError::MissingName(k)) if k == "Valuate"
        ));
    }
}
