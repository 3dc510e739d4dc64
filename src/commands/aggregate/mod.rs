use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::accumulator::Accumulator;
use crate::cli::AggregateArgs;
use crate::duration::parse_duration;
use crate::extract::{Extraction, extract};
use crate::model::{AggregateManifest, TraceSource};
use crate::table::ExperimentTable;
use crate::util::{now_utc_string, read_json_value, sha256_file, write_json_pretty};


/// Metric name for the wall-clock times scraped from the submit log.
const TOTAL_USER_METRIC: &str = "Total User";

/// Compiled patterns for one aggregation run: the result-file name shape
/// and the command/completion block in the submit log.
pub struct Patterns {
    result: Regex,
    external: Regex,
}

impl Patterns {
    pub fn new() -> Result<Self> {
        let result = Regex::new(r"^(.*?)_result(?:_\d+)?\.json$")
            .context("failed to compile result filename regex")?;
        // A command invocation naming its output file, followed some lines
        // later by the completion banner with the wall-clock time.
        let external = Regex::new(
            r"(?s)# Command:.*?-o \S*?([^/\s]+?)_result(?:_\d+)?\.json.*?Total execution time: (\S+)",
        )
        .context("failed to compile submit log regex")?;

        Ok(Self { result, external })
    }

    /// Experiment key from the last path segment, or None when the file
    /// does not follow the `<key>_result[_<n>].json` convention.
    pub fn experiment_key(&self, path: &Path) -> Option<String> {
        let filename = path.file_name()?.to_str()?;
        self.result
            .captures(filename)
            .map(|captures| captures[1].to_string())
    }
}

/// Everything one aggregation run produced: the per-experiment table,
/// the provenance of the accepted documents, and notes for every input
/// that was skipped.
pub struct AggregateOutcome {
    pub table: ExperimentTable,
    pub sources: Vec<TraceSource>,
    pub skipped: Vec<String>,
}

pub fn run(args: AggregateArgs) -> Result<()> {
    let log_path = args
        .log
        .clone()
        .unwrap_or_else(|| default_log_path(&args.inputs));

    info!(
        documents = args.inputs.len(),
        log = %log_path.display(),
        "starting aggregation"
    );

    let outcome = aggregate(&args.inputs, &log_path)?;
    let rows = outcome.table.to_rows();

    for row in &rows {
        info!(experiment = %row.key, metrics = row.means.len(), "aggregated");
    }

    let manifest = AggregateManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        document_count: outcome.sources.len(),
        experiment_count: rows.len(),
        sources: outcome.sources,
        skipped: outcome.skipped,
        rows,
    };

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &manifest)?;
            info!(path = %path.display(), "wrote aggregate manifest");
        }
        None => {
            let rendered = serde_json::to_string_pretty(&manifest)
                .context("failed to render aggregate manifest")?;
            println!("{rendered}");
        }
    }

    Ok(())
}

/// Runs the extractor over every document, then folds the submit log's
/// wall-clock times into the same table. Per-document problems are
/// reported and skipped; only I/O on the aggregate's own outputs or a
/// metric-key collision can fail the run.
pub fn aggregate(inputs: &[PathBuf], log_path: &Path) -> Result<AggregateOutcome> {
    let patterns = Patterns::new()?;
    let mut table = ExperimentTable::new();
    let mut sources = Vec::new();
    let mut skipped = Vec::new();

    for path in inputs {
        if !path.is_file() {
            warn!(path = %path.display(), "not a file, skipped");
            skipped.push(format!("{}: not a file", path.display()));
            continue;
        }

        let Some(key) = patterns.experiment_key(path) else {
            warn!(path = %path.display(), "filename does not match the result pattern, skipped");
            skipped.push(format!("{}: filename does not match", path.display()));
            continue;
        };

        info!(path = %path.display(), experiment = %key, "processing trace document");

        let document = match read_json_value(path) {
            Ok(document) => document,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable document, skipped");
                skipped.push(format!("{}: {err}", path.display()));
                continue;
            }
        };

        match extract(&document) {
            Ok(Extraction::Record(record)) => {
                table.accumulator_mut(&key).merge_record(&record);
                sources.push(TraceSource {
                    filename: path.display().to_string(),
                    experiment: key,
                    sha256: sha256_file(path)?,
                });
            }
            Ok(Extraction::Skipped { status }) => {
                warn!(path = %path.display(), status = %status, "document status not OK, excluded");
                skipped.push(format!("{}: status {status}", path.display()));
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "document extraction failed, skipped");
                skipped.push(format!("{}: {err}", path.display()));
            }
        }
    }

    merge_log_times(&mut table, &patterns, log_path, &mut skipped)?;

    Ok(AggregateOutcome {
        table,
        sources,
        skipped,
    })
}

/// Scrapes `(experiment, wall-clock seconds)` pairs out of the submit log
/// and installs each series as the `Total User` metric of its experiment.
/// The log regularly mentions experiments whose documents were not part
/// of this run; those entries are discarded.
fn merge_log_times(
    table: &mut ExperimentTable,
    patterns: &Patterns,
    log_path: &Path,
    skipped: &mut Vec<String>,
) -> Result<()> {
    if !log_path.is_file() {
        warn!(path = %log_path.display(), "no submit log found, wall-clock pass skipped");
        skipped.push(format!("{}: submit log missing", log_path.display()));
        return Ok(());
    }

    let text = fs::read_to_string(log_path)
        .with_context(|| format!("failed to read submit log: {}", log_path.display()))?;

    let mut user_times = Accumulator::new();
    for captures in patterns.external.captures_iter(&text) {
        let key = &captures[1];
        let time_text = &captures[2];
        match parse_duration(time_text) {
            Ok(seconds) => user_times.append(key, seconds),
            Err(err) => {
                warn!(experiment = key, value = time_text, error = %err, "bad execution time in log, ignored");
                skipped.push(format!("{key}: {err}"));
            }
        }
    }

    for (key, values) in user_times.iter() {
        if table.contains(key) {
            table
                .accumulator_mut(key)
                .set_once(TOTAL_USER_METRIC, values.to_vec())?;
        } else {
            warn!(experiment = key, "log entry for unknown experiment, discarded");
            skipped.push(format!("{key}: log entry without a matching document"));
        }
    }

    Ok(())
}

/// The submit log conventionally sits next to the common prefix of the
/// result files: `runs/A_result.json runs/B_result.json` → `runs/submit.log`.
fn default_log_path(inputs: &[PathBuf]) -> PathBuf {
    let mut prefix = inputs
        .first()
        .and_then(|path| path.to_str())
        .unwrap_or_default()
        .to_string();

    for path in inputs.iter().skip(1).filter_map(|path| path.to_str()) {
        let mut common = prefix
            .bytes()
            .zip(path.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        while !prefix.is_char_boundary(common) {
            common -= 1;
        }
        prefix.truncate(common);
    }

    let dir = match prefix.rfind('/') {
        Some(index) => &prefix[..index],
        None => ".",
    };
    Path::new(dir).join("submit.log")
}
