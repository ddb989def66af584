//! Instrumented invocation: wall-clock timing plus a text record per call.
//!
//! Records go to stdout by default, or to an append-only log file. A log
//! file is removed once its line count reaches the configured rotation
//! threshold, checked at call start, which bounds unbounded growth at the
//! cost of an O(lines) scan per call.

use crate::callable::{Args, CallSite};
use crate::compose::{AttachmentSpec, AttachmentState, Operation};
use crate::error::RuntimeResult;
use crate::values::Value;
use itertools::Itertools;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Reserved call-time keyword carrying the optional per-invocation note.
pub const DEBUG_MSG_KEYWORD: &str = "debug_msg";

#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Where records are appended; `None` means standard output.
    pub log_target: Option<PathBuf>,
    /// Render large array-like values abbreviated instead of in full.
    pub suppress_value_rendering: bool,
    /// Line count at which a log file is deleted before the next record.
    pub rotation_line_threshold: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_target: None,
            suppress_value_rendering: false,
            rotation_line_threshold: 10_000,
        }
    }
}

/// Attachment that times and logs each invocation of the delegate.
///
/// On success the delegate's result is returned unchanged. On failure the
/// record is still written and the error is returned to the caller; nothing
/// is swallowed.
pub struct DebugCall {
    state: AttachmentState,
    config: DebugConfig,
}

impl DebugCall {
    /// Attachment spec with default configuration.
    pub fn attach() -> AttachmentSpec {
        Self::with_config(DebugConfig::default())
    }

    /// Attachment spec with explicit configuration.
    pub fn with_config(config: DebugConfig) -> AttachmentSpec {
        AttachmentSpec::operation(move |state| {
            Ok(Box::new(DebugCall { state, config }) as Box<dyn Operation>)
        })
    }
}

impl Operation for DebugCall {
    fn invoke(&self, site: &CallSite, mut args: Args) -> RuntimeResult<Option<Value>> {
        let note = args.take_named(DEBUG_MSG_KEYWORD).map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });

        if let Some(path) = &self.config.log_target {
            rotate_if_needed(path, self.config.rotation_line_threshold)?;
        }

        let sink = match &self.config.log_target {
            Some(path) => LogSink::File(path.clone()),
            None => LogSink::Stdout,
        };
        let policy = RenderPolicy {
            abbreviate_large: self.config.suppress_value_rendering,
            ..RenderPolicy::default()
        };

        sink.append(&format!(
            "[{}] calling {} from {}...",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.state.identity(),
            site
        ))?;

        let started = Instant::now();
        match self.state.delegate(&args) {
            Ok(output) => {
                let mut block = format!(
                    " DONE in {}\n  inputs: {}\n  output: {}\n",
                    format_duration(started.elapsed()),
                    render_args(&args, &policy),
                    render_value(&output, &policy)
                );
                if let Some(note) = note {
                    block.push_str(&format!("  [INFO] {}\n", note));
                }
                sink.append(&block)?;
                Ok(Some(output))
            }
            Err(error) => {
                sink.append(&format!(" FAILED, error message:\n  {}\n", error))?;
                Err(error)
            }
        }
    }
}

enum LogSink {
    Stdout,
    File(PathBuf),
}

impl LogSink {
    fn append(&self, text: &str) -> RuntimeResult<()> {
        match self {
            LogSink::Stdout => {
                print!("{}", text);
                Ok(())
            }
            LogSink::File(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(text.as_bytes())?;
                Ok(())
            }
        }
    }
}

/// Delete the log file once its line count has reached `threshold`.
fn rotate_if_needed(path: &Path, threshold: usize) -> RuntimeResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let lines = BufReader::new(fs::File::open(path)?).lines().count();
    if lines >= threshold {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Elapsed wall-clock time decomposed into hours, minutes and seconds.
/// Always non-negative: the measurement uses a monotonic clock.
fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs_f64();
    let hours = (total / 3600.0).floor();
    let minutes = ((total - hours * 3600.0) / 60.0).floor();
    let seconds = total - hours * 3600.0 - minutes * 60.0;
    format!("{:.0}h{:.0}m{:.4}s", hours, minutes, seconds)
}

/// How values are rendered into log records. The redaction decision is a
/// parameter here, not process state, so there is nothing to restore on any
/// exit path.
#[derive(Debug, Clone)]
pub struct RenderPolicy {
    pub abbreviate_large: bool,
    /// Element count above which an array-like value counts as large.
    pub large_threshold: usize,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            abbreviate_large: false,
            large_threshold: 32,
        }
    }
}

pub fn render_value(value: &Value, policy: &RenderPolicy) -> String {
    if policy.abbreviate_large {
        match value {
            Value::NumericArray(xs) if xs.len() > policy.large_threshold => {
                return format!("<numeric-array of {} elements>", xs.len());
            }
            Value::Vector(items) if items.len() > policy.large_threshold => {
                return format!("<vector of {} elements>", items.len());
            }
            _ => {}
        }
    }
    value.to_string()
}

fn render_args(args: &Args, policy: &RenderPolicy) -> String {
    let positional = args.positional.iter().map(|v| render_value(v, policy));
    let named = args
        .named
        .iter()
        .map(|(k, v)| format!("{}: {}", k, render_value(v, policy)));
    format!("({})", positional.chain(named).join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::{type_error, Callable};
    use crate::compose::endow;
    use std::time::Duration;
    use tempfile::tempdir;

    fn scaled_sum() -> Callable {
        Callable::new("scaled_sum", |args: &Args| {
            let mut total = 0i64;
            if let Some(Value::Vector(items)) = args.get_positional(0) {
                for item in items {
                    match item {
                        Value::Integer(i) => total += i,
                        other => return Err(type_error("scaled_sum", "integer", other)),
                    }
                }
            }
            match args.get_named("factor") {
                Some(Value::Integer(f)) => Ok(Value::Integer(total * f)),
                Some(other) => Err(type_error("scaled_sum", "integer factor", other)),
                None => Ok(Value::Integer(total)),
            }
        })
    }

    #[test]
    fn test_success_record_written_to_log_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("calls.log");
        let wrapped = endow(
            scaled_sum(),
            vec![(
                "debug",
                DebugCall::with_config(DebugConfig {
                    log_target: Some(log_path.clone()),
                    ..DebugConfig::default()
                }),
            )],
        )
        .unwrap();

        let out = wrapped
            .invoke(
                "debug",
                Args::positional([Value::vector([1i64, 2, 3])])
                    .named("factor", 2i64)
                    .named("debug_msg", "first run"),
            )
            .unwrap();
        assert_eq!(out, Some(Value::Integer(12)));

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("calling scaled_sum from"));
        assert!(log.contains("DONE in"));
        assert!(log.contains("inputs: ([1, 2, 3], factor: 2)"));
        assert!(log.contains("output: 12"));
        assert!(log.contains("[INFO] first run"));
        // the reserved keyword never reaches the delegate
        assert!(!log.contains("debug_msg"));
    }

    #[test]
    fn test_failure_is_logged_and_returned() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("calls.log");
        let wrapped = endow(
            scaled_sum(),
            vec![(
                "debug",
                DebugCall::with_config(DebugConfig {
                    log_target: Some(log_path.clone()),
                    ..DebugConfig::default()
                }),
            )],
        )
        .unwrap();

        let err = wrapped
            .invoke(
                "debug",
                Args::positional([Value::vector([1i64])]).named("factor", 1.0f64),
            )
            .unwrap_err();
        assert!(err.to_string().contains("type error"));

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("FAILED, error message:"));
        assert!(log.contains("integer factor"));
        assert!(!log.contains("DONE"));
    }

    #[test]
    fn test_rotation_deletes_full_log() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("calls.log");
        fs::write(&log_path, "old\nold\nold\nold\n").unwrap();

        let wrapped = endow(
            scaled_sum(),
            vec![(
                "debug",
                DebugCall::with_config(DebugConfig {
                    log_target: Some(log_path.clone()),
                    rotation_line_threshold: 4,
                    ..DebugConfig::default()
                }),
            )],
        )
        .unwrap();

        wrapped
            .invoke("debug", Args::positional([Value::vector([1i64])]))
            .unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(!log.contains("old"));
        assert!(log.contains("calling scaled_sum"));
    }

    #[test]
    fn test_below_threshold_log_is_kept() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("calls.log");
        fs::write(&log_path, "old\n").unwrap();

        rotate_if_needed(&log_path, 100).unwrap();
        assert!(fs::read_to_string(&log_path).unwrap().contains("old"));
    }

    #[test]
    fn test_suppressed_rendering_abbreviates_inputs() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("calls.log");
        let passthrough = Callable::new("first", |args: &Args| {
            Ok(args.get_positional(0).cloned().unwrap_or(Value::Nil))
        });
        let wrapped = endow(
            passthrough,
            vec![(
                "debug",
                DebugCall::with_config(DebugConfig {
                    log_target: Some(log_path.clone()),
                    suppress_value_rendering: true,
                    ..DebugConfig::default()
                }),
            )],
        )
        .unwrap();

        let big = Value::NumericArray((0..1000).map(f64::from).collect());
        wrapped
            .invoke("debug", Args::positional([big]))
            .unwrap();

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("inputs: (<numeric-array of 1000 elements>)"));
        assert!(log.contains("output: <numeric-array of 1000 elements>"));
    }

    #[test]
    fn test_duration_decomposition() {
        assert_eq!(
            format_duration(Duration::from_secs_f64(3725.5)),
            "1h2m5.5000s"
        );
        assert_eq!(format_duration(Duration::from_secs(0)), "0h0m0.0000s");
        assert_eq!(format_duration(Duration::from_secs(59)), "0h0m59.0000s");
    }

    #[test]
    fn test_render_policy_abbreviates_large_arrays() {
        let big = Value::NumericArray((0..100).map(f64::from).collect());
        let full = RenderPolicy::default();
        let redacted = RenderPolicy {
            abbreviate_large: true,
            ..RenderPolicy::default()
        };
        assert!(render_value(&big, &full).starts_with("array(["));
        assert_eq!(
            render_value(&big, &redacted),
            "<numeric-array of 100 elements>"
        );
        // small values render in full either way
        assert_eq!(render_value(&Value::Integer(7), &redacted), "7");
    }
}
