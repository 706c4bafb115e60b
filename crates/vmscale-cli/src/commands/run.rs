use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use vmscale_autoscale::{PolicyConfig, ScalingPolicy};
use vmscale_control::{ControlLoop, RunSummary};
use vmscale_core::{ConfigError, ScaleConfig, ScaleMode};
use vmscale_forecast::PredictionTable;
use vmscale_sim::{Datacenter, DatacenterConfig, SimClock};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Signal source: predictive, reactive or static.
    #[arg(short, long)]
    pub mode: ScaleMode,

    /// Configuration file (vmscale.toml). Flags below override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Forecast CSV (predictive mode).
    #[arg(long)]
    pub table: Option<PathBuf>,

    /// Decision log destination (default: results_<mode>.csv).
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Unit whose forecast drives the fleet.
    #[arg(long, allow_negative_numbers = true)]
    pub tracked_unit: Option<i64>,

    #[arg(long)]
    pub initial_units: Option<u32>,

    #[arg(long)]
    pub workload_units: Option<u32>,

    #[arg(long)]
    pub high_threshold: Option<f64>,

    #[arg(long)]
    pub low_threshold: Option<f64>,

    #[arg(long)]
    pub min_units: Option<u32>,

    #[arg(long)]
    pub max_units: Option<u32>,

    #[arg(long)]
    pub step_up: Option<u32>,

    #[arg(long)]
    pub step_down: Option<u32>,

    /// Summary format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let mode = args.mode;
    if !matches!(args.format.as_str(), "text" | "json") {
        anyhow::bail!("unknown output format: {} (expected text or json)", args.format);
    }

    let config = resolve_config(&args)?;
    config.validate(mode)?;

    let log_path = config.log.resolved_path(mode);
    let mut control = build_loop(mode, &config, &log_path)?;

    let mut datacenter = Datacenter::new(
        DatacenterConfig::from(&config.simulation),
        config.fleet.initial_units,
        config.fleet.workload_units,
    );
    let mut clock = SimClock::new(config.simulation.tick_interval, config.simulation.max_time);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(%mode, log = %log_path.display(), "experiment starting");

    let summary = tokio::task::spawn_blocking(move || {
        control.run(&mut clock, &mut datacenter, &shutdown_rx)
    })
    .await
    .context("control loop task failed")??;

    println!("{}", render_summary(mode, &log_path, &summary, &args.format)?);
    Ok(())
}

/// Print the configuration that `run` would start from.
pub fn print_config(path: Option<&Path>) -> anyhow::Result<()> {
    let config = match path {
        Some(path) => ScaleConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ScaleConfig::default(),
    };
    print!("{}", config.to_toml_string()?);
    Ok(())
}

/// Load the config file (if any) and apply command-line overrides.
fn resolve_config(args: &RunArgs) -> anyhow::Result<ScaleConfig> {
    let mut config = match &args.config {
        Some(path) => ScaleConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ScaleConfig::default(),
    };

    if let Some(table) = &args.table {
        config.forecast.table = Some(table.clone());
    }
    if let Some(log) = &args.log {
        config.log.path = Some(log.clone());
    }
    if let Some(unit) = args.tracked_unit {
        config.forecast.tracked_unit = unit;
    }
    if let Some(n) = args.initial_units {
        config.fleet.initial_units = n;
    }
    if let Some(n) = args.workload_units {
        config.fleet.workload_units = n;
    }

    let policy = &mut config.policy;
    if let Some(v) = args.high_threshold {
        policy.high_threshold = v;
    }
    if let Some(v) = args.low_threshold {
        policy.low_threshold = v;
    }
    if let Some(v) = args.min_units {
        policy.min_units = v;
    }
    if let Some(v) = args.max_units {
        policy.max_units = v;
    }
    if let Some(v) = args.step_up {
        policy.scale_step_up = v;
    }
    if let Some(v) = args.step_down {
        policy.scale_step_down = v;
    }

    Ok(config)
}

fn build_policy(config: &ScaleConfig) -> anyhow::Result<ScalingPolicy> {
    ScalingPolicy::new(PolicyConfig::from(&config.policy)).context("invalid [policy] configuration")
}

fn build_loop(mode: ScaleMode, config: &ScaleConfig, log_path: &Path) -> anyhow::Result<ControlLoop> {
    let control = match mode {
        ScaleMode::Predictive => {
            let policy = build_policy(config)?;
            let path = config
                .forecast
                .table
                .as_deref()
                .ok_or(ConfigError::MissingTable)?;
            let table = PredictionTable::load(path)
                .with_context(|| format!("loading forecast table {}", path.display()))?;
            ControlLoop::predictive(
                Arc::new(table),
                config.forecast.tracked_unit,
                policy,
                log_path,
            )?
        }
        ScaleMode::Reactive => ControlLoop::reactive(build_policy(config)?, log_path)?,
        ScaleMode::Static => ControlLoop::baseline(config.forecast.tracked_unit, log_path)?,
    };
    Ok(control)
}

#[derive(Serialize)]
struct Report<'a> {
    mode: ScaleMode,
    log: String,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

fn render_summary(
    mode: ScaleMode,
    log_path: &Path,
    summary: &RunSummary,
    format: &str,
) -> anyhow::Result<String> {
    let report = Report {
        mode,
        log: log_path.display().to_string(),
        summary,
    };
    match format {
        "json" => Ok(serde_json::to_string_pretty(&report)?),
        _ => Ok(format!(
            "=== {} simulation finished ===\n\
             ticks:        {} ({} without signal)\n\
             scale ups:    {} (+{} units)\n\
             scale downs:  {} (-{} units)\n\
             fleet size:   {} final, {} peak\n\
             results saved to: {}",
            report.mode,
            summary.ticks,
            summary.missing_signals,
            summary.scale_ups,
            summary.units_added,
            summary.scale_downs,
            summary.units_removed,
            summary.final_size,
            summary.peak_size,
            report.log,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(mode: ScaleMode) -> RunArgs {
        RunArgs {
            mode,
            config: None,
            table: None,
            log: None,
            tracked_unit: None,
            initial_units: None,
            workload_units: None,
            high_threshold: None,
            low_threshold: None,
            min_units: None,
            max_units: None,
            step_up: None,
            step_down: None,
            format: "text".to_string(),
        }
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vmscale.toml");
        std::fs::write(
            &path,
            "[policy]\nhigh_threshold = 70.0\nmax_units = 6\n\n[fleet]\ninitial_units = 3\n",
        )
        .unwrap();

        let mut a = args(ScaleMode::Reactive);
        a.config = Some(path);
        a.max_units = Some(8);
        a.tracked_unit = Some(-1);

        let config = resolve_config(&a).unwrap();
        assert_eq!(config.policy.high_threshold, 70.0);
        assert_eq!(config.policy.max_units, 8);
        assert_eq!(config.fleet.initial_units, 3);
        assert_eq!(config.forecast.tracked_unit, -1);
    }

    #[test]
    fn invalid_policy_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(ScaleMode::Reactive);
        a.min_units = Some(5);
        a.max_units = Some(2);

        let config = resolve_config(&a).unwrap();
        let err = build_loop(ScaleMode::Reactive, &config, &dir.path().join("out.csv"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("exceeds max_units"));
    }

    #[test]
    fn missing_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(ScaleMode::Predictive);
        a.table = Some(dir.path().join("absent.csv"));

        let config = resolve_config(&a).unwrap();
        let err = build_loop(ScaleMode::Predictive, &config, &dir.path().join("out.csv"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("loading forecast table"));
    }

    #[test]
    fn static_loop_writes_header_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("static.csv");
        let config = resolve_config(&args(ScaleMode::Static)).unwrap();

        let _control = build_loop(ScaleMode::Static, &config, &log).unwrap();
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "time,slot,vm_id,pred_cpu,vm_count\n"
        );
    }

    #[test]
    fn summary_rendering() {
        let summary = RunSummary {
            ticks: 12,
            missing_signals: 2,
            scale_ups: 3,
            scale_downs: 1,
            units_added: 3,
            units_removed: 1,
            peak_size: 5,
            final_size: 4,
        };
        let path = Path::new("results_predictive.csv");

        let text = render_summary(ScaleMode::Predictive, path, &summary, "text").unwrap();
        assert!(text.starts_with("=== predictive simulation finished ==="));
        assert!(text.contains("fleet size:   4 final, 5 peak"));

        let json = render_summary(ScaleMode::Predictive, path, &summary, "json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mode"], "predictive");
        assert_eq!(value["ticks"], 12);
        assert_eq!(value["log"], "results_predictive.csv");
    }
}
