use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context as _;

use cybench_core::runner::{self, BenchmarkConfig, StopSignal};
use cybench_core::{EncryptionMode, Neo4jClient, Workload};
use cybench_script::{ScriptSet, Value};

use crate::builtin;
use crate::cli::Cli;
use crate::exit_codes::ExitCode;
use crate::output;

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let out = output::formatter(cli.output);

    let mut variables: BTreeMap<String, Value> = BTreeMap::new();
    variables.insert("scale".to_string(), Value::Int(cli.scale));
    for define in &cli.define {
        variables.insert(define.name.clone(), define.value.clone());
    }

    let mut scripts = Vec::with_capacity(cli.workload.len());
    for spec in &cli.workload {
        let script = match builtin::builtin(&spec.path) {
            Some(builtin) => {
                let mut script = cybench_script::parse(builtin.name, builtin.source, spec.weight)
                    .with_context(|| format!("failed to parse builtin workload {}", builtin.name))?;
                script.readonly = builtin.readonly;
                script
            }
            None => {
                let source = std::fs::read_to_string(&spec.path)
                    .with_context(|| format!("failed to read workload file at {}", spec.path))?;
                cybench_script::parse(&spec.path, &source, spec.weight)?
            }
        };
        scripts.push(script);
    }

    let database = cli.database.clone().unwrap_or_default();

    let client = Arc::new(
        Neo4jClient::connect(&cli.address, &cli.user, &cli.password, cli.encryption)
            .await
            .with_context(|| format!("failed to connect to {}", cli.address))?,
    );

    if cli.init {
        if cli.workload.iter().any(|spec| builtin::builtin(&spec.path).is_some()) {
            eprintln!("initializing builtin dataset at scale {}", cli.scale);
            builtin::init_dataset(client.as_ref(), &database, cli.scale)
                .await
                .context("dataset initialization failed")?;
        }
        return Ok(ExitCode::Success);
    }

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let mut workload = Workload::new(variables, ScriptSet::new(scripts), seed);

    let stop = Arc::new(StopSignal::new());
    runner::install_signal_handler(stop.clone());

    let config = BenchmarkConfig {
        database: database.clone(),
        scenario: describe_scenario(&cli),
        clients: cli.clients,
        rate: cli.rate,
        latency_mode: cli.latency,
        duration: Duration::from_secs(cli.duration),
        progress_interval: Duration::from_secs(cli.progress.max(1)),
    };

    out.benchmark_start(&database, &cli.address);

    let result = runner::run_benchmark(client, &mut workload, &config, stop, out.progress())
        .await
        .context("benchmark run failed")?;

    for worker in &result.workers {
        if let Some(err) = &worker.error {
            out.error(&format!("worker {} failed: {err}", worker.worker_id));
        }
    }

    out.report(&result);

    let clean = result.total_failed() == 0 && result.workers.iter().all(|w| w.error.is_none());
    Ok(if clean {
        ExitCode::Success
    } else {
        ExitCode::Failed
    })
}

/// Restates the effective flags for the final report, so a run can be
/// reproduced from its own output.
fn describe_scenario(cli: &Cli) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    for spec in &cli.workload {
        if spec.weight == 1 {
            let _ = write!(out, " -w {}", spec.path);
        } else {
            let _ = write!(out, " -w {}@{}", spec.path, spec.weight);
        }
    }
    let _ = write!(out, " -c {}", cli.clients);
    let _ = write!(out, " -s {}", cli.scale);
    let _ = write!(out, " -d {}", cli.duration);
    let encryption = match cli.encryption {
        EncryptionMode::Auto => "auto",
        EncryptionMode::On => "true",
        EncryptionMode::Off => "false",
    };
    let _ = write!(out, " -e {encryption}");
    if cli.latency {
        let _ = write!(out, " -l -r {:.3}", cli.rate);
    }
    if cli.init {
        out.push_str(" -i");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    #[test]
    fn scenario_description_restates_the_flags() {
        let cli = Cli::try_parse_from([
            "cybench",
            "-w",
            "read.script@5",
            "-w",
            "write.script@5",
            "-c",
            "4",
            "-d",
            "20",
            "-l",
            "-r",
            "100",
        ])
        .unwrap();
        assert_eq!(
            describe_scenario(&cli),
            " -w read.script@5 -w write.script@5 -c 4 -s 1 -d 20 -e auto -l -r 100.000"
        );
    }

    #[test]
    fn scenario_description_defaults() {
        let cli = Cli::try_parse_from(["cybench"]).unwrap();
        assert_eq!(
            describe_scenario(&cli),
            " -w builtin:tpcb-like -c 1 -s 1 -d 60 -e auto"
        );
    }
}
