use clap::Parser;

use cybench_core::EncryptionMode;
use cybench_script::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Interactive when stderr is a terminal, CSV otherwise.
    Auto,
    Interactive,
    Csv,
}

/// A `-D key=value` definition; values are integers or floats.
#[derive(Debug, Clone, PartialEq)]
pub struct Define {
    pub name: String,
    pub value: Value,
}

/// A `-w path[@weight]` workload selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub path: String,
    pub weight: u32,
}

fn parse_define(input: &str) -> Result<Define, String> {
    let (name, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{input}'"))?;
    if name.is_empty() {
        return Err(format!("expected KEY=VALUE, got '{input}'"));
    }

    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Define {
            name: name.to_string(),
            value: Value::Int(value),
        });
    }
    if let Ok(value) = raw.parse::<f64>() {
        return Ok(Define {
            name: name.to_string(),
            value: Value::Float(value),
        });
    }
    Err(format!(
        "--define values must be integers or floats, failing to parse '{raw}'"
    ))
}

fn parse_workload_spec(input: &str) -> Result<WorkloadSpec, String> {
    match input.rsplit_once('@') {
        Some((path, raw_weight)) => {
            let weight: u32 = raw_weight.parse().map_err(|_| {
                format!("workload weight after '@' must be an integer: '{input}'")
            })?;
            if weight == 0 {
                return Err(format!(
                    "workload weight after '@' must be at least 1: '{input}'"
                ));
            }
            Ok(WorkloadSpec {
                path: path.to_string(),
                weight,
            })
        }
        None => Ok(WorkloadSpec {
            path: input.to_string(),
            weight: 1,
        }),
    }
}

fn parse_encryption(input: &str) -> Result<EncryptionMode, String> {
    match input.to_ascii_lowercase().as_str() {
        "auto" => Ok(EncryptionMode::Auto),
        "true" | "yes" | "y" | "1" => Ok(EncryptionMode::On),
        "false" | "no" | "n" | "0" => Ok(EncryptionMode::Off),
        _ => Err(format!(
            "invalid encryption mode '{input}', needs to be one of 'auto', 'true' or 'false'"
        )),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "cybench",
    author,
    version,
    about = "cybench is a benchmarking tool for Cypher graph databases",
    long_about = "cybench drives a weighted mix of parameterized Cypher workloads against a \
                  target database at a controlled concurrency and rate, and reports throughput \
                  and latency percentiles.\n\nWorkloads are either builtin (builtin:tpcb-like, \
                  builtin:match-only) or script files in a small pgbench-like DSL.",
    after_help = "Examples:\n  cybench -c 8 -d 120\n  cybench --init -s 10\n  cybench -l -r 200 \
                  -c 4 mygraph\n  cybench -w read.script@9 -w write.script@1 -o csv"
)]
pub struct Cli {
    /// Run in initialization mode; for builtin workloads this creates the
    /// initial dataset, then exits
    #[arg(short = 'i', long)]
    pub init: bool,

    /// Sets the `scale` variable, impact depends on workload
    #[arg(short = 's', long, default_value_t = 1)]
    pub scale: i64,

    /// Number of concurrent clients / sessions
    #[arg(short = 'c', long, default_value_t = 1)]
    pub clients: usize,

    /// In latency mode (see -l) this sets transactions per second, total
    /// across all clients
    #[arg(short = 'r', long, default_value_t = 1.0)]
    pub rate: f64,

    /// Address to connect to, eg. neo4j://mydb:7687
    #[arg(short = 'a', long, default_value = "neo4j://localhost:7687")]
    pub address: String,

    /// Username
    #[arg(short = 'u', long, default_value = "neo4j")]
    pub user: String,

    /// Password
    #[arg(short = 'p', long, default_value = "neo4j")]
    pub password: String,

    /// Whether to use encryption: auto, true or false
    #[arg(short = 'e', long, default_value = "auto", value_parser = parse_encryption)]
    pub encryption: EncryptionMode,

    /// Seconds to run
    #[arg(short = 'd', long, default_value_t = 60)]
    pub duration: u64,

    /// Interval, in seconds, to report progress
    #[arg(long, default_value_t = 10)]
    pub progress: u64,

    /// Defines variables for workload scripts and query parameters
    /// (repeatable, KEY=VALUE)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    pub define: Vec<Define>,

    /// Workload to run, either a builtin: one or a path to a workload
    /// script, with an optional @weight (repeatable)
    #[arg(
        short = 'w',
        long = "workload",
        value_name = "PATH[@WEIGHT]",
        default_value = "builtin:tpcb-like",
        value_parser = parse_workload_spec
    )]
    pub workload: Vec<WorkloadSpec>,

    /// Run in latency testing mode rather than throughput mode
    #[arg(short = 'l', long)]
    pub latency: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Auto)]
    pub output: OutputFormat,

    /// Database name
    #[arg(value_name = "DBNAME")]
    pub database: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn defaults_match_the_documented_surface() {
        let cli = Cli::try_parse_from(["cybench"]).unwrap();
        assert!(!cli.init);
        assert_eq!(cli.scale, 1);
        assert_eq!(cli.clients, 1);
        assert_eq!(cli.rate, 1.0);
        assert_eq!(cli.address, "neo4j://localhost:7687");
        assert_eq!(cli.user, "neo4j");
        assert_eq!(cli.password, "neo4j");
        assert_eq!(cli.encryption, EncryptionMode::Auto);
        assert_eq!(cli.duration, 60);
        assert_eq!(cli.progress, 10);
        assert!(cli.define.is_empty());
        assert_eq!(
            cli.workload,
            vec![WorkloadSpec {
                path: "builtin:tpcb-like".to_string(),
                weight: 1,
            }]
        );
        assert!(!cli.latency);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert_eq!(cli.database, None);
    }

    #[test]
    fn parses_repeatable_workloads_with_weights() {
        let cli = Cli::try_parse_from([
            "cybench",
            "-w",
            "read.script@5",
            "-w",
            "write.script@5",
            "-d",
            "20",
        ])
        .unwrap();
        assert_eq!(
            cli.workload,
            vec![
                WorkloadSpec {
                    path: "read.script".to_string(),
                    weight: 5,
                },
                WorkloadSpec {
                    path: "write.script".to_string(),
                    weight: 5,
                },
            ]
        );
        assert_eq!(cli.duration, 20);
    }

    #[test]
    fn rejects_zero_and_garbage_weights() {
        assert!(Cli::try_parse_from(["cybench", "-w", "x.script@0"]).is_err());
        assert!(Cli::try_parse_from(["cybench", "-w", "x.script@ten"]).is_err());
    }

    #[test]
    fn parses_defines_as_ints_or_floats() {
        let cli = Cli::try_parse_from(["cybench", "-D", "n=100", "-D", "ratio=0.5"]).unwrap();
        assert_eq!(
            cli.define,
            vec![
                Define {
                    name: "n".to_string(),
                    value: Value::Int(100),
                },
                Define {
                    name: "ratio".to_string(),
                    value: Value::Float(0.5),
                },
            ]
        );

        assert!(Cli::try_parse_from(["cybench", "-D", "n=abc"]).is_err());
        assert!(Cli::try_parse_from(["cybench", "-D", "noequals"]).is_err());
    }

    #[test]
    fn encryption_accepts_the_documented_values() {
        for (value, expected) in [
            ("auto", EncryptionMode::Auto),
            ("true", EncryptionMode::On),
            ("false", EncryptionMode::Off),
            ("YES", EncryptionMode::On),
            ("0", EncryptionMode::Off),
        ] {
            let cli = Cli::try_parse_from(["cybench", "-e", value]).unwrap();
            assert_eq!(cli.encryption, expected, "{value}");
        }
        assert!(Cli::try_parse_from(["cybench", "-e", "maybe"]).is_err());
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = Cli::try_parse_from(["cybench", "--no-such-flag"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn positional_database_name() {
        let cli = Cli::try_parse_from(["cybench", "-c", "4", "mygraph"]).unwrap();
        assert_eq!(cli.database.as_deref(), Some("mygraph"));
        assert_eq!(cli.clients, 4);
    }
}
