use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use vf_blocks::BlockValue;
use vf_core::format_g;
use vf_scenario::{ModelDef, ScenarioResult};
use vf_sim::SimRecord;

#[derive(Parser)]
#[command(name = "vf-cli")]
#[command(about = "vectorflow CLI - vector block-diagram simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate scenario file syntax and values
    Validate {
        /// Path to the scenario file (.yaml or .json)
        scenario_path: PathBuf,
    },
    /// Run a scenario and print or export the recorded probes
    Run {
        /// Path to the scenario file (.yaml or .json)
        scenario_path: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// One trace line per recorded time point
    Text,
    /// Pretty-printed JSON document
    Json,
    /// Comma-separated columns, one per vector component
    Csv,
}

fn main() -> ScenarioResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            format,
            output,
        } => cmd_run(&scenario_path, format, output.as_deref()),
    }
}

fn cmd_validate(scenario_path: &Path) -> ScenarioResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = vf_scenario::load(scenario_path)?;
    let built = scenario.build()?;
    println!("✓ Scenario is valid");
    println!("  Name: {}", scenario.name);
    println!("  Model: {}", scenario.model.kind_name());
    println!("  Blocks: {}", built.model.vector_count() + built.model.scalar_count());
    println!("  States: {}", built.model.integrator_count());
    let probes: Vec<&str> = built.probes.iter().map(|p| p.name.as_str()).collect();
    println!("  Probes: {}", probes.join(", "));
    Ok(())
}

fn cmd_run(scenario_path: &Path, format: Format, output: Option<&Path>) -> ScenarioResult<()> {
    let scenario = vf_scenario::load(scenario_path)?;

    let start = Instant::now();
    let record = scenario.run()?;
    info!(
        points = record.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "run finished"
    );

    let rendered = match format {
        Format::Text => render_text(&record),
        Format::Json => {
            let doc = json!({
                "scenario": scenario.name,
                "model": scenario.model.kind_name(),
                "parameters": model_parameters(&scenario.model),
                "record": record_json(&record),
            });
            let mut s = serde_json::to_string_pretty(&doc)?;
            s.push('\n');
            s
        }
        Format::Csv => render_csv(&record),
    };

    if let Some(path) = output {
        std::fs::write(path, rendered)?;
        println!(
            "✓ Wrote {} time points to {}",
            record.len(),
            path.display()
        );
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
    }

    Ok(())
}

fn render_text(record: &SimRecord) -> String {
    let mut out = String::new();
    for (t, row) in record.t.iter().zip(&record.samples) {
        out.push_str(&format!("t={:<10}", format_g(*t)));
        for (name, value) in record.names.iter().zip(row) {
            out.push_str(&format!(" {name}:{value}"));
        }
        out.push('\n');
    }
    out
}

fn sample_json(value: &BlockValue) -> Value {
    match value {
        BlockValue::Vector(v) => json!([v.x(), v.y(), v.z()]),
        BlockValue::Scalar(s) => json!(s),
    }
}

fn record_json(record: &SimRecord) -> Value {
    let series: serde_json::Map<String, Value> = record
        .names
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let values: Vec<Value> = record
                .samples
                .iter()
                .map(|row| sample_json(&row[col]))
                .collect();
            (name.clone(), Value::Array(values))
        })
        .collect();
    json!({ "t": record.t, "series": series })
}

fn model_parameters(model: &ModelDef) -> Value {
    match model {
        ModelDef::Ballistic { gravity, drag, .. } => {
            json!({ "gravity": [gravity.x(), gravity.y(), gravity.z()], "drag": drag })
        }
        ModelDef::Orbit { mu, .. } => json!({ "mu": mu }),
        ModelDef::ConstantRate { rate, .. } => json!({ "rate": [rate.x(), rate.y(), rate.z()] }),
    }
}

fn render_csv(record: &SimRecord) -> String {
    let mut header = vec!["time_s".to_string()];
    if let Some(first) = record.samples.first() {
        for (name, value) in record.names.iter().zip(first) {
            match value {
                BlockValue::Vector(_) => {
                    header.extend(["x", "y", "z"].map(|axis| format!("{name}_{axis}")));
                }
                BlockValue::Scalar(_) => header.push(name.clone()),
            }
        }
    }

    let mut csv = header.join(",");
    csv.push('\n');
    for (t, row) in record.t.iter().zip(&record.samples) {
        let mut fields = vec![t.to_string()];
        for value in row {
            match value {
                BlockValue::Vector(v) => {
                    fields.extend([v.x(), v.y(), v.z()].map(|c| c.to_string()));
                }
                BlockValue::Scalar(s) => fields.push(s.to_string()),
            }
        }
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }
    csv
}
