//! Dashboard screenshot analyzer.
//!
//! Reads two dashboard screenshots, extracts widgets, optionally runs the
//! language-model analysis, and prints the result payload as JSON.

use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use analysis::{LanguageModel, OpenAiChat, ReportStore};
use vision::ocr::Ocr;

mod config;
mod health;
mod run;

struct Args {
    infrastructure: Option<String>,
    system: Option<String>,
    date: Option<String>,
    enable_analysis: bool,
    multi_widget: bool,
    health: bool,
    list_reports: bool,
    help: bool,
}

const USAGE: &str = "usage: dashlens <infrastructure.png> <system.png> \
[--date YYYY-MM-DD] [--no-analysis] [--no-multi-widget]\n       dashlens --health | --reports";

fn parse_args(mut argv: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args {
        infrastructure: None,
        system: None,
        date: None,
        enable_analysis: true,
        multi_widget: true,
        health: false,
        list_reports: false,
        help: false,
    };

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--health" => args.health = true,
            "--reports" => args.list_reports = true,
            "--no-analysis" => args.enable_analysis = false,
            "--no-multi-widget" => args.multi_widget = false,
            "--date" => {
                args.date = Some(argv.next().context("--date requires a value")?);
            }
            "--help" | "-h" => args.help = true,
            flag if flag.starts_with('-') => bail!("unknown flag {flag:?}\n{USAGE}"),
            positional => {
                if args.infrastructure.is_none() {
                    args.infrastructure = Some(positional.to_string());
                } else if args.system.is_none() {
                    args.system = Some(positional.to_string());
                } else {
                    bail!("unexpected argument {positional:?}\n{USAGE}");
                }
            }
        }
    }

    Ok(args)
}

fn main() -> ExitCode {
    // Structured logging. Use `RUST_LOG=info` etc.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let cfg = config::Config::load_or_default();

    if args.health {
        let health = health::check(&cfg);
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    if args.list_reports {
        let reports = ReportStore::new(&cfg.report_dir).list()?;
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let (Some(infra_path), Some(system_path)) = (&args.infrastructure, &args.system) else {
        bail!("{USAGE}");
    };

    let infra = std::fs::read(infra_path).with_context(|| format!("read {infra_path}"))?;
    let system = std::fs::read(system_path).with_context(|| format!("read {system_path}"))?;

    let recognizer = Ocr::try_new(
        &cfg.ocr.detection_model,
        &cfg.ocr.recognition_model,
        &cfg.ocr.charset,
    )?;

    let chat;
    let model: Option<&dyn LanguageModel> = if cfg.model.api_key.is_empty() {
        None
    } else {
        chat = OpenAiChat::new(cfg.model.clone());
        Some(&chat)
    };

    let store = ReportStore::new(&cfg.report_dir);
    let request = run::Request {
        infrastructure_image: &infra,
        system_image: &system,
        date: args.date.as_deref(),
        enable_analysis: args.enable_analysis,
        multi_widget: args.multi_widget,
    };

    let response = run::run(&cfg.extract, &recognizer, model, &store, &request)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
