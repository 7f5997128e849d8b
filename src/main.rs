//! Gridmind - a terminal spreadsheet with AI-resolved cells.

mod tui;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use gridmind_ai::{HttpService, InstructionService};
use gridmind_core::Sheet;

fn print_usage() {
    eprintln!("Usage: gridmind [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --empty                   Start with an empty sheet (default: demo data)");
    eprintln!("  --config <FILE>           Load AI settings from FILE instead of the default");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GRIDMIND_API_KEY          API key for the AI service (AI disabled if unset)");
    eprintln!("  GRIDMIND_ENDPOINT         Override the AI service endpoint");
    eprintln!("  GRIDMIND_MODEL            Override the instruction model");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut empty = false;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--empty" => {
                empty = true;
            }
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a file path");
                    std::process::exit(1);
                }
                config_path = Some(PathBuf::from(&args[i]));
            }
            arg => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if let Err(e) = run(empty, config_path) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(empty: bool, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = gridmind_ai::load_settings(config_path.as_deref());

    let service: Option<Arc<dyn InstructionService>> = match gridmind_ai::api_key_from_env() {
        Some(api_key) => {
            let http = HttpService::new(&settings, api_key)
                .context("failed to construct AI service client")?;
            Some(Arc::new(http))
        }
        None => None,
    };

    let sheet = if empty {
        Sheet::new("project-1", "Untitled Sheet")
    } else {
        Sheet::with_demo_data()
    };

    let mut app = tui::App::new(sheet, service, settings.context_cap);
    tui::run(&mut app).context("terminal session failed")?;
    Ok(())
}
