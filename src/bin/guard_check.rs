//! One-shot transaction check
//! Usage: cargo run --bin guard_check -- --tx tx.json [--unified] [--config config.yaml]
//!
//! Exit codes: 0 allowed, 1 error, 2 blocked.

use std::path::PathBuf;
use tx_guard::config::AppConfig;
use tx_guard::models::{Transaction, UnifiedTransaction, ValidationResult};
use tx_guard::PolicyGuard;

struct Args {
    tx_path: PathBuf,
    unified: bool,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut tx_path = None;
    let mut unified = false;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tx" => {
                if i + 1 < args.len() {
                    tx_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("ERROR: --tx requires a value");
                    std::process::exit(1);
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("ERROR: --config requires a value");
                    std::process::exit(1);
                }
            }
            "--unified" => {
                unified = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: guard_check --tx FILE [--unified] [--config FILE]");
                println!("  --tx FILE       Transaction JSON to check");
                println!("  --unified       Treat the file as a multi-chain transaction");
                println!("  --config FILE   Config file (default: config.yaml if present)");
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                std::process::exit(1);
            }
        }
    }

    match tx_path {
        Some(tx_path) => Args {
            tx_path,
            unified,
            config_path,
        },
        None => {
            eprintln!("ERROR: --tx is required");
            std::process::exit(1);
        }
    }
}

fn print_report(tx_id: &str, result: &ValidationResult) -> anyhow::Result<()> {
    println!("=== Transaction Guard Check ===");
    println!("Transaction: {}", tx_id);
    println!();

    if result.warnings.is_empty() {
        println!("✅ No security issues detected");
    } else {
        for warning in &result.warnings {
            println!("{}", warning.format_terminal());
        }
    }

    if result.is_valid {
        println!("Verdict: ALLOWED");
    } else {
        let codes: Vec<String> = result.blocked_by.iter().map(|p| p.to_string()).collect();
        println!("Verdict: BLOCKED by {}", codes.join(", "));
    }

    println!();
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let args = parse_args();

    let config = match args.config_path {
        Some(ref path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    config.validate()?;

    let guard = PolicyGuard::from_app_config(&config)?;

    let raw = std::fs::read_to_string(&args.tx_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.tx_path.display(), e))?;

    let (tx_id, result) = if args.unified {
        let tx: UnifiedTransaction = serde_json::from_str(&raw)?;
        let result = guard.validate_unified_transaction(&tx).await;
        (tx.id, result)
    } else {
        let tx: Transaction = serde_json::from_str(&raw)?;
        let result = guard.validate_transaction(&tx).await;
        (tx.id, result)
    };

    print_report(&tx_id, &result)?;

    if !result.is_valid {
        std::process::exit(2);
    }

    Ok(())
}
