use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::debug;
use pole_core::core_api::{CoreErrorCode, Engine, EngineOptions, PackSummary, UnpackSummary};
use pole_core::slot::LengthPolicy;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Convert Pole Chudes POLE.OVL dictionaries to editable text and back",
    after_help = "Usually: unpack .ovl to .txt or pack .txt to .ovl"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a binary dictionary into [key] sections of words.
    Unpack {
        #[arg(value_name = "POLE.OVL")]
        input: PathBuf,
        #[arg(value_name = "DICT.TXT")]
        output: PathBuf,
        /// Fail on slot length bytes above 20 instead of clamping them.
        #[arg(long = "strict-lengths")]
        strict_lengths: bool,
        #[arg(long)]
        json: bool,
    },
    /// Encode a text dictionary back into the binary format.
    Pack {
        #[arg(value_name = "DICT.TXT")]
        input: PathBuf,
        #[arg(value_name = "POLE.OVL")]
        output: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Unpack {
            input,
            output,
            strict_lengths,
            json,
        } => {
            let length_policy = if strict_lengths {
                LengthPolicy::Reject
            } else {
                LengthPolicy::Clamp
            };
            let engine = Engine::with_options(EngineOptions { length_policy });
            debug!("unpacking {} -> {}", input.display(), output.display());
            let summary = engine.unpack_file(&input, &output).unwrap_or_else(|e| {
                eprintln!("Error unpacking {}", input.display());
                eprintln!("  {e}");
                process::exit(1);
            });
            if json {
                print_json(&summary);
            } else {
                print_unpack_summary(&summary);
            }
        }
        Command::Pack {
            input,
            output,
            json,
        } => {
            let engine = Engine::new();
            debug!("packing {} -> {}", input.display(), output.display());
            let summary = match engine.pack_file(&input, &output) {
                Ok(summary) => summary,
                Err(e) => {
                    eprintln!("Error packing {}", input.display());
                    eprintln!("  {e}");
                    // The document was refused before anything was written.
                    let status = match e.code {
                        CoreErrorCode::InsufficientEntries | CoreErrorCode::Encoding => 0,
                        _ => 1,
                    };
                    process::exit(status);
                }
            };
            if json {
                print_json(&summary);
            } else {
                print_pack_summary(&summary, &output);
            }
        }
    }
}

fn print_unpack_summary(summary: &UnpackSummary) {
    println!("TOTAL: {}", summary.actual_count);
    if summary.count_matches() {
        println!("Database header count matches");
    } else {
        println!(
            "MISMATCH: header count = {}, actual = {}",
            summary.expected_count, summary.actual_count
        );
    }
}

fn print_pack_summary(summary: &PackSummary, output: &Path) {
    println!(
        "Wrote {} keys, {} key-value pairs",
        summary.keys, summary.entries
    );
    if summary.truncated > 0 {
        println!(
            "{} fields were cut to 20 bytes in {}",
            summary.truncated,
            output.display()
        );
    }
}

fn print_json<T: Serialize>(summary: &T) {
    let rendered = serde_json::to_string_pretty(summary).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}
