//! Preset reflection tool
//!
//! Loads a YAML preset manifest, reflects every pass, and prints the result as
//! JSON. Shader files are looked up relative to the manifest directory.

use clap::Parser;
use shader_contract_tool::ReflectedPreset;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(version, about = "Reflect every pass of a preset manifest")]
struct Args {
    /// Preset manifest (YAML)
    manifest: PathBuf,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    shader_contract_tool::init_logging(args.verbose);

    if !args.manifest.exists() {
        eprintln!("Error: Manifest file '{}' does not exist", args.manifest.display());
        process::exit(1);
    }

    let manifest_dir = args.manifest.parent().unwrap_or(Path::new(".")).to_path_buf();
    let load_file = |file: &str| -> Result<Vec<u8>, std::io::Error> {
        let path = manifest_dir.join(file);
        std::fs::read(&path).inspect_err(|e| {
            tracing::error!("Error reading file {path:?}: {e}");
        })
    };

    let preset = match ReflectedPreset::from_file(&args.manifest, load_file) {
        Ok(preset) => preset,
        Err(e) => {
            eprintln!("Error reflecting preset '{}': {e}", args.manifest.display());
            process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&preset) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: Failed to serialize preset: {e}");
            process::exit(1);
        }
    }
}
