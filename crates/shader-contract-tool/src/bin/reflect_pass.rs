//! Single pass reflection tool
//!
//! Validates a compiled vertex/fragment pair against the binding contract and
//! prints its reflection as JSON.

use clap::Parser;
use shader_contract::reflect_spirv_bytes;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(version, about = "Reflect a vertex/fragment SPIR-V pair")]
struct Args {
    /// Vertex shader SPIR-V file
    vertex: PathBuf,

    /// Fragment shader SPIR-V file
    fragment: PathBuf,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| {
        eprintln!("Error: Failed to read '{}': {e}", path.display());
        process::exit(1);
    })
}

fn main() {
    let args = Args::parse();
    shader_contract_tool::init_logging(args.verbose);

    let vertex = read(&args.vertex);
    let fragment = read(&args.fragment);

    let reflection = match reflect_spirv_bytes(&vertex, &fragment) {
        Ok(reflection) => reflection,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&reflection) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: Failed to serialize reflection: {e}");
            process::exit(1);
        }
    }
}
