//! Standalone binary to validate tool registry files (YAML/JSON).
//! Used by CI to ensure descriptor files load and satisfy every invariant.
//!
//! Usage: `validate_tools [DIR]` (defaults to `$AI_TOOLS_REGISTRY_DIR`, then `tools/`).

use ai_lib_tools::registry;
use anyhow::Context;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    ai_lib_tools::logging::init_tracing();

    let dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("AI_TOOLS_REGISTRY_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tools"));

    println!("Using registry directory: {}", dir.display());
    let results = registry::load_dir(&dir)
        .with_context(|| format!("cannot read registry directory {}", dir.display()))?;
    if results.is_empty() {
        println!("No registry files found");
        return Ok(());
    }

    let mut errors = Vec::new();
    println!("\n=== Validating Tool Registries ===");
    for (path, result) in &results {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match result {
            Ok((integration, reg)) => {
                println!("{} ({}, {} tools) ✅", name, integration, reg.len())
            }
            Err(e) => {
                println!("{} ❌", name);
                errors.push(format!("  {}: {}", name, e));
            }
        }
    }

    println!("\n=== Summary ===");
    if errors.is_empty() {
        println!("✅ All {} registry files are valid!", results.len());
        Ok(())
    } else {
        println!("❌ Found {} validation error(s):\n", errors.len());
        for err in &errors {
            println!("{}", err);
        }
        std::process::exit(1);
    }
}
