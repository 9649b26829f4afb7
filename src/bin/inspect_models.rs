//! Inspect a models directory without starting the server.
//!
//! Lists every pair the server would register and the file chosen for each
//! artifact role. With `--read`, also reads the artifacts and reports sizes.
//!
//! Usage:
//!   cargo run --bin inspect-models                 # Scan MODELS_DIR (defaults to models)
//!   cargo run --bin inspect-models -- path/to/dir  # Scan a specific directory
//!   cargo run --bin inspect-models -- --read       # Also read artifact bytes

use anyhow::Result;
use lingo_relay::config::Config;
use lingo_relay::registry::ModelRegistry;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lingo_relay=warn".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let read_bytes = args.iter().any(|arg| arg == "--read");
    let root = match args.iter().find(|arg| !arg.starts_with("--")) {
        Some(dir) => PathBuf::from(dir),
        None => Config::from_env()?.models_dir,
    };

    let registry = ModelRegistry::new();
    let descriptors = registry.scan(&root)?;

    println!("{} pair(s) in {}", descriptors.len(), root.display());
    for descriptor in &descriptors {
        let files = descriptor.files();
        println!("\n{}", descriptor.key());
        println!("  weights:      {}", files.weights);
        println!("  lexicon:      {}", files.lexicon);
        println!("  source vocab: {}", files.source_vocab);
        println!("  target vocab: {}", files.target_vocab);

        if read_bytes {
            match descriptor.load_artifacts().await {
                Ok(artifacts) => println!("  total bytes:  {}", artifacts.total_bytes()),
                Err(e) => println!("  unreadable:   {}", e),
            }
        }
    }

    Ok(())
}
