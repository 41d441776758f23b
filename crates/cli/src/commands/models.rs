//! `codewright models`: Show the model catalog.

use codewright_config::AppConfig;
use codewright_providers::router::build_from_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let router = build_from_config(&config);

    println!("🤖 Model Catalog");
    println!("================");
    println!();
    for (name, model) in &config.models {
        let default = if *name == config.default_model { " (default)" } else { "" };
        let reasoning = if model.supports_reasoning { " 💭" } else { "" };
        let status = match router.resolve(name) {
            Ok(_) => "✓".to_string(),
            Err(e) => format!("✗ {e}"),
        };
        println!("  {name}{default}{reasoning}");
        println!("      {} via {} — {status}", model.display_name, model.provider);
    }
    println!();
    println!("  💭 = streams reasoning");
    println!("  Switch with `/model set <name>` in a chat, or `codewright chat --model <name>`.");

    Ok(())
}
