//! `codewright init`: Write a default configuration file.

use codewright_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🛠  Codewright — Setup");
    println!("======================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run init.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Export an API key:");
    println!("        export DEEPSEEK_API_KEY=sk-...      (DeepSeek models)");
    println!("        export OPENROUTER_API_KEY=sk-or-... (OpenRouter models)");
    println!("   2. Run `codewright chat` inside your project.\n");

    Ok(())
}
