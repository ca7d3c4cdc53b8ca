//! `medibook config` — Configuration management commands.

use medibook_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if !config.has_api_key() {
                warnings.push("No API key set (set MEDIBOOK_API_KEY or agent.api_key)".to_string());
            }

            if let Some(path) = &config.directory.path {
                if !path.exists() {
                    warnings.push(format!("Clinic directory not found: {}", path.display()));
                }
            }

            if config.orchestration.history_limit == 0 {
                warnings.push("orchestration.history_limit is 0; only the latest message is sent".to_string());
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Agent:       {}", config.agent.endpoint);
            println!("   Model:       {}", config.agent.model.as_deref().unwrap_or("(service default)"));
            println!("   Iterations:  {}", config.orchestration.max_iterations);
            println!("   Bot id:      {}", config.bot.bot_id);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.agent.api_key.is_some() {
        config.agent.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
