//! `medibook doctor` — Diagnose system health.

use medibook_config::AppConfig;
use medibook_core::provider::Provider;
use medibook_providers::OpenAiCompatProvider;

use crate::runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 MediBook Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — run `medibook onboard` (using defaults)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found.");
            return Ok(());
        }
    };

    match runtime::load_directory(&config) {
        Ok(directory) => println!(
            "  ✅ Clinic directory: {} clinics, {} services, {} doctors",
            directory.clinics.len(),
            directory.services.len(),
            directory.doctors.len()
        ),
        Err(e) => {
            println!("  ❌ Clinic directory unusable: {e}");
            issues += 1;
        }
    }

    match OpenAiCompatProvider::from_config(&config.agent) {
        Ok(provider) => {
            println!("  ✅ API key configured");
            match provider.health_check().await {
                Ok(true) => println!("  ✅ Agent service reachable at {}", config.agent.endpoint),
                Ok(false) => {
                    println!("  ⚠️  Agent service at {} answered with an error", config.agent.endpoint);
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Agent service unreachable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ⚠️  {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
