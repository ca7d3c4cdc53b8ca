//! `medibook chat` — Interactive or single-message chat mode.

use medibook_agent::MessageHandler;
use medibook_channels::CliChannel;
use medibook_config::AppConfig;
use medibook_core::channel::Channel;
use medibook_core::event::EventBus;
use medibook_core::message::Message;
use std::io::Write;
use std::sync::Arc;

use crate::runtime;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured for the agent service!");
        eprintln!();
        eprintln!("  Set the environment variable:");
        eprintln!("    MEDIBOOK_API_KEY=...");
        eprintln!();
        eprintln!("  Or add it to the [agent] section of your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let event_bus = Arc::new(EventBus::default());
    runtime::spawn_event_logger(&event_bus);
    let agent = Arc::new(runtime::build_agent(&config, event_bus.clone())?);

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = agent.process_message(vec![Message::user(msg)]).await;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  {} — Interactive Mode", config.bot.display_name);
    println!();
    println!("  Agent:     {}", config.agent.endpoint);
    println!("  Model:     {}", config.agent.model.as_deref().unwrap_or("(service default)"));
    println!("  Tools:     search_clinics, search_services, search_doctors,");
    println!("             check_doctor_schedule, find_available_doctors");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let channel = Arc::new(CliChannel::new(config.bot.bot_id.clone()));
    let handler = MessageHandler::new(agent, channel.clone(), event_bus)
        .with_history_limit(config.orchestration.history_limit);
    let mut rx = channel.start().await.map_err(|e| format!("Channel error: {e}"))?;

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(result) = rx.recv().await {
        match result {
            Ok(chan_msg) => {
                // The channel prints the reply itself
                handler.handle(chan_msg).await;
                print!("  You > ");
                std::io::stdout().flush()?;
            }
            Err(e) => {
                eprintln!("  [Channel Error] {e}");
                break;
            }
        }
    }

    println!();
    println!("  Tạm biệt! 👋");
    println!();
    Ok(())
}
