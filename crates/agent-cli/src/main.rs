mod config;

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::mpsc;

use agent_core::{AgentEvent, Conversation, ToolRegistry};
use agent_llm::OpenAIProvider;
use agent_loop::{AgentLoopConfig, ChatSession, ToolOrchestrator, TurnOutcome, FOLLOW_UP_QUESTION};
use agent_tools::{weather_registry, WeatherTool, WeatherUnits};

use crate::config::AppConfig;

const CHAT_SYSTEM_PROMPT: &str = "You are a helpful chatbot. Explain things so a 10-year-old can understand. Be clear, simple, and friendly.";

const WEATHER_SYSTEM_PROMPT: &str = "You are a helpful weather advice assistant. If you need current weather, call the tool get_current_weather. After weather is available, give: (1) clothing suggestions and (2) outdoor activity ideas.";

const SELF_CHECK_LOCATIONS: [&str; 2] = ["Syracuse, NY, US", "Lima, Peru"];

#[derive(Parser)]
#[command(name = "weather-chat")]
#[command(about = "Chat with a language model that can look up the current weather")]
#[command(version)]
struct Cli {
    /// Enable debug logging and token estimates
    #[arg(long, short, default_value = "false")]
    debug: bool,

    /// Use the advanced model
    #[arg(long, default_value = "false")]
    advanced: bool,

    /// Override the configured model
    #[arg(long)]
    model: Option<String>,

    /// Override the context budget (estimated tokens)
    #[arg(long)]
    budget: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive chat with a yes/no follow-up after every answer
    Chat {
        /// Let the model look up the current weather
        #[arg(long, default_value = "false")]
        tools: bool,
    },
    /// One-shot clothing and activity advice based on the current weather
    Advise {
        /// What you want to know
        prompt: String,
        /// Location used when the request names none
        #[arg(long)]
        location: Option<String>,
        /// imperial or metric
        #[arg(long)]
        units: Option<WeatherUnits>,
    },
    /// Look up Syracuse, NY, US and Lima, Peru directly
    WeatherCheck {
        #[arg(long)]
        units: Option<WeatherUnits>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = AppConfig::load().context("failed to load configuration")?;
    if let Some(budget) = cli.budget {
        config.token_budget = budget;
    }
    let model = config
        .active_model(cli.model.as_deref(), cli.advanced)
        .to_string();

    if cli.debug {
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
        eprintln!(
            "{}",
            format!(
                "[DEBUG] Model: {}, budget: {} tokens",
                model, config.token_budget
            )
            .dimmed()
        );
    }

    match cli.command {
        Commands::Chat { tools } => run_interactive_chat(&config, &model, tools, cli.debug).await,
        Commands::Advise {
            prompt,
            location,
            units,
        } => run_advice(&config, &model, &prompt, location, units, cli.debug).await,
        Commands::WeatherCheck { units } => run_weather_check(&config, units).await,
    }
}

fn build_provider(config: &AppConfig, model: &str) -> anyhow::Result<Arc<OpenAIProvider>> {
    let mut provider = OpenAIProvider::new(config.require_openai_key()?)
        .with_model(model)
        .with_temperature(config.temperature);
    if let Some(api_base) = &config.api_base {
        provider = provider.with_base_url(api_base);
    }
    if let Some(timeout) = config.request_timeout() {
        provider = provider.with_timeout(timeout);
    }
    Ok(Arc::new(provider))
}

fn build_weather_tool(config: &AppConfig, units: WeatherUnits) -> anyhow::Result<WeatherTool> {
    Ok(WeatherTool::new(config.require_openweather_key()?)
        .with_default_location(config.default_location.clone())
        .with_default_units(units))
}

fn loop_config(config: &AppConfig, system_prompt: &str) -> AgentLoopConfig {
    AgentLoopConfig {
        system_prompt: system_prompt.to_string(),
        token_budget: config.token_budget,
        temperature: Some(config.temperature),
        request_timeout: config.request_timeout(),
        ..AgentLoopConfig::default()
    }
}

/// Poll `turn` to completion while rendering the events it emits.
async fn drive<F, T>(turn: F, events: &mut mpsc::Receiver<AgentEvent>, debug: bool) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(turn);
    let output = loop {
        tokio::select! {
            output = &mut turn => break output,
            Some(event) = events.recv() => render_event(event, debug),
        }
    };
    while let Ok(event) = events.try_recv() {
        render_event(event, debug);
    }
    output
}

fn render_event(event: AgentEvent, debug: bool) {
    if let AgentEvent::Token { content } = &event {
        print!("{}", content);
        let _ = io::stdout().flush();
        return;
    }
    if let Some(line) = status_line(&event, debug) {
        eprintln!("{}", line);
    }
}

/// Stderr text for a progress event. Tokens go to stdout instead, and errors
/// are reported by the caller from the returned error.
fn status_line(event: &AgentEvent, debug: bool) -> Option<String> {
    match event {
        AgentEvent::Token { .. } | AgentEvent::Error { .. } => None,
        AgentEvent::ToolStart {
            tool_name,
            arguments,
            ..
        } => Some(format!("[tool] {} {}", tool_name, arguments).cyan().to_string()),
        AgentEvent::ToolComplete { result, .. } => debug.then(|| {
            format!("[tool] {} -> {}", result.tool_name, result.payload)
                .dimmed()
                .to_string()
        }),
        AgentEvent::ToolError { error, .. } => {
            Some(format!("[tool] failed: {}", error).yellow().to_string())
        }
        AgentEvent::TokenBudgetUpdated { usage } => {
            let mut line = format!(
                "Estimated tokens sent: {} / {}",
                usage.total_tokens, usage.budget_limit
            )
            .dimmed()
            .to_string();
            if debug && usage.truncation_occurred {
                line.push('\n');
                line.push_str(
                    &format!("[DEBUG] {} older message(s) left out", usage.messages_dropped)
                        .dimmed()
                        .to_string(),
                );
            }
            Some(line)
        }
        AgentEvent::Complete { usage } => debug.then(|| {
            format!(
                "[DEBUG] ~{} prompt + ~{} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            )
            .dimmed()
            .to_string()
        }),
    }
}

async fn run_interactive_chat(
    config: &AppConfig,
    model: &str,
    with_tools: bool,
    debug: bool,
) -> anyhow::Result<()> {
    let llm = build_provider(config, model)?;
    let (tools, system_prompt) = if with_tools {
        let tool = build_weather_tool(config, config.units)?;
        (weather_registry(tool)?, WEATHER_SYSTEM_PROMPT)
    } else {
        (ToolRegistry::new(), CHAT_SYSTEM_PROMPT)
    };

    let (event_tx, mut event_rx) = mpsc::channel::<AgentEvent>(100);
    let mut chat = ChatSession::new(llm, Arc::new(tools), loop_config(config, system_prompt))
        .with_events(event_tx);

    println!("{}", "Interactive chat started. Type 'exit' to quit.".green());
    if debug {
        eprintln!("{}", format!("[DEBUG] Session: {}", chat.session_id()).dimmed());
    }

    let stdin = io::stdin();
    loop {
        print!("{} ", ">".bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input == "exit" || input == "quit" {
            break;
        }

        match drive(chat.handle_input(input), &mut event_rx, debug).await {
            Ok(TurnOutcome::Answered { .. }) => {
                // streamed tokens already showed the answer body
                println!("\n\n{}", FOLLOW_UP_QUESTION.bold());
            }
            Ok(TurnOutcome::Acknowledged { message }) => println!("{}", message),
            Ok(TurnOutcome::Reprompt { message }) => println!("{}", message.yellow()),
            Ok(TurnOutcome::Ignored) => {}
            Err(error) => eprintln!("{}", format!("Error: {}", error).red()),
        }
    }

    Ok(())
}

async fn run_advice(
    config: &AppConfig,
    model: &str,
    prompt: &str,
    location: Option<String>,
    units: Option<WeatherUnits>,
    debug: bool,
) -> anyhow::Result<()> {
    let llm = build_provider(config, model)?;
    let units = units.unwrap_or(config.units);
    let location = location
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| config.default_location.clone());

    let tool = build_weather_tool(config, units)?.with_default_location(location.clone());
    let tools = Arc::new(weather_registry(tool)?);

    let (event_tx, mut event_rx) = mpsc::channel::<AgentEvent>(100);
    let orchestrator =
        ToolOrchestrator::new(llm, tools, loop_config(config, WEATHER_SYSTEM_PROMPT)).with_events(event_tx);
    let mut conversation = Conversation::new(WEATHER_SYSTEM_PROMPT);

    let request = format!(
        "User default location is: {location}. Units: {units}.\n\nUser request: {prompt}\n\nIMPORTANT: If the user did not specify a location, use the default location."
    );

    let outcome = drive(orchestrator.run(&request, &mut conversation), &mut event_rx, debug).await?;
    println!();

    if outcome.used_tools {
        println!("\n{}", "Weather used:".bold());
        for result in &outcome.tool_results {
            println!("{}", serde_json::to_string_pretty(&result.payload)?);
        }
    }

    Ok(())
}

async fn run_weather_check(config: &AppConfig, units: Option<WeatherUnits>) -> anyhow::Result<()> {
    let units = units.unwrap_or(config.units);
    let tool = build_weather_tool(config, units)?;

    let mut failures = 0;
    for location in SELF_CHECK_LOCATIONS {
        match tool.lookup(location, units).await {
            Ok(report) => {
                println!("{} {}", "✓".green(), location.bold());
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Err(error) => {
                failures += 1;
                println!("{} {}: {}", "✗".red(), location.bold(), error);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} weather lookups failed", failures, SELF_CHECK_LOCATIONS.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use agent_core::TokenBudgetUsage;

    #[test]
    fn backend_errors_are_not_rendered_from_events() {
        let event = AgentEvent::Error {
            message: "backend unavailable: connection refused".to_string(),
        };

        assert!(status_line(&event, false).is_none());
        assert!(status_line(&event, true).is_none());
    }

    #[test]
    fn budget_line_reports_estimate_and_truncation_in_debug() {
        colored::control::set_override(false);
        let event = AgentEvent::TokenBudgetUpdated {
            usage: TokenBudgetUsage {
                system_tokens: 10,
                window_tokens: 32,
                total_tokens: 42,
                budget_limit: 800,
                truncation_occurred: true,
                messages_dropped: 3,
            },
        };

        assert_eq!(
            status_line(&event, false).as_deref(),
            Some("Estimated tokens sent: 42 / 800")
        );
        let debug_line = status_line(&event, true).unwrap_or_default();
        assert!(debug_line.ends_with("[DEBUG] 3 older message(s) left out"));
    }

    #[test]
    fn tool_failures_are_shown() {
        let event = AgentEvent::ToolError {
            tool_call_id: "call_1".to_string(),
            error: "Not found: city not found".to_string(),
        };

        let line = status_line(&event, false).unwrap_or_default();
        assert!(line.contains("[tool] failed: Not found: city not found"));
    }
}
