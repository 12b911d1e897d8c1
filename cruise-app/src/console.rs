//! Line-oriented operator console over the engine's control surface.

use anyhow::Result;
use cruise_engine::Engine;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,           // /start
    Stop,            // /stop
    Stats,           // /stats
    Debug,           // /debug
    ForceNavigation, // /next
    Help,            // /help
    Quit,            // /quit or /exit
    Unknown(String),
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Command::Unknown(trimmed.to_string());
    }
    let verb = trimmed.split_whitespace().next().unwrap_or_default();

    match verb {
        "/start" => Command::Start,
        "/stop" => Command::Stop,
        "/stats" => Command::Stats,
        "/debug" => Command::Debug,
        "/next" => Command::ForceNavigation,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

const HELP: &str = "\
/start  restart the automation (runs one tick immediately)
/stop   cancel ticking and print final counters
/stats  dump session state and configuration
/debug  enumerate the located content surface
/next   force a best-effort advance click
/quit   stop and leave";

/// Drive the console until `/quit` or EOF. The engine is expected to be
/// started already; this only relays operator commands.
pub async fn run(engine: Engine) -> Result<()> {
    println!("cruise console ready; /help for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Start => {
                engine.start();
                println!("started");
            }
            Command::Stop => {
                let snapshot = engine.stop().await;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Command::Stats => {
                let stats = engine.stats().await;
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            Command::Debug => match engine.debug_report().await {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => println!("no content surface located"),
            },
            Command::ForceNavigation => {
                if engine.force_navigation().await {
                    println!("advance control activated");
                } else {
                    println!("nothing that looks like an advance control");
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Unknown(raw) if !raw.is_empty() => {
                println!("unknown command: {raw}; /help for commands");
            }
            Command::Unknown(_) => {}
        }
    }

    let snapshot = engine.stop().await;
    println!(
        "done; {} question(s) answered this session",
        snapshot.questions_answered
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse() {
        assert_eq!(parse_command("/start"), Command::Start);
        assert_eq!(parse_command("  /stats  "), Command::Stats);
        assert_eq!(parse_command("/next"), Command::ForceNavigation);
        assert_eq!(parse_command("/exit"), Command::Quit);
    }

    #[test]
    fn unknown_input_is_preserved() {
        assert_eq!(
            parse_command("/reboot now"),
            Command::Unknown("/reboot now".to_string())
        );
        assert_eq!(
            parse_command("hello"),
            Command::Unknown("hello".to_string())
        );
    }
}
