// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phantom Go CLI - headless match client
//!
//! Joins a match on a Phantom Go server, keeps the board in sync in the
//! background and reads moves from stdin. Mostly used to exercise the
//! client against a live server.

use anyhow::{anyhow, Context, Result};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, Naming};
use std::path::PathBuf;

fn init_logging() -> Result<()> {
    let log_dir = match std::env::consts::OS {
        "macos" => {
            let mut path = PathBuf::from(std::env::var("HOME")?);
            path.push("Library");
            path.push("Logs");
            path.push("phantomgo-cli");
            path
        }
        _ => {
            let mut path = PathBuf::from(".");
            path.push("logs");
            path
        }
    };

    std::fs::create_dir_all(&log_dir)?;

    Logger::try_with_env_or_str("info")?
        .log_to_file(
            FileSpec::default()
                .directory(&log_dir)
                .basename("phantomgo-cli")
                .suffix("log"),
        )
        .rotate(
            Criterion::Size(64 * 1024 * 1024),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(5),
        )
        .start()?;

    Ok(())
}

static LOGGER_INIT: std::sync::Once = std::sync::Once::new();

fn ensure_logging_initialized() -> Result<()> {
    let mut result = Ok(());
    LOGGER_INIT.call_once(|| {
        if let Err(e) = init_logging() {
            result = Err(e);
        }
    });
    result
}

mod render;

use clap::{Parser, ValueEnum};
use phantomgo_client::config::{load_config, load_config_from};
use phantomgo_client::gateway::{HttpGateway, ScoreReply};
use phantomgo_client::{
    ClientError, ClientEvent, GuessMode, MatchClient, MatchService, Session, SyncExit,
};
use phantomgo_core::{Coord, Role};
use tokio::io::AsyncBufReadExt;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(
    name = "phantomgo-cli",
    about = "Phantom Go match client",
    version
)]
struct Args {
    /// Server base URL, overrides the config file
    #[clap(short, long)]
    server: Option<String>,

    /// Match to join
    #[clap(short, long = "match")]
    match_id: Option<String>,

    /// Session token issued by the server
    #[clap(short, long, default_value = "")]
    token: String,

    /// Seat to take in the match
    #[clap(short, long, value_enum, default_value = "spectator")]
    role: RoleArg,

    /// Path to a client.toml, instead of the per-user one
    #[clap(long)]
    config: Option<PathBuf>,

    /// Print debug logs to the terminal
    #[clap(long)]
    debug: bool,

    /// List open matches and exit
    #[clap(long)]
    list: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum RoleArg {
    Black,
    White,
    Spectator,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Black => Role::Black,
            RoleArg::White => Role::White,
            RoleArg::Spectator => Role::Spectator,
        }
    }
}

/// A line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Click an intersection; what that does depends on phase and guess mode
    Place(Coord),
    /// Cycle the guess mode
    Guess,
    Pass,
    Undo,
    Resign,
    Score,
    Sgf,
    Help,
    Quit,
}

const HELP: &str = "Commands: place <D4 | row col>, guess, pass, undo, resign, score, sgf, help, quit";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("phantomgo_client=debug,phantomgo_cli=debug")
            .init();
    } else if let Err(e) = ensure_logging_initialized() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(server) = args.server {
        config.server_url = server;
    }

    if args.list {
        let gateway = HttpGateway::new(&config.server_url, config.request_timeout)?;
        let games = gateway.list_games().await?;
        if games.is_empty() {
            println!("No games available.");
        } else {
            println!("Available games:");
            for game in games {
                println!("  {}", game);
            }
        }
        return Ok(());
    }

    let match_id = args
        .match_id
        .ok_or_else(|| anyhow!("A match is required (--match <id>), or use --list"))?;
    let role = Role::from(args.role);
    if role.is_player() && args.token.is_empty() {
        return Err(anyhow!("Players need a session token (--token)"));
    }

    let session = Session::new(match_id, args.token, role);
    let client = MatchClient::with_http(session, config)?;
    let dimensions = client
        .connect()
        .await
        .context("Failed to reach the match server")?;
    println!(
        "Joined match {} as {} on a {}x{} board",
        client.session().match_id,
        role,
        dimensions.rows,
        dimensions.cols
    );

    run_match_loop(client).await
}

/// Drive the match until the user quits or syncing stops
async fn run_match_loop(client: MatchClient) -> Result<()> {
    let mut events = client.subscribe();
    let mut sync = client.spawn_sync_loop();
    let mut stdin_lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    println!("{}", HELP);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("\nReceived Ctrl+C, shutting down...");
                sync.abort();
                break;
            }

            result = stdin_lines.next_line() => {
                let line = match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        sync.abort();
                        break;
                    }
                    Err(e) => {
                        eprintln!("Error reading input: {}", e);
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let size = client.snapshot().map(|s| (s.board.rows(), s.board.cols()));
                let (rows, cols) = size.unwrap_or((0, 0));
                let command = match parse_command(&line, rows, cols) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };
                if command == Command::Quit {
                    sync.abort();
                    break;
                }
                if let Err(e) = execute(&client, command).await {
                    report_error(&e);
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => report_event(&client, &event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event receiver lagged");
                        print_board(&client);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            exit = &mut sync => {
                match exit {
                    Ok(exit) => report_exit(&exit),
                    Err(e) => eprintln!("Sync task failed: {}", e),
                }
                // Drain what the loop published on its way out
                while let Ok(event) = events.try_recv() {
                    report_event(&client, &event);
                }
                break;
            }
        }
    }

    Ok(())
}

async fn execute(client: &MatchClient, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Place(coord) => client.click_cell(coord).await?,
        Command::Guess => {
            let mode = client.toggle_guess_mode();
            println!("Guess mode: {}", describe_mode(mode));
        }
        Command::Pass => client.pass().await?,
        Command::Undo => client.undo().await?,
        Command::Resign => client.resign().await?,
        Command::Score => {
            if let ScoreReply::Result(descriptor) = client.request_score().await? {
                println!("Score: {}", descriptor);
            }
        }
        Command::Sgf => println!("{}", client.game_record().await?),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

/// Parse a line of user input
fn parse_command(input: &str, rows: usize, cols: usize) -> Result<Command> {
    let lowered = input.trim().to_lowercase();
    let mut words = lowered.split_whitespace();
    let head = words.next().ok_or_else(|| anyhow!("Empty command"))?;
    let rest: Vec<&str> = words.collect();

    let command = match head {
        "place" | "p" => Command::Place(parse_coord(&rest, rows, cols)?),
        "guess" | "g" => Command::Guess,
        "pass" => Command::Pass,
        "undo" => Command::Undo,
        "resign" => Command::Resign,
        "score" => Command::Score,
        "sgf" => Command::Sgf,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        // Bare coordinates like "D4"
        other => Command::Place(parse_coord(&[other], rows, cols)?),
    };

    if !rest.is_empty() && !matches!(command, Command::Place(_)) {
        return Err(anyhow!("'{}' takes no arguments", head));
    }
    Ok(command)
}

/// Either "D4" (column letter, row number) or "row col", both 1-based
fn parse_coord(parts: &[&str], rows: usize, cols: usize) -> Result<Coord> {
    let (row, col) = match parts {
        [cell] => {
            let mut chars = cell.chars();
            let letter = chars
                .next()
                .ok_or_else(|| anyhow!("Missing coordinate"))?;
            let col = render::column_char_to_index(letter)
                .ok_or_else(|| anyhow!("Invalid column '{}'. Letters skip I.", letter))?;
            let row: usize = chars
                .as_str()
                .parse()
                .map_err(|_| anyhow!("Invalid coordinate '{}'. Example: D4", cell))?;
            (row, col + 1)
        }
        [row, col] => {
            let row = row.parse().map_err(|_| anyhow!("Invalid row '{}'", row))?;
            let col = col.parse().map_err(|_| anyhow!("Invalid column '{}'", col))?;
            (row, col)
        }
        _ => return Err(anyhow!("Expected a coordinate. Examples: 'place D4', 'place 4 4'")),
    };

    if row == 0 || col == 0 || row > rows || col > cols {
        return Err(anyhow!(
            "Coordinate out of range. The board is {}x{}.",
            rows,
            cols
        ));
    }
    Ok(Coord::new(row - 1, col - 1))
}

fn describe_mode(mode: GuessMode) -> &'static str {
    match mode {
        GuessMode::Off => "off (clicks place stones)",
        GuessMode::Adding => "adding guess stones",
        GuessMode::Removing => "removing guess stones",
    }
}

fn report_event(client: &MatchClient, event: &ClientEvent) {
    match event {
        ClientEvent::BoardUpdated { .. }
        | ClientEvent::GuessStonesUpdated { .. }
        | ClientEvent::SelectionChanged(_) => print_board(client),
        ClientEvent::TurnChanged(turn) => println!("Turn: {}", turn),
        ClientEvent::CapturesUpdated(captures) => {
            println!("Captures: Black {} - White {}", captures.black, captures.white)
        }
        ClientEvent::AtariUpdated(atari) => {
            println!("In atari: Black {} - White {}", atari.black, atari.white)
        }
        ClientEvent::PhaseChanged { from, to } => println!("Phase: {} -> {}", from, to),
        ClientEvent::ControlsDisabled => println!("The match is over; controls are disabled."),
        ClientEvent::Rejected { message } => println!("{}", message),
        ClientEvent::ServerMessage(message) => println!("Server: {}", message),
        ClientEvent::ScorePending => println!("Waiting for the other player to agree on the count..."),
        ClientEvent::ScoreResult { descriptor, .. } => println!("Result: {}", descriptor),
        ClientEvent::SyncHalted(exit) => tracing::debug!(%exit, "Sync halted"),
    }
}

fn report_error(error: &ClientError) {
    if error.is_transport() {
        eprintln!("Server unreachable, nothing was changed: {}", error);
    } else {
        eprintln!("{}", error);
    }
}

fn report_exit(exit: &SyncExit) {
    if exit.is_fatal() {
        eprintln!("Sync stopped: {}", exit);
    } else {
        println!("{}", exit);
    }
}

fn print_board(client: &MatchClient) {
    let Some(snapshot) = client.snapshot() else {
        return;
    };
    let role = client.role();
    let guesses = role
        .guess_color()
        .map(|color| client.guess_stones(color))
        .unwrap_or_default();
    let dead_groups = client.dead_groups();

    println!(
        "\nGeneration {} | {} | phase {}",
        snapshot.generation,
        snapshot.turn,
        client.phase()
    );
    println!(
        "{}",
        render::render_board(&snapshot, role, &guesses, &dead_groups)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_place_commands() {
        assert_eq!(
            parse_command("place D4", 9, 9).unwrap(),
            Command::Place(Coord::new(3, 3))
        );
        assert_eq!(
            parse_command("place 1 9", 9, 9).unwrap(),
            Command::Place(Coord::new(0, 8))
        );
        assert_eq!(
            parse_command("j9", 9, 9).unwrap(),
            Command::Place(Coord::new(8, 8))
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("pass", 9, 9).unwrap(), Command::Pass);
        assert_eq!(parse_command(" Resign ", 9, 9).unwrap(), Command::Resign);
        assert_eq!(parse_command("guess", 9, 9).unwrap(), Command::Guess);
        assert_eq!(parse_command("score", 9, 9).unwrap(), Command::Score);
        assert_eq!(parse_command("sgf", 9, 9).unwrap(), Command::Sgf);
        assert_eq!(parse_command("q", 9, 9).unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("I4", 9, 9).is_err());
        assert!(parse_command("place 10 1", 9, 9).is_err());
        assert!(parse_command("place 0 3", 9, 9).is_err());
        assert!(parse_command("K1", 9, 9).is_err());
        assert!(parse_command("pass now", 9, 9).is_err());
        assert!(parse_command("place", 9, 9).is_err());
    }

    #[test]
    fn test_parse_before_board_is_known() {
        // No snapshot yet: every coordinate is out of range
        assert!(parse_command("D4", 0, 0).is_err());
        assert_eq!(parse_command("undo", 0, 0).unwrap(), Command::Undo);
    }

    #[test]
    fn test_role_argument_maps_to_role() {
        assert_eq!(Role::from(RoleArg::White), Role::White);
        assert_eq!(Role::from(RoleArg::Spectator), Role::Spectator);
    }
}
