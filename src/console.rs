//! Line-oriented terminal front end. Reads commands from stdin, forwards them
//! to the control loop, and prints whatever events come back.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::game::{GameError, GameEvent, GameHandle, MissReason};
use crate::models::{Mode, Move};

const HELP: &str = "\
commands:
  rock | paper | scissors   play a move (button mode)
  go                        start a gesture countdown (gesture mode)
  mode button|gesture       switch input mode
  status                    show scores and round
  history                   list resolved rounds
  reset                     start a new game
  quit                      exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Play(Move),
    Go,
    SwitchMode(Mode),
    Status,
    History,
    Reset,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let head = words.next()?.to_ascii_lowercase();
        let command = match head.as_str() {
            "go" | "start" => ConsoleCommand::Go,
            "status" => ConsoleCommand::Status,
            "history" => ConsoleCommand::History,
            "reset" => ConsoleCommand::Reset,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            "mode" => match words.next()?.to_ascii_lowercase().as_str() {
                "button" | "b" => ConsoleCommand::SwitchMode(Mode::Button),
                "gesture" | "g" => ConsoleCommand::SwitchMode(Mode::Gesture),
                _ => return None,
            },
            other => ConsoleCommand::Play(Move::parse(other)?),
        };
        Some(command)
    }
}

pub fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::ModeChanged { mode } => format!("mode: {}", mode.as_str()),
        GameEvent::CountdownTick { remaining } => format!("{remaining}..."),
        GameEvent::RoundResolved { record, scores } => format!(
            "{} | score {} - {}",
            record.summary(),
            scores.player,
            scores.computer
        ),
        GameEvent::CaptureMissed { round_number, reason } => match reason {
            MissReason::NoGesture => {
                format!("round {round_number}: no gesture seen, try again")
            }
            MissReason::Stale => {
                format!("round {round_number}: gesture was too old, try again")
            }
        },
        GameEvent::GameOver { winner, scores } => format!(
            "game over: {} wins {} - {}",
            winner.as_str(),
            scores.player,
            scores.computer
        ),
        GameEvent::CameraUnavailable { reason } => format!("camera unavailable: {reason}"),
        GameEvent::Reset { .. } => "new game".to_string(),
    }
}

fn report(result: Result<(), GameError>) {
    if let Err(err) = result {
        println!("({err})");
    }
}

pub async fn run_console(
    handle: GameHandle,
    mut events: mpsc::UnboundedReceiver<GameEvent>,
) -> Result<()> {
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", describe(&event));
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let Some(command) = ConsoleCommand::parse(&line) else {
            if !line.trim().is_empty() {
                println!("unknown command, type `help`");
            }
            continue;
        };

        match command {
            ConsoleCommand::Play(player) => report(handle.submit_move(player).await),
            ConsoleCommand::Go => report(handle.start_gesture_round().await),
            ConsoleCommand::SwitchMode(mode) => report(handle.switch_mode(mode).await),
            ConsoleCommand::Reset => report(handle.reset().await),
            ConsoleCommand::Status => {
                let snapshot = handle.snapshot().await?;
                println!(
                    "{} mode, round {}, player {} - computer {}{}",
                    snapshot.mode.as_str(),
                    snapshot.session.round_number,
                    snapshot.session.player_score,
                    snapshot.session.computer_score,
                    if snapshot.session.active { "" } else { " (game over)" }
                );
            }
            ConsoleCommand::History => {
                let snapshot = handle.snapshot().await?;
                if snapshot.history.is_empty() {
                    println!("no rounds yet");
                }
                for record in &snapshot.history {
                    println!("{}", record.summary());
                }
            }
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => break,
        }
    }

    handle.shutdown().await?;
    printer.await.context("event printer task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outcome, RoundRecord, Scores};
    use chrono::Utc;

    #[test]
    fn parses_moves_and_modes() {
        assert_eq!(ConsoleCommand::parse("Rock"), Some(ConsoleCommand::Play(Move::Rock)));
        assert_eq!(ConsoleCommand::parse(" p "), Some(ConsoleCommand::Play(Move::Paper)));
        assert_eq!(
            ConsoleCommand::parse("mode gesture"),
            Some(ConsoleCommand::SwitchMode(Mode::Gesture))
        );
        assert_eq!(ConsoleCommand::parse("mode"), None);
        assert_eq!(ConsoleCommand::parse("dance"), None);
        assert_eq!(ConsoleCommand::parse(""), None);
    }

    #[test]
    fn describes_resolved_round() {
        let event = GameEvent::RoundResolved {
            record: RoundRecord {
                round_number: 4,
                mode: Mode::Button,
                player_move: Move::Paper,
                computer_move: Move::Rock,
                outcome: Outcome::PlayerWin,
                timestamp: Utc::now(),
            },
            scores: Scores {
                player: 2,
                computer: 1,
            },
        };
        assert_eq!(
            describe(&event),
            "Round 4: Paper vs Rock -> Player wins | score 2 - 1"
        );
    }
}
