//! Line-oriented terminal front end.
//!
//! Input lines become [`SessionCommand`]s; session events are rendered to
//! stdout. Squares are accepted in algebraic form (`e2`) or as a
//! `row col` pair of board indices.

use crate::runtime::{SessionCommand, SessionView};
use crate::session::{GameSession, Outcome, SessionError, SessionEvent};
use derive_more::Display;
use peer_chess_rules::{Color, Square};
use strum::IntoEnumIterator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

const HELP: &str = "Commands: <from> <to> (e2 e4 or 6 4 4 4), select <square>, \
                    resign, new, board, help, quit";

/// Seconds remaining below which every tick is shown.
const LOW_TIME: u32 = 10;
/// Ticks between clock lines otherwise.
const CLOCK_EVERY: u32 = 30;

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Move in one step.
    Move(Square, Square),
    /// Click on a single square.
    Select(Square),
    /// Resign the current game.
    Resign,
    /// Start a new game.
    NewGame,
    /// Redraw the board.
    Board,
    /// Show the command list.
    Help,
    /// Leave the program.
    Quit,
}

/// Why a console line could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConsoleError {
    /// Blank line.
    #[display("Empty input")]
    Empty,
    /// Unrecognised command word.
    #[display("Unknown command: {_0}")]
    Unknown(String),
    /// A square could not be parsed.
    #[display("Not a square: {_0}")]
    BadSquare(String),
}

impl std::error::Error for ConsoleError {}

impl ConsoleInput {
    /// Parses one input line.
    #[instrument]
    pub fn parse(line: &str) -> Result<Self, ConsoleError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => Err(ConsoleError::Empty),
            ["resign"] => Ok(Self::Resign),
            ["new"] => Ok(Self::NewGame),
            ["board"] => Ok(Self::Board),
            ["help" | "?"] => Ok(Self::Help),
            ["quit" | "exit"] => Ok(Self::Quit),
            ["select", square] => Ok(Self::Select(algebraic(square)?)),
            [square] => Ok(Self::Select(algebraic(square)?)),
            [from, to] => Ok(Self::Move(algebraic(from)?, algebraic(to)?)),
            [fr, fc, tr, tc] => Ok(Self::Move(numeric(fr, fc)?, numeric(tr, tc)?)),
            [word, ..] => Err(ConsoleError::Unknown((*word).to_string())),
        }
    }

    /// Queue command for this input, if it is not handled locally.
    pub fn command(self) -> Option<SessionCommand> {
        match self {
            Self::Move(from, to) => Some(SessionCommand::Play { from, to }),
            Self::Select(square) => Some(SessionCommand::Select(square)),
            Self::Resign => Some(SessionCommand::Resign),
            Self::NewGame => Some(SessionCommand::NewGame),
            Self::Board => Some(SessionCommand::Redraw),
            Self::Quit => Some(SessionCommand::Shutdown),
            Self::Help => None,
        }
    }
}

fn algebraic(word: &str) -> Result<Square, ConsoleError> {
    Square::from_algebraic(word).ok_or_else(|| ConsoleError::BadSquare(word.to_string()))
}

fn numeric(row: &str, col: &str) -> Result<Square, ConsoleError> {
    let bad = || ConsoleError::BadSquare(format!("{row} {col}"));
    let row: i64 = row.parse().map_err(|_| bad())?;
    let col: i64 = col.parse().map_err(|_| bad())?;
    Square::try_new(row, col).ok_or_else(bad)
}

/// Reads stdin lines into the command queue until `quit` or end of input.
pub fn spawn_input(commands: mpsc::UnboundedSender<SessionCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(error) => {
                    warn!(%error, "Failed to read stdin");
                    break;
                }
            };
            match ConsoleInput::parse(&line) {
                Ok(ConsoleInput::Help) => println!("{HELP}"),
                Ok(input) => {
                    let Some(command) = input.command() else {
                        continue;
                    };
                    let quit = command == SessionCommand::Shutdown;
                    if commands.send(command).is_err() || quit {
                        return;
                    }
                }
                Err(ConsoleError::Empty) => {}
                Err(error) => println!("{error}. {HELP}"),
            }
        }
        debug!("Input closed");
        let _ = commands.send(SessionCommand::Shutdown);
    })
}

/// Renders session state to stdout.
#[derive(Debug, Default)]
pub struct ConsoleView;

impl ConsoleView {
    /// Full text rendering of the session.
    pub fn render(session: &GameSession) -> String {
        let mut out = session.board().display();
        out.push('\n');
        for color in Color::iter() {
            let captures = session.captures();
            let taken: String = captures.pieces(color).iter().map(|p| p.glyph()).collect();
            out.push_str(&format!(
                "{:<12} {color:<5} clock {:>4}  wins {}  material +{} {}\n",
                session.name_of(color),
                session.clock(color),
                session.score(color),
                captures.material(color),
                taken,
            ));
        }
        out.push_str(session.status());
        out
    }
}

impl SessionView for ConsoleView {
    fn changed(&mut self, session: &GameSession, event: &SessionEvent) {
        match event {
            SessionEvent::Selected { from, destinations } => {
                let targets: Vec<String> = destinations.iter().map(Square::to_string).collect();
                if targets.is_empty() {
                    println!("{from}: no legal moves");
                } else {
                    println!("{from} -> {}", targets.join(" "));
                }
            }
            SessionEvent::SelectionCleared => println!("Selection cleared. {}", session.status()),
            SessionEvent::MoveApplied {
                by,
                from,
                to,
                captured,
            } => {
                match captured {
                    Some(piece) => println!("{} {from}x{to} ({piece})", session.name_of(*by)),
                    None => println!("{} {from}-{to}", session.name_of(*by)),
                }
                self.redraw(session);
            }
            SessionEvent::Check(_) => {}
            SessionEvent::GameOver(outcome) => {
                if let Outcome::ConnectionLost { .. } = outcome {
                    println!("{}", session.status());
                } else {
                    println!(
                        "{}  (score {} {} - {} {}). Type 'new' to play again.",
                        session.status(),
                        session.name_of(Color::White),
                        session.score(Color::White),
                        session.score(Color::Black),
                        session.name_of(Color::Black),
                    );
                }
            }
            SessionEvent::ClockTick { white, black } => {
                let side = session.side_to_move();
                let left = session.clock(side);
                if left <= LOW_TIME || left % CLOCK_EVERY == 0 {
                    println!("clock  White {white}  Black {black}");
                }
            }
            SessionEvent::OpponentNamed(name) => println!("Opponent is {name}"),
            SessionEvent::Disconnected => println!("{}", session.status()),
            SessionEvent::Reset => {
                println!("New game");
                self.redraw(session);
            }
        }
    }

    fn redraw(&mut self, session: &GameSession) {
        println!("{}", Self::render(session));
    }

    fn refused(&mut self, _session: &GameSession, error: &SessionError) {
        println!("{error}");
    }
}
