//! Peer message vocabulary and its text encoding.
//!
//! Bodies are plain text, one message per frame:
//!
//! - `NAME <displayName>`
//! - `<fromRow> <fromCol> <toRow> <toCol>`
//! - `RESIGN`
//! - `CHECKMATE:<winnerName>`

use derive_more::{Display, Error};
use peer_chess_rules::Square;
use tracing::instrument;

const NAME_PREFIX: &str = "NAME ";
const RESIGN: &str = "RESIGN";
const CHECKMATE_PREFIX: &str = "CHECKMATE:";

/// A message exchanged between the two peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    /// Sender's display name. May arrive at any point in the game.
    Handshake(String),
    /// The sender moved the piece on `from` to `to`.
    Move {
        /// Source square.
        from: Square,
        /// Destination square.
        to: Square,
    },
    /// The sender resigns.
    Resign,
    /// The sender observed checkmate; carries the winner's display name.
    Checkmate(String),
}

impl PeerMessage {
    /// Encodes the message body.
    pub fn encode(&self) -> String {
        match self {
            PeerMessage::Handshake(name) => format!("{NAME_PREFIX}{name}"),
            PeerMessage::Move { from, to } => {
                format!("{} {} {} {}", from.row(), from.col(), to.row(), to.col())
            }
            PeerMessage::Resign => RESIGN.to_string(),
            PeerMessage::Checkmate(winner) => format!("{CHECKMATE_PREFIX}{winner}"),
        }
    }

    /// Parses a message body.
    #[instrument]
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        if let Some(name) = body.strip_prefix(NAME_PREFIX) {
            if name.is_empty() {
                return Err(ProtocolError::new("Handshake carries an empty name"));
            }
            return Ok(PeerMessage::Handshake(name.to_string()));
        }
        if body == RESIGN {
            return Ok(PeerMessage::Resign);
        }
        if let Some(winner) = body.strip_prefix(CHECKMATE_PREFIX) {
            return Ok(PeerMessage::Checkmate(winner.to_string()));
        }
        Self::parse_move(body)
    }

    fn parse_move(body: &str) -> Result<Self, ProtocolError> {
        let coords = body
            .split(' ')
            .map(|part| {
                part.parse::<i64>()
                    .map_err(|_| ProtocolError::new(format!("Unrecognized message: {body:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let [from_row, from_col, to_row, to_col] = coords[..] else {
            return Err(ProtocolError::new(format!(
                "Move needs 4 coordinates, got {}",
                coords.len()
            )));
        };

        let square = |row, col| {
            Square::try_new(row, col)
                .ok_or_else(|| ProtocolError::new(format!("Square ({row}, {col}) is off the board")))
        };
        Ok(PeerMessage::Move {
            from: square(from_row, from_col)?,
            to: square(to_row, to_col)?,
        })
    }
}

impl std::fmt::Display for PeerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerMessage::Move { from, to } => write!(f, "{from}-{to}"),
            other => write!(f, "{}", other.encode()),
        }
    }
}

/// Malformed frame body, with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Protocol error: {} at {}:{}", message, file, line)]
pub struct ProtocolError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ProtocolError {
    /// Creates a new protocol error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_vocabulary() {
        let mv = PeerMessage::Move {
            from: Square::new(6, 4),
            to: Square::new(4, 4),
        };
        assert_eq!(mv.encode(), "6 4 4 4");
        assert_eq!(PeerMessage::Handshake("Ada".into()).encode(), "NAME Ada");
        assert_eq!(PeerMessage::Resign.encode(), "RESIGN");
        assert_eq!(PeerMessage::Checkmate("Ada".into()).encode(), "CHECKMATE:Ada");
    }

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(
            PeerMessage::parse("1 4 3 4").expect("valid move"),
            PeerMessage::Move {
                from: Square::new(1, 4),
                to: Square::new(3, 4),
            }
        );
        assert_eq!(
            PeerMessage::parse("NAME Grace Hopper").expect("valid name"),
            PeerMessage::Handshake("Grace Hopper".into())
        );
        assert_eq!(PeerMessage::parse("RESIGN").expect("valid"), PeerMessage::Resign);
        assert_eq!(
            PeerMessage::parse("CHECKMATE:Grace").expect("valid"),
            PeerMessage::Checkmate("Grace".into())
        );
    }

    #[test]
    fn test_parse_rejects_off_board_move() {
        let err = PeerMessage::parse("6 4 8 4").unwrap_err();
        assert!(err.message.contains("off the board"));
        assert!(PeerMessage::parse("-1 0 0 0").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(PeerMessage::parse("").is_err());
        assert!(PeerMessage::parse("6 4 4").is_err());
        assert!(PeerMessage::parse("6 4 4 4 4").is_err());
        assert!(PeerMessage::parse("e2 e4").is_err());
        assert!(PeerMessage::parse("NAME ").is_err());
        assert!(PeerMessage::parse("resign").is_err());
    }
}
