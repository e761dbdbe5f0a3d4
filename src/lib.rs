//! Peer Chess library - two-player chess synchronized over one TCP connection
//!
//! Each player runs a full copy of the game. Moves, resignations,
//! checkmate notices and display names travel as small text frames; both
//! sides apply the same rules to the same board.
//!
//! # Architecture
//!
//! - **Rules**: board model and legality engine (`peer_chess_rules`)
//! - **Protocol**: the peer message vocabulary and its text encoding
//! - **Channel**: framed TCP transport, host/join roles
//! - **Session**: turn state machine, clocks, captures and scores
//! - **Runtime**: single owner loop plus reader, writer and clock tasks
//! - **Console**: terminal front end
//!
//! # Example
//!
//! ```
//! use peer_chess::{Color, GameSession, PeerMessage, SelectOutcome, Square};
//! use tokio::sync::mpsc;
//!
//! let (outbound, mut sent) = mpsc::unbounded_channel();
//! let mut session = GameSession::new(Color::White, "Alice", outbound);
//!
//! assert!(matches!(session.select(Square::new(6, 4)), SelectOutcome::Selected(_)));
//! assert!(matches!(session.select(Square::new(4, 4)), SelectOutcome::Moved(_)));
//! assert_eq!(session.side_to_move(), Color::Black);
//! assert_eq!(
//!     sent.try_recv().unwrap(),
//!     PeerMessage::Move { from: Square::new(6, 4), to: Square::new(4, 4) }
//! );
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod channel;
mod config;
pub mod console;
mod protocol;
pub mod runtime;
mod session;

pub use channel::{ChannelError, DEFAULT_PORT, PeerChannel, PeerListener, Role};
pub use config::{ConfigError, SessionConfig};
pub use console::{ConsoleInput, ConsoleView};
pub use peer_chess_rules::{Board, Color, Piece, PieceKind, Square, rules};
pub use protocol::{PeerMessage, ProtocolError};
pub use runtime::{SessionCommand, SessionView};
pub use session::{
    Captures, Clock, DEFAULT_CLOCK_BUDGET, DEFAULT_OPPONENT_NAME, GameSession, GameState,
    InboundMove, MoveReport, Outcome, PeerMoveGuard, Phase, RejectedMove, Scoreboard,
    SelectOutcome, SessionError, SessionEvent, TrustPeer, VerifyPeer,
};
