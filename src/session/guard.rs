//! Validation hook for moves received from the peer.
//!
//! The protocol has no arbiter: by default each side applies whatever the
//! other reports. A stricter guard can re-run the rule engine on receipt
//! without touching the protocol.

use derive_more::Display;
use derive_new::new;
use peer_chess_rules::{Board, Color, Square, rules};
use tracing::instrument;

/// A move reported by the peer, with the context needed to judge it.
#[derive(Debug, Clone, Copy, new)]
pub struct InboundMove<'a> {
    /// Board before the move.
    pub board: &'a Board,
    /// Source square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// The peer's color.
    pub peer: Color,
    /// Side to move according to the local session.
    pub side_to_move: Color,
}

/// Why an inbound move was refused.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("Peer move {}-{} refused: {}", from, to, reason)]
pub struct RejectedMove {
    /// Source square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Which check failed.
    pub reason: &'static str,
}

impl std::error::Error for RejectedMove {}

/// Decides whether an inbound peer move is applied.
pub trait PeerMoveGuard: Send + std::fmt::Debug {
    /// Returns `Ok(())` to apply the move.
    fn admit(&self, inbound: &InboundMove<'_>) -> Result<(), RejectedMove>;
}

/// Applies every peer move unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustPeer;

impl PeerMoveGuard for TrustPeer {
    fn admit(&self, _inbound: &InboundMove<'_>) -> Result<(), RejectedMove> {
        Ok(())
    }
}

/// Re-checks turn order and full legality of every peer move.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyPeer;

impl PeerMoveGuard for VerifyPeer {
    #[instrument(skip(self, inbound), fields(from = %inbound.from, to = %inbound.to))]
    fn admit(&self, inbound: &InboundMove<'_>) -> Result<(), RejectedMove> {
        let reject = |reason| RejectedMove {
            from: inbound.from,
            to: inbound.to,
            reason,
        };
        if inbound.side_to_move != inbound.peer {
            return Err(reject("not the peer's turn"));
        }
        if !rules::is_fully_legal(inbound.board, inbound.from, inbound.to, inbound.peer) {
            return Err(reject("illegal move"));
        }
        Ok(())
    }
}
