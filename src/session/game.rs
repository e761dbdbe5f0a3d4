//! The game session state machine.
//!
//! A [`GameSession`] is the sole owner of the board and all per-game state.
//! Clicks, peer messages and clock ticks all arrive as method calls from a
//! single owner loop; nothing else mutates the session.

use super::guard::{InboundMove, PeerMoveGuard, TrustPeer};
use super::state::{Captures, Clock, DEFAULT_CLOCK_BUDGET, GameState, Outcome, Phase, Scoreboard};
use super::{SessionError, SessionEvent};
use crate::protocol::PeerMessage;
use peer_chess_rules::{Board, Color, Invariant, OneKingPerSide, Piece, Square, rules};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, instrument, warn};

/// Capacity of the state-change notification channel.
const EVENT_CAPACITY: usize = 256;

/// Display name used for the peer until its handshake arrives.
pub const DEFAULT_OPPONENT_NAME: &str = "Opponent";

/// Result of selecting a square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Nothing happened: not our turn, game over, or nothing selectable there.
    Ignored,
    /// A piece was picked; these are its fully legal destinations.
    Selected(Vec<Square>),
    /// The selected piece moved.
    Moved(MoveReport),
    /// The target was not a legal destination; the selection was dropped.
    Rejected,
}

/// What a completed move did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// Source square.
    pub from: Square,
    /// Destination square.
    pub to: Square,
    /// Piece removed from the destination, if any.
    pub captured: Option<Piece>,
    /// The other side is now in check.
    pub check: bool,
    /// The other side is checkmated.
    pub checkmate: bool,
}

#[derive(Debug, Clone)]
struct Selection {
    from: Square,
    destinations: Vec<Square>,
}

/// One side of a networked two-player game.
#[derive(Debug)]
pub struct GameSession {
    state: GameState,
    local: Color,
    local_name: String,
    opponent_name: String,
    clock_budget: u32,
    selection: Option<Selection>,
    scores: Scoreboard,
    status: String,
    connected: bool,
    guard: Box<dyn PeerMoveGuard>,
    outbound: Option<mpsc::UnboundedSender<PeerMessage>>,
    events: broadcast::Sender<SessionEvent>,
}

impl GameSession {
    /// Creates a session playing `local`, sending peer messages to `outbound`.
    ///
    /// White moves first, so the host (White) owns the first turn.
    #[instrument(skip(local_name, outbound))]
    pub fn new(
        local: Color,
        local_name: impl Into<String>,
        outbound: mpsc::UnboundedSender<PeerMessage>,
    ) -> Self {
        let local_name = local_name.into();
        info!(%local, %local_name, "Creating game session");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut session = Self {
            state: GameState::new(DEFAULT_CLOCK_BUDGET),
            local,
            local_name,
            opponent_name: DEFAULT_OPPONENT_NAME.to_string(),
            clock_budget: DEFAULT_CLOCK_BUDGET,
            selection: None,
            scores: Scoreboard::default(),
            status: String::new(),
            connected: true,
            guard: Box::new(TrustPeer),
            outbound: Some(outbound),
            events,
        };
        session.refresh_status();
        session
    }

    /// Sets the per-side time budget and restarts the clocks with it.
    pub fn with_clock_budget(mut self, budget: u32) -> Self {
        self.clock_budget = budget;
        self.state.clock = Clock::new(budget);
        self
    }

    /// Replaces the inbound move guard.
    pub fn with_guard(mut self, guard: Box<dyn PeerMoveGuard>) -> Self {
        self.guard = guard;
        self
    }

    // ─────────────────────────────────────────────────────────────
    //  Queries
    // ─────────────────────────────────────────────────────────────

    /// Returns the board.
    pub fn board(&self) -> &Board {
        self.state.board()
    }

    /// Returns the full game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Returns the side whose turn it is.
    pub fn side_to_move(&self) -> Color {
        self.state.side_to_move()
    }

    /// Returns the color played on this side of the connection.
    pub fn local_color(&self) -> Color {
        self.local
    }

    /// Checks if the local player may act.
    pub fn is_local_turn(&self) -> bool {
        !self.state.is_over() && self.state.side_to_move() == self.local
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        match (&self.state.outcome, &self.selection) {
            (Some(_), _) => Phase::GameOver,
            (None, Some(selection)) => Phase::PieceSelected(selection.from),
            (None, None) => Phase::AwaitingSelection,
        }
    }

    /// Returns the outcome once the game is over.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.state.outcome()
    }

    /// Returns the user-facing status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Remaining clock ticks for `color`.
    pub fn clock(&self, color: Color) -> u32 {
        self.state.clock().remaining(color)
    }

    /// Returns the capture record.
    pub fn captures(&self) -> &Captures {
        self.state.captures()
    }

    /// Games won by `color` in this session.
    pub fn score(&self, color: Color) -> u32 {
        self.scores.get(color)
    }

    /// Display name of the player of `color`.
    pub fn name_of(&self, color: Color) -> &str {
        if color == self.local {
            &self.local_name
        } else {
            &self.opponent_name
        }
    }

    /// Destinations highlighted for the current selection.
    pub fn highlighted(&self) -> &[Square] {
        self.selection
            .as_ref()
            .map(|s| s.destinations.as_slice())
            .unwrap_or_default()
    }

    /// Checks if the peer connection is still usable.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Subscribes to state-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────
    //  Local actions
    // ─────────────────────────────────────────────────────────────

    /// Sends the local display name to the peer.
    #[instrument(skip(self), fields(local_name = %self.local_name))]
    pub fn announce(&mut self) {
        self.transmit(PeerMessage::Handshake(self.local_name.clone()));
    }

    /// Handles a click on `square`.
    #[instrument(skip(self), fields(local = %self.local))]
    pub fn select(&mut self, square: Square) -> SelectOutcome {
        if !self.is_local_turn() {
            debug!("Selection ignored: not the local turn");
            return SelectOutcome::Ignored;
        }

        match self.selection.take() {
            None => {
                let own_piece = self
                    .board()
                    .get(square)
                    .is_some_and(|piece| piece.color == self.state.side_to_move);
                if !own_piece {
                    return SelectOutcome::Ignored;
                }
                let destinations = rules::legal_destinations(self.board(), square);
                debug!(count = destinations.len(), "Piece selected");
                self.selection = Some(Selection {
                    from: square,
                    destinations: destinations.clone(),
                });
                self.emit(SessionEvent::Selected {
                    from: square,
                    destinations: destinations.clone(),
                });
                SelectOutcome::Selected(destinations)
            }
            Some(selection) if selection.destinations.contains(&square) => {
                SelectOutcome::Moved(self.apply_local_move(selection.from, square))
            }
            Some(selection) => {
                debug!(from = %selection.from, "Rejected destination");
                if rules::is_in_check(self.board(), self.local) {
                    self.status = format!("{} is in check!", self.local_name);
                }
                self.emit(SessionEvent::SelectionCleared);
                SelectOutcome::Rejected
            }
        }
    }

    /// Moves `from` to `to` in one step, dropping any pending selection.
    ///
    /// Equivalent to selecting both squares in turn.
    #[instrument(skip(self))]
    pub fn play(&mut self, from: Square, to: Square) -> SelectOutcome {
        if self.selection.take().is_some() {
            self.emit(SessionEvent::SelectionCleared);
        }
        match self.select(from) {
            SelectOutcome::Selected(_) => self.select(to),
            other => other,
        }
    }

    /// Resigns the current game.
    #[instrument(skip(self))]
    pub fn resign(&mut self) -> Result<(), SessionError> {
        if self.state.is_over() {
            return Err(SessionError::GameOver);
        }
        info!(local = %self.local, "Resigning");
        self.transmit(PeerMessage::Resign);
        self.finish(Outcome::Resignation {
            winner: self.local.opponent(),
        });
        Ok(())
    }

    /// Starts a fresh game after the previous one ended.
    ///
    /// Scores and names carry over; board, clocks and captures reset.
    #[instrument(skip(self))]
    pub fn new_game(&mut self) -> Result<(), SessionError> {
        if !self.state.is_over() {
            return Err(SessionError::GameInProgress);
        }
        if !self.connected {
            return Err(SessionError::Disconnected);
        }
        info!("Starting new game");
        self.state = GameState::new(self.clock_budget);
        self.selection = None;
        self.refresh_status();
        self.emit(SessionEvent::Reset);
        Ok(())
    }

    /// Advances the clock of the side to move by one tick.
    #[instrument(skip(self), level = "trace")]
    pub fn tick(&mut self) {
        if self.state.is_over() {
            return;
        }
        let side = self.state.side_to_move;
        let remaining = self.state.clock.tick(side);
        self.emit(SessionEvent::ClockTick {
            white: self.clock(Color::White),
            black: self.clock(Color::Black),
        });
        if remaining == 0 {
            info!(%side, "Clock expired");
            self.finish(Outcome::Timeout {
                winner: side.opponent(),
            });
        }
    }

    /// Records that the peer connection is gone.
    #[instrument(skip(self))]
    pub fn connection_lost(&mut self, reason: &str) {
        if !self.connected {
            debug!(reason, "Connection already marked lost");
            return;
        }
        warn!(reason, "Peer connection lost");
        self.disconnect();
        if self.state.is_over() {
            self.status = format!("{} (connection closed)", self.status);
            self.emit(SessionEvent::Disconnected);
            return;
        }
        self.finish(Outcome::ConnectionLost {
            reason: reason.to_string(),
        });
    }

    // ─────────────────────────────────────────────────────────────
    //  Peer messages
    // ─────────────────────────────────────────────────────────────

    /// Applies a message received from the peer.
    #[instrument(skip(self), fields(local = %self.local))]
    pub fn receive(&mut self, message: PeerMessage) {
        match message {
            PeerMessage::Handshake(name) => {
                info!(opponent = %name, "Opponent named");
                self.opponent_name = name.clone();
                match self.state.outcome.clone() {
                    Some(outcome) => {
                        self.status = self.describe_outcome(&outcome);
                        if !self.connected {
                            self.status.push_str(" (connection closed)");
                        }
                    }
                    None => self.refresh_status(),
                }
                self.emit(SessionEvent::OpponentNamed(name));
            }
            PeerMessage::Move { from, to } => self.apply_peer_move(from, to),
            PeerMessage::Resign => {
                if self.state.is_over() {
                    debug!("Resignation after game end ignored");
                    return;
                }
                self.finish(Outcome::Resignation { winner: self.local });
            }
            PeerMessage::Checkmate(winner_name) => {
                if self.state.is_over() {
                    debug!(%winner_name, "Checkmate notice after game end ignored");
                    return;
                }
                let winner = if self.local_name == self.opponent_name {
                    // Names cannot tell the sides apart; credit the last mover.
                    self.state.side_to_move.opponent()
                } else if winner_name == self.local_name {
                    self.local
                } else {
                    self.local.opponent()
                };
                self.finish(Outcome::Checkmate { winner });
            }
        }
    }

    fn apply_peer_move(&mut self, from: Square, to: Square) {
        if self.state.is_over() {
            debug!(%from, %to, "Peer move after game end ignored");
            return;
        }

        if let Err(reason) = self.vet_peer_move(from, to) {
            self.peer_fault(reason);
            return;
        }

        self.selection = None;
        let mover = self.state.side_to_move;
        let captured = self.relocate(mover, from, to);
        self.conclude_move(mover, from, to, captured);
    }

    /// Rejects peer moves the rule engine cannot continue from.
    ///
    /// Runs on a copy; the board is untouched.
    fn vet_peer_move(&self, from: Square, to: Square) -> Result<(), String> {
        let peer = self.local.opponent();
        let inbound = InboundMove::new(self.board(), from, to, peer, self.state.side_to_move);
        self.guard.admit(&inbound).map_err(|rejected| rejected.to_string())?;

        let Some(piece) = self.board().get(from) else {
            return Err(format!("peer moved from empty square {from}"));
        };
        let after = self.board().with_move(from, to);
        if !OneKingPerSide::holds(&after) {
            return Err(format!("peer move {from}-{to} captured a king"));
        }
        if rules::is_in_check(&after, piece.color) {
            return Err(format!("peer move {from}-{to} left its own king in check"));
        }
        Ok(())
    }

    /// Ends the game and drops the connection after an unusable peer move.
    fn peer_fault(&mut self, reason: String) {
        warn!(%reason, "Peer protocol fault");
        self.disconnect();
        self.finish(Outcome::ConnectionLost { reason });
    }

    // ─────────────────────────────────────────────────────────────
    //  Move pipeline
    // ─────────────────────────────────────────────────────────────

    fn apply_local_move(&mut self, from: Square, to: Square) -> MoveReport {
        let mover = self.state.side_to_move;
        let captured = self.relocate(mover, from, to);
        debug_assert!(
            OneKingPerSide::holds(self.board()),
            "{}",
            OneKingPerSide::description()
        );
        self.transmit(PeerMessage::Move { from, to });
        self.conclude_move(mover, from, to, captured)
    }

    fn relocate(&mut self, mover: Color, from: Square, to: Square) -> Option<Piece> {
        let captured = self.state.board.relocate(from, to);
        if let Some(piece) = captured {
            info!(%mover, %piece, value = piece.kind.value(), "Piece captured");
            self.state.captures.record(mover, piece);
        }
        captured
    }

    /// Post-move evaluation against the side that did not move.
    #[instrument(skip_all, fields(%mover, %from, %to))]
    fn conclude_move(
        &mut self,
        mover: Color,
        from: Square,
        to: Square,
        captured: Option<Piece>,
    ) -> MoveReport {
        self.emit(SessionEvent::MoveApplied {
            by: mover,
            from,
            to,
            captured,
        });

        let defender = mover.opponent();
        if rules::is_checkmate(self.board(), defender) {
            info!(winner = %mover, "Checkmate");
            if mover == self.local {
                self.transmit(PeerMessage::Checkmate(self.local_name.clone()));
            }
            self.finish(Outcome::Checkmate { winner: mover });
            return MoveReport {
                from,
                to,
                captured,
                check: true,
                checkmate: true,
            };
        }

        let check = rules::is_in_check(self.board(), defender);
        self.state.side_to_move = defender;
        self.refresh_status();
        if check {
            self.emit(SessionEvent::Check(defender));
        }
        MoveReport {
            from,
            to,
            captured,
            check,
            checkmate: false,
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Helpers
    // ─────────────────────────────────────────────────────────────

    fn finish(&mut self, outcome: Outcome) {
        if let Some(winner) = outcome.winner() {
            self.scores.award(winner);
        }
        self.selection = None;
        self.status = self.describe_outcome(&outcome);
        info!(?outcome, status = %self.status, "Game over");
        self.state.outcome = Some(outcome.clone());
        self.emit(SessionEvent::GameOver(outcome));
    }

    fn describe_outcome(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Checkmate { winner } => format!("{} wins!", self.name_of(*winner)),
            Outcome::Resignation { winner } => {
                format!("{} wins by resignation!", self.name_of(*winner))
            }
            Outcome::Timeout { winner } => format!("{} wins on time!", self.name_of(*winner)),
            Outcome::ConnectionLost { reason } => format!("Connection lost: {reason}"),
        }
    }

    /// Recomputes the status line for an active game from the board.
    fn refresh_status(&mut self) {
        let side = self.state.side_to_move;
        let name = self.name_of(side).to_string();
        self.status = if rules::is_in_check(self.board(), side) {
            format!("{name} is in check!")
        } else if !rules::has_legal_move(self.board(), side) {
            format!("{name} has no legal moves")
        } else {
            format!("{name}'s turn")
        };
    }

    fn transmit(&mut self, message: PeerMessage) {
        let Some(outbound) = &self.outbound else {
            debug!(%message, "Disconnected; message dropped");
            return;
        };
        debug!(%message, "Sending to peer");
        if outbound.send(message).is_err() {
            warn!("Outbound queue closed; message dropped");
        }
    }

    /// Closing the outbound queue stops the writer, which shuts the socket.
    fn disconnect(&mut self) {
        self.connected = false;
        self.outbound = None;
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
