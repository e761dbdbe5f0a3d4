//! Owner loop and the background tasks feeding it.
//!
//! Every input (console, peer frames, clock ticks, connection failures)
//! becomes a [`SessionCommand`] on one unbounded queue. [`run`] is the only
//! consumer and the only code that touches the [`GameSession`].

use crate::channel::{PeerReceiver, PeerSender};
use crate::protocol::PeerMessage;
use crate::session::{GameSession, SessionError, SessionEvent};
use peer_chess_rules::Square;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

/// Work item for the session owner loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Local click on a square.
    Select(Square),
    /// Local move entered in one step.
    Play {
        /// Source square.
        from: Square,
        /// Destination square.
        to: Square,
    },
    /// Local resignation.
    Resign,
    /// Local request for a fresh game.
    NewGame,
    /// Message received from the peer.
    Peer(PeerMessage),
    /// One clock interval elapsed.
    Tick,
    /// The peer connection failed.
    ConnectionLost(String),
    /// Re-render the whole view.
    Redraw,
    /// Stop the owner loop.
    Shutdown,
}

/// Presentation side of the owner loop.
pub trait SessionView {
    /// Called once per state-change notification, after the command that
    /// caused it has been fully applied.
    fn changed(&mut self, session: &GameSession, event: &SessionEvent);

    /// Renders the whole session from scratch.
    fn redraw(&mut self, session: &GameSession);

    /// A local action was refused.
    fn refused(&mut self, session: &GameSession, error: &SessionError) {
        let _ = session;
        warn!(%error, "Action refused");
    }
}

/// Applies commands until `Shutdown` or until every sender is gone.
///
/// Returns the session so callers can inspect the final state.
#[instrument(skip_all, fields(local = %session.local_color()))]
pub async fn run<V: SessionView>(
    mut session: GameSession,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    view: &mut V,
) -> GameSession {
    let mut events = session.subscribe();
    view.redraw(&session);

    while let Some(command) = commands.recv().await {
        if command == SessionCommand::Shutdown {
            info!("Shutdown requested");
            break;
        }
        apply(&mut session, command, view);
        drain(&session, &mut events, view);
    }

    debug!("Owner loop finished");
    session
}

fn apply<V: SessionView>(session: &mut GameSession, command: SessionCommand, view: &mut V) {
    let refused = match command {
        SessionCommand::Select(square) => {
            session.select(square);
            None
        }
        SessionCommand::Play { from, to } => {
            session.play(from, to);
            None
        }
        SessionCommand::Resign => session.resign().err(),
        SessionCommand::NewGame => session.new_game().err(),
        SessionCommand::Peer(message) => {
            session.receive(message);
            None
        }
        SessionCommand::Tick => {
            session.tick();
            None
        }
        SessionCommand::ConnectionLost(reason) => {
            session.connection_lost(&reason);
            None
        }
        SessionCommand::Redraw => {
            view.redraw(session);
            None
        }
        SessionCommand::Shutdown => None,
    };
    if let Some(error) = refused {
        view.refused(session, &error);
    }
}

fn drain<V: SessionView>(
    session: &GameSession,
    events: &mut broadcast::Receiver<SessionEvent>,
    view: &mut V,
) {
    loop {
        match events.try_recv() {
            Ok(event) => view.changed(session, &event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "View fell behind; redrawing");
                view.redraw(session);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

/// Forwards peer messages into the command queue.
///
/// Enqueues exactly one `ConnectionLost` on read failure, malformed frame
/// or end of stream, then stops.
pub fn spawn_reader(
    mut receiver: PeerReceiver,
    commands: mpsc::UnboundedSender<SessionCommand>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let reason = loop {
                match receiver.next().await {
                    Some(Ok(message)) => {
                        debug!(%message, "Received from peer");
                        if commands.send(SessionCommand::Peer(message)).is_err() {
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        warn!(%error, "Peer read failed");
                        break error.to_string();
                    }
                    None => break "peer closed the connection".to_string(),
                }
            };
            let _ = commands.send(SessionCommand::ConnectionLost(reason));
        }
        .instrument(info_span!("peer_reader")),
    )
}

/// Writes queued outbound messages to the peer.
///
/// Stops when the outbound queue closes; a write failure is reported as
/// `ConnectionLost`.
pub fn spawn_writer(
    mut sender: PeerSender,
    mut outbound: mpsc::UnboundedReceiver<PeerMessage>,
    commands: mpsc::UnboundedSender<SessionCommand>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            while let Some(message) = outbound.recv().await {
                if let Err(error) = sender.send(&message).await {
                    warn!(%error, "Peer write failed");
                    let _ = commands.send(SessionCommand::ConnectionLost(format!(
                        "send failed: {error}"
                    )));
                    return;
                }
            }
            debug!("Outbound queue closed");
        }
        .instrument(info_span!("peer_writer")),
    )
}

/// Enqueues a `Tick` every `interval`, starting one interval from now.
pub fn spawn_clock(
    interval: Duration,
    commands: mpsc::UnboundedSender<SessionCommand>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if commands.send(SessionCommand::Tick).is_err() {
                    break;
                }
            }
        }
        .instrument(info_span!("clock", ?interval)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use peer_chess_rules::Color;

    #[derive(Default)]
    struct Recorder {
        events: Vec<SessionEvent>,
        redraws: usize,
        refusals: Vec<SessionError>,
    }

    impl SessionView for Recorder {
        fn changed(&mut self, _session: &GameSession, event: &SessionEvent) {
            self.events.push(event.clone());
        }

        fn redraw(&mut self, _session: &GameSession) {
            self.redraws += 1;
        }

        fn refused(&mut self, _session: &GameSession, error: &SessionError) {
            self.refusals.push(*error);
        }
    }

    fn session(local: Color) -> (GameSession, mpsc::UnboundedReceiver<PeerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (GameSession::new(local, "Alice", tx), rx)
    }

    #[tokio::test]
    async fn test_run_applies_commands_in_order() {
        let (session, mut outbound) = session(Color::White);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(SessionCommand::Select(Square::new(6, 4))).unwrap();
        tx.send(SessionCommand::Select(Square::new(4, 4))).unwrap();
        tx.send(SessionCommand::Shutdown).unwrap();

        let mut view = Recorder::default();
        let session = run(session, rx, &mut view).await;

        assert_eq!(session.side_to_move(), Color::Black);
        assert_eq!(view.redraws, 1);
        assert!(matches!(view.events[0], SessionEvent::Selected { .. }));
        assert!(matches!(
            view.events[1],
            SessionEvent::MoveApplied { by: Color::White, .. }
        ));
        assert_eq!(
            outbound.try_recv().unwrap(),
            PeerMessage::Move {
                from: Square::new(6, 4),
                to: Square::new(4, 4)
            }
        );
    }

    #[tokio::test]
    async fn test_refused_action_reaches_view() {
        let (session, _outbound) = session(Color::White);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(SessionCommand::NewGame).unwrap();
        drop(tx);

        let mut view = Recorder::default();
        run(session, rx, &mut view).await;
        assert_eq!(view.refusals, vec![SessionError::GameInProgress]);
    }

    #[tokio::test]
    async fn test_run_stops_when_senders_drop() {
        let (session, _outbound) = session(Color::Black);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(SessionCommand::Peer(PeerMessage::Resign)).unwrap();
        drop(tx);

        let mut view = Recorder::default();
        let session = run(session, rx, &mut view).await;
        assert_eq!(session.score(Color::Black), 1);
    }

    #[tokio::test]
    async fn test_clock_enqueues_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let clock = spawn_clock(Duration::from_millis(5), tx);
        for _ in 0..2 {
            let command = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("tick within timeout");
            assert_eq!(command, Some(SessionCommand::Tick));
        }
        clock.abort();
    }
}
