//! Loopback tests for the framed peer channel and the runtime pump tasks.

use peer_chess::runtime::{self, SessionCommand, SessionView};
use peer_chess::{
    ChannelError, Color, GameSession, PeerChannel, PeerListener, PeerMessage, SessionEvent,
    Square,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn connected_pair() -> (PeerChannel, PeerChannel) {
    let listener = PeerListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let accept = tokio::spawn(listener.accept());
    let joiner = PeerChannel::dial(addr).await.expect("dial");
    let host = accept.await.expect("accept task").expect("accept");
    (host, joiner)
}

fn frame(body: &str) -> Vec<u8> {
    let mut bytes = (body.len() as u16).to_be_bytes().to_vec();
    bytes.extend_from_slice(body.as_bytes());
    bytes
}

#[tokio::test]
async fn test_messages_cross_the_wire() {
    let (host, joiner) = connected_pair().await;
    let (mut host_tx, _host_rx) = host.split();
    let (_join_tx, mut join_rx) = joiner.split();

    let messages = vec![
        PeerMessage::Handshake("Alice".into()),
        PeerMessage::Move {
            from: Square::new(6, 4),
            to: Square::new(4, 4),
        },
        PeerMessage::Checkmate("Alice".into()),
        PeerMessage::Resign,
    ];
    for message in &messages {
        host_tx.send(message).await.expect("send");
    }
    for expected in messages {
        let received = join_rx
            .next()
            .await
            .expect("stream open")
            .expect("valid frame");
        assert_eq!(received, expected);
    }
}

#[tokio::test]
async fn test_frames_use_two_byte_length_prefix() {
    let listener = PeerListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let accept = tokio::spawn(listener.accept());
    let mut raw = TcpStream::connect(addr).await.expect("connect");
    let (mut sender, _receiver) = accept.await.expect("task").expect("accept").split();

    sender
        .send(&PeerMessage::Handshake("Ann".into()))
        .await
        .expect("send");

    let mut buf = [0u8; 10];
    raw.read_exact(&mut buf).await.expect("read frame");
    assert_eq!(buf.to_vec(), frame("NAME Ann"));
}

#[tokio::test]
async fn test_malformed_and_closed_streams() {
    let listener = PeerListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let accept = tokio::spawn(listener.accept());
    let mut raw = TcpStream::connect(addr).await.expect("connect");
    let (_sender, mut receiver) = accept.await.expect("task").expect("accept").split();

    raw.write_all(&frame("RESIGN")).await.expect("write");
    raw.write_all(&frame("6 4 9 9")).await.expect("write");
    raw.shutdown().await.expect("shutdown");
    drop(raw);

    assert_eq!(
        receiver.next().await.expect("frame").expect("valid"),
        PeerMessage::Resign
    );
    assert!(matches!(
        receiver.next().await.expect("frame"),
        Err(ChannelError::Protocol(_))
    ));
    assert!(receiver.next().await.is_none());
}

#[tokio::test]
async fn test_reader_reports_disconnect_once() {
    let (host, joiner) = connected_pair().await;
    let (_host_tx, host_rx) = host.split();
    let (mut join_tx, join_rx) = joiner.split();

    let (commands, mut queue) = mpsc::unbounded_channel();
    let reader = runtime::spawn_reader(host_rx, commands);

    join_tx.send(&PeerMessage::Resign).await.expect("send");
    drop(join_tx);
    drop(join_rx);

    let first = tokio::time::timeout(TIMEOUT, queue.recv()).await.expect("timely");
    assert_eq!(first, Some(SessionCommand::Peer(PeerMessage::Resign)));
    let second = tokio::time::timeout(TIMEOUT, queue.recv()).await.expect("timely");
    assert!(matches!(second, Some(SessionCommand::ConnectionLost(_))));

    reader.await.expect("reader finished");
    assert_eq!(queue.recv().await, None);
}

/// Forwards every session event to the test body.
struct Forward(mpsc::UnboundedSender<SessionEvent>);

impl SessionView for Forward {
    fn changed(&mut self, _session: &GameSession, event: &SessionEvent) {
        let _ = self.0.send(event.clone());
    }

    fn redraw(&mut self, _session: &GameSession) {}
}

struct Side {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    done: tokio::task::JoinHandle<GameSession>,
}

fn start(channel: PeerChannel, color: Color, name: &str) -> Side {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (commands, queue) = mpsc::unbounded_channel();
    let (event_tx, events) = mpsc::unbounded_channel();

    let mut session = GameSession::new(color, name, outbound_tx);
    session.announce();
    let (sender, receiver) = channel.split();
    runtime::spawn_reader(receiver, commands.clone());
    runtime::spawn_writer(sender, outbound_rx, commands.clone());

    let done = tokio::spawn(async move {
        let mut view = Forward(event_tx);
        runtime::run(session, queue, &mut view).await
    });
    Side {
        commands,
        events,
        done,
    }
}

async fn wait_for(side: &mut Side, wanted: impl Fn(&SessionEvent) -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while let Some(event) = side.events.recv().await {
            if wanted(&event) {
                return;
            }
        }
        panic!("event stream closed");
    })
    .await
    .expect("event within timeout");
}

#[tokio::test]
async fn test_two_sessions_stay_in_sync() {
    let (host, joiner) = connected_pair().await;
    let mut white = start(host, Color::White, "Alice");
    let mut black = start(joiner, Color::Black, "Bob");

    wait_for(&mut white, |e| matches!(e, SessionEvent::OpponentNamed(n) if n == "Bob")).await;
    wait_for(&mut black, |e| matches!(e, SessionEvent::OpponentNamed(n) if n == "Alice")).await;

    white
        .commands
        .send(SessionCommand::Play {
            from: Square::new(6, 4),
            to: Square::new(4, 4),
        })
        .expect("queue open");
    wait_for(&mut black, |e| {
        matches!(e, SessionEvent::MoveApplied { by: Color::White, .. })
    })
    .await;

    black.commands.send(SessionCommand::Resign).expect("queue open");
    wait_for(&mut white, |e| matches!(e, SessionEvent::GameOver(_))).await;

    white.commands.send(SessionCommand::Shutdown).expect("queue open");
    black.commands.send(SessionCommand::Shutdown).expect("queue open");
    let white = white.done.await.expect("white loop");
    let black = black.done.await.expect("black loop");

    assert_eq!(white.board(), black.board());
    assert_eq!(white.score(Color::White), 1);
    assert_eq!(black.score(Color::White), 1);
    assert_eq!(white.name_of(Color::Black), "Bob");
    assert_eq!(black.name_of(Color::White), "Alice");
}
