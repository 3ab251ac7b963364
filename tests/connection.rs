//! End-to-end tests against a fake IRC server on a loopback socket.

use std::sync::Arc;
use std::time::Duration;

use crabirc::irc::{Command, Connection, ConnectionError, ConnectionState};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct FakeServer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl FakeServer {
    async fn next_line(&mut self) -> Option<String> {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for client line")
            .unwrap()
    }

    async fn send(&mut self, raw: &str) {
        self.write.write_all(raw.as_bytes()).await.unwrap();
    }
}

/// Connect a client to a fresh loopback listener and consume the handshake.
async fn connected(nick: &str) -> (Connection, FakeServer, Vec<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let conn = Connection::new(addr.to_string(), nick);

    let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
    conn.connect().await.unwrap();
    let (read, write) = accept.await.unwrap().into_split();
    let mut server = FakeServer {
        lines: BufReader::new(read).lines(),
        write,
    };

    let handshake = vec![
        server.next_line().await.unwrap(),
        server.next_line().await.unwrap(),
    ];
    (conn, server, handshake)
}

#[tokio::test]
async fn test_handshake_registers_nick_then_user() {
    let (conn, _server, handshake) = connected("bob").await;
    assert_eq!(handshake[0], "NICK bob");

    let user = Command::parse(&handshake[1]).unwrap();
    assert_eq!(user.verb, "USER");
    assert_eq!(user.args.len(), 4);
    assert!(!user.args[0].is_empty());
    assert_eq!(&user.args[1..], ["0", "*", "crabirc IRC client"]);

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_ping_is_answered_automatically() {
    let (conn, mut server, _) = connected("bob").await;

    server.send("PING :irc.example.com\r\n").await;
    assert_eq!(server.next_line().await.unwrap(), "PONG irc.example.com");

    // A PING without a token is reported and not answered.
    server.send(":irc.example.com PING\r\nPING :second\r\n").await;
    assert_eq!(server.next_line().await.unwrap(), "PONG second");

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_fan_out_in_order_to_every_listener() {
    let (conn, mut server, _) = connected("bob").await;
    let mut roomy = conn.subscribe(128);
    // Far smaller than the burst, so most deliveries are deferred.
    let mut tiny = conn.subscribe(1);

    let mut burst = String::new();
    for n in 0..50 {
        burst.push_str(&format!(":alice PRIVMSG #rust :message {}\r\n", n));
        if n == 10 {
            burst.push_str("GARBAGE\r\n");
        }
    }
    server.send(&burst).await;

    for queue in [&mut roomy, &mut tiny] {
        for n in 0..50 {
            let command = timeout(WAIT, queue.recv()).await.unwrap().unwrap();
            assert_eq!(command.source.as_deref(), Some("alice"));
            assert_eq!(command.args, vec!["#rust".to_string(), format!("message {}", n)]);
        }
    }

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_send_writes_serialized_line() {
    let (conn, mut server, _) = connected("bob").await;

    conn.send("PRIVMSG", ["#rust", "hello world"]).await.unwrap();
    assert_eq!(server.next_line().await.unwrap(), "PRIVMSG #rust :hello world");

    let err = conn.send("FOO", ["a b", "c"]).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Command(_)));

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_senders_do_not_interleave() {
    let (conn, mut server, _) = connected("bob").await;
    let conn = Arc::new(conn);

    let mut tasks = Vec::new();
    for n in 0..8 {
        let conn = Arc::clone(&conn);
        tasks.push(tokio::spawn(async move {
            let text = format!("from task {}", n);
            conn.send("PRIVMSG", ["#rust", text.as_str()]).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for _ in 0..8 {
        let line = server.next_line().await.unwrap();
        assert!(line.starts_with("PRIVMSG #rust :from task "), "{}", line);
    }

    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_close_ends_every_listener() {
    let (conn, mut server, _) = connected("bob").await;
    let mut a = conn.subscribe(4);
    let mut b = conn.subscribe(4);

    conn.close().await.unwrap();
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(timeout(WAIT, a.recv()).await.unwrap().is_none());
    assert!(timeout(WAIT, b.recv()).await.unwrap().is_none());

    // The server sees the socket go away.
    assert_eq!(server.next_line().await, None);
}

#[tokio::test]
async fn test_server_disconnect_closes_listeners() {
    let (conn, server, _) = connected("bob").await;
    let mut queue = conn.subscribe(4);

    drop(server);
    assert!(timeout(WAIT, queue.recv()).await.unwrap().is_none());

    // Only this connection is torn down; closing it is still clean.
    assert_eq!(conn.state(), ConnectionState::Connected);
    let _ = conn.close().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
}
