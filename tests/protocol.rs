//! End-to-end protocol tests over real TCP connections

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use linechat::{ChatServer, ChatService, ControlPlane, InjectOutcome, InjectRequest};

const WAIT: Duration = Duration::from_secs(5);
const BANNER_END: &str = "/**************************************/";

struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    seen: String,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            reader,
            writer,
            seen: String::new(),
        }
    }

    async fn login(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.expect("Enter username:").await;
        client.send(name).await;
        client.expect("Welcome to the chat service").await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn expect(&mut self, needle: &str) -> String {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            if let Some(pos) = self.seen.find(needle) {
                let end = pos + needle.len();
                let out = self.seen[..end].to_string();
                self.seen.drain(..end);
                return out;
            }
            let mut buf = [0u8; 2048];
            let n = tokio::time::timeout_at(deadline, self.reader.read(&mut buf))
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {:?}", needle))
                .unwrap();
            assert!(n > 0, "server closed connection waiting for {:?}", needle);
            self.seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
    }
}

async fn start() -> (SocketAddr, ChatService) {
    let service = ChatService::default();
    let server = ChatServer::bind("127.0.0.1:0", service.clone())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    (addr, service)
}

#[tokio::test]
async fn test_single_user_walkthrough() {
    let (addr, service) = start().await;
    let mut foo = Client::connect(addr).await;

    foo.expect("Enter username:").await;
    foo.send("foouser").await;
    let text = foo.expect("Welcome to the chat service").await;
    assert!(text.contains("/listchannels"));

    foo.send("/listusers").await;
    assert!(foo.expect(BANNER_END).await.contains("foouser"));

    foo.send("/create").await;
    foo.send("foochannel").await;
    foo.expect("Channel: foochannel created").await;

    foo.send("/listchannels").await;
    assert!(foo.expect(BANNER_END).await.contains("foochannel"));

    foo.send("/join").await;
    foo.send("foochannel").await;
    foo.expect("Joined channel: foochannel").await;

    foo.send("/listmychannels").await;
    assert!(foo.expect(BANNER_END).await.contains("foochannel"));

    foo.send("/leave").await;
    foo.send("foochannel").await;
    foo.expect("Left channel: foochannel").await;

    foo.send("/help").await;
    assert!(foo.expect(BANNER_END).await.contains("/listchannels"));

    foo.send("/quit").await;
    foo.expect("You have quit the chat").await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(service.directory().list_users().await.is_empty());
    assert_eq!(service.directory().list_channels().await, vec!["foochannel"]);
}

#[tokio::test]
async fn test_two_users_and_control_plane() {
    let (addr, service) = start().await;
    let mut foo = Client::login(addr, "foouser").await;
    let mut bar = Client::login(addr, "baruser").await;

    bar.send("/create").await;
    bar.send("foochannel").await;
    bar.expect("Channel: foochannel created").await;
    for client in [&mut foo, &mut bar] {
        client.send("/join").await;
        client.send("foochannel").await;
        client.expect("Joined channel: foochannel").await;
    }

    foo.send("fooMessage").await;
    bar.expect("|foouser|fooMessage").await;

    foo.send("/pm").await;
    foo.send("baruser").await;
    foo.send("fooPrivate").await;
    bar.expect("|foouser|fooPrivate").await;

    foo.send("/sendchannel").await;
    foo.send("foochannel").await;
    foo.send("fooChannelMessage").await;
    bar.expect("|foouser|foochannel|fooChannelMessage").await;

    let control = Arc::new(ControlPlane::new(service.clone(), "unused.log"));
    let outcome = control
        .inject_message(&InjectRequest {
            channel: Some("foochannel".to_string()),
            user: None,
            message: "hello".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, InjectOutcome::Delivered);
    foo.expect("|http|foochannel|hello").await;
    bar.expect("|http|foochannel|hello").await;

    let stats = control.read_stats().await;
    assert_eq!(stats.users, 2);
    assert_eq!(stats.channels, 1);
    assert_eq!(stats.messages_sent, 4);
}

#[tokio::test]
async fn test_ignore_filters_all_message_kinds() {
    let (addr, service) = start().await;
    let mut foo = Client::login(addr, "foouser").await;
    let mut bar = Client::login(addr, "baruser").await;

    service.directory().create_channel("foochannel").await.unwrap();
    service.directory().join("foouser", "foochannel").await.unwrap();
    service.directory().join("baruser", "foochannel").await.unwrap();

    foo.send("/ignoreuser").await;
    foo.send("baruser").await;
    foo.expect("Ignored user: baruser").await;

    bar.send("ignoredBroadcast").await;
    bar.expect("|baruser|ignoredBroadcast").await;

    bar.send("/pm").await;
    bar.send("foouser").await;
    bar.send("ignoredPrivate").await;

    bar.send("/sendchannel").await;
    bar.send("foochannel").await;
    bar.send("ignoredChannel").await;

    // Same-connection ordering: once bar sees this reply, its sends are routed
    bar.send("/listusers").await;
    bar.expect(BANNER_END).await;

    let control = ControlPlane::new(service.clone(), "unused.log");
    control
        .inject_message(&InjectRequest {
            user: Some("foouser".to_string()),
            message: "marker".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let text = foo.expect("|http|marker").await;
    assert!(!text.contains("ignored"), "unexpected delivery: {}", text);
}

#[tokio::test]
async fn test_disconnect_frees_username() {
    let (addr, service) = start().await;
    let foo = Client::login(addr, "foouser").await;
    drop(foo);

    let deadline = tokio::time::Instant::now() + WAIT;
    while service.directory().lookup_user("foouser").await.is_some() {
        assert!(tokio::time::Instant::now() < deadline, "user was never removed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let _again = Client::login(addr, "foouser").await;
}
