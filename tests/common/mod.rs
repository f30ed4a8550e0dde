//! Test helpers for integration tests.
//!
//! Provides a fixture HTTP server on 127.0.0.1 and database/config helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use gator::config::FetcherConfig;
use gator::rss::{Feed, FeedRepository, NewFeed};
use gator::{Database, NewUser, UserRepository};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the fixture server answers a path.
#[derive(Debug, Clone)]
pub enum Fixture {
    /// Reply with a status and body, declaring Content-Length.
    Respond { status: u16, body: Vec<u8> },
    /// Reply with a 200 body and no Content-Length; the body ends at close.
    Unsized { body: Vec<u8> },
    /// Accept the request and never answer.
    Hang,
}

impl Fixture {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Fixture::Respond {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Fixture::Respond {
            status,
            body: Vec::new(),
        }
    }
}

/// Minimal HTTP/1.1 server serving canned responses.
pub struct FixtureServer {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Fixture>>>,
    hits: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    /// Start a server on an ephemeral port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<Mutex<HashMap<String, Fixture>>> = Arc::default();
        let hits: Arc<Mutex<Vec<String>>> = Arc::default();

        let handle = {
            let routes = routes.clone();
            let hits = hits.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    let routes = routes.clone();
                    let hits = hits.clone();
                    tokio::spawn(async move {
                        let _ = serve(stream, routes, hits).await;
                    });
                }
            })
        };

        Self {
            addr,
            routes,
            hits,
            handle,
        }
    }

    /// Register a fixture for a path.
    pub fn route(&self, path: &str, fixture: Fixture) {
        self.routes.lock().unwrap().insert(path.to_string(), fixture);
    }

    /// Absolute URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Paths requested so far, in order.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<String, Fixture>>>,
    hits: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let path = head
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    hits.lock().unwrap().push(path.clone());

    let fixture = routes
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or(Fixture::status(404));

    match fixture {
        Fixture::Respond { status, body } => {
            let header = format!(
                "HTTP/1.1 {} Fixture\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            stream.write_all(header.as_bytes()).await?;
            stream.write_all(&body).await?;
        }
        Fixture::Unsized { body } => {
            let header =
                "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\nConnection: close\r\n\r\n";
            stream.write_all(header.as_bytes()).await?;
            for chunk in body.chunks(8192) {
                stream.write_all(chunk).await?;
            }
        }
        Fixture::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
    stream.shutdown().await
}

/// Fetcher settings that allow talking to the local fixture server.
pub fn local_fetcher_config() -> FetcherConfig {
    FetcherConfig {
        allow_private_hosts: true,
        connect_timeout_secs: 2,
        read_timeout_secs: 5,
        total_timeout_secs: 5,
        ..FetcherConfig::default()
    }
}

/// An RSS 2.0 document with the given (title, link, pubDate) items.
pub fn rss_document(title: &str, items: &[(&str, &str, &str)]) -> String {
    let mut doc = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n<title>{}</title>\n<link>https://example.com/</link>\n<description>fixture</description>\n",
        title
    );
    for (item_title, link, pub_date) in items {
        doc.push_str(&format!(
            "<item><title>{}</title><link>{}</link><description>&lt;p&gt;About {}&lt;/p&gt;</description><pubDate>{}</pubDate></item>\n",
            item_title, link, item_title, pub_date
        ));
    }
    doc.push_str("</channel>\n</rss>\n");
    doc
}

/// Open an in-memory database with one user.
pub async fn setup_db() -> (Arc<Database>, i64) {
    let db = Database::open_in_memory().await.unwrap();
    let user = UserRepository::new(db.pool())
        .create(&NewUser::new("kahya"))
        .await
        .unwrap();
    (Arc::new(db), user.id)
}

/// Register a feed.
pub async fn add_feed(db: &Database, user_id: i64, name: &str, url: &str) -> Feed {
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, user_id))
        .await
        .unwrap()
}
