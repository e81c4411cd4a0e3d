//! Minimal in-test HTTP server that answers every request with one canned
//! response. Keeps the HTTP tests deterministic without a mock-server crate.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

pub(crate) struct TestServer {
    addr: SocketAddr,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Start a server answering every request with `status` (e.g. "200 OK")
    /// and the given body.
    pub(crate) async fn start(status: &str, body: &str) -> Self {
        Self::start_inner(status, body, None).await
    }

    /// Like `start`, but each response is held back until the returned gate
    /// is notified, so a test can observe state while a round trip is still
    /// in flight.
    pub(crate) async fn start_gated(status: &str, body: &str) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let server = Self::start_inner(status, body, Some(gate.clone())).await;
        (server, gate)
    }

    async fn start_inner(status: &str, body: &str, gate: Option<Arc<Notify>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        // Connections are handled one at a time; the sessions under test are
        // single-flight, so nothing ever needs to overlap.
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accept = listener.accept() => {
                        let Ok((mut socket, _)) = accept else { break };
                        let request = read_request(&mut socket).await;
                        seen.lock().unwrap().push(request);
                        if let Some(gate) = &gate {
                            gate.notified().await;
                        }
                        let _ = socket.write_all(response.as_bytes()).await;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown: shutdown_tx,
            handle,
            requests,
        }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}/chat", self.addr)
    }

    /// Raw requests received so far, headers and body.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

/// Read one request: headers, then as many body bytes as Content-Length
/// announces.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = find_subsequence(&buf, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]);
            let content_length = headers
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
