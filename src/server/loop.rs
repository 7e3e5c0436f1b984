// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections and hand each one to its own task.
///
/// Returns once `shutdown` completes; the listener is closed on return.
/// Connections already being served keep running on their tasks.
pub async fn run<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                break;
            }
        }
    }

    drop(listener);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::Config;
    use crate::handler::test_support::TempRoot;
    use crate::server::create_listener;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    struct Running {
        addr: SocketAddr,
        stop: oneshot::Sender<()>,
        handle: JoinHandle<std::io::Result<()>>,
    }

    async fn start(root: &TempRoot, tweak: impl FnOnce(&mut Config)) -> Running {
        let cli = Cli {
            config: "staticd-test-no-such-config".to_string(),
            root: Some(root.path().to_string_lossy().into_owned()),
            ..Cli::default()
        };
        let mut config = Config::load(&cli).unwrap();
        config.logging.access_log = false;
        tweak(&mut config);
        let state = Arc::new(AppState::new(config).unwrap());

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(run(listener, state, async move {
            let _ = stopped.await;
        }));

        Running { addr, stop, handle }
    }

    struct RawResponse {
        status: u16,
        head: String,
        body: Vec<u8>,
    }

    impl RawResponse {
        fn header(&self, name: &str) -> Option<&str> {
            self.head.lines().skip(1).find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case(name).then(|| value.trim())
            })
        }
    }

    /// Read exactly one response framed by Content-Length
    async fn read_response(stream: &mut TcpStream) -> RawResponse {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8(buf[..head_end].to_vec()).unwrap();
        let mut body = buf[head_end + 4..].to_vec();
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap();
        let mut response = RawResponse {
            status,
            head,
            body: Vec::new(),
        };

        let length: usize = response
            .header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        while body.len() < length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-body");
            body.extend_from_slice(&chunk[..n]);
        }
        response.body = body;
        response
    }

    async fn get(addr: SocketAddr, path: &str) -> RawResponse {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        read_response(&mut stream).await
    }

    fn site() -> TempRoot {
        let root = TempRoot::new("server");
        root.file("index.html", b"<b>home</b>");
        root.file("logo.png", &(0..1000u32).map(|i| (i % 251) as u8).collect::<Vec<_>>());
        root
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let root = site();
        let server = start(&root, |_| {}).await;

        let resp = get(server.addr, "/index.html").await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("content-type"), Some("text/html"));
        assert_eq!(resp.header("content-length"), Some("11"));
        assert!(resp.header("date").is_some());
        assert!(resp.header("server").unwrap().starts_with("staticd/"));
        assert_eq!(resp.body, b"<b>home</b>");

        let resp = get(server.addr, "/logo.png").await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("content-type"), Some("image/png"));
        assert_eq!(resp.header("content-length"), Some("1000"));
        assert_eq!(resp.body, std::fs::read(root.path().join("logo.png")).unwrap());

        let resp = get(server.addr, "/missing.txt").await;
        assert_eq!(resp.status, 404);

        let _ = server.stop.send(());
        server.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_post_rejected() {
        let root = site();
        let server = start(&root, |_| {}).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(
                b"POST /index.html HTTP/1.1\r\nHost: test\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc",
            )
            .await
            .unwrap();
        let resp = read_response(&mut stream).await;
        assert_eq!(resp.status, 405);
        assert_eq!(resp.header("allow"), Some("GET, HEAD"));
        assert_ne!(resp.body, b"<b>home</b>");

        let _ = server.stop.send(());
    }

    #[tokio::test]
    async fn test_raw_traversal() {
        let root = site();
        let server = start(&root, |_| {}).await;

        let resp = get(server.addr, "/../../etc/passwd").await;
        assert!(resp.status == 403 || resp.status == 404, "got {}", resp.status);
        assert!(!String::from_utf8_lossy(&resp.body).contains("root:"));

        let _ = server.stop.send(());
    }

    #[tokio::test]
    async fn test_keep_alive_reuses_connection() {
        let root = site();
        let server = start(&root, |_| {}).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        for _ in 0..3 {
            stream
                .write_all(b"GET /index.html HTTP/1.1\r\nHost: test\r\n\r\n")
                .await
                .unwrap();
            let resp = read_response(&mut stream).await;
            assert_eq!(resp.status, 200);
            assert_eq!(resp.body, b"<b>home</b>");
        }

        let _ = server.stop.send(());
    }

    #[tokio::test]
    async fn test_head_over_the_wire() {
        let root = site();
        let server = start(&root, |_| {}).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(b"HEAD /logo.png HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let text = String::from_utf8_lossy(&raw);
        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200"), "got: {head}");
        assert!(head.to_ascii_lowercase().contains("content-length: 1000"));
        assert!(head.to_ascii_lowercase().contains("content-type: image/png"));
        assert!(body.is_empty());

        let _ = server.stop.send(());
    }

    fn short_timeouts(config: &mut Config) {
        config.performance.read_timeout = 1;
        config.performance.write_timeout = 1;
        config.performance.keep_alive_timeout = 1;
    }

    #[tokio::test]
    async fn test_busy_keep_alive_outlives_timeouts() {
        let root = site();
        let server = start(&root, short_timeouts).await;

        // ~2.4s on one connection, never idle for more than 400ms
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        for _ in 0..6 {
            stream
                .write_all(b"GET /index.html HTTP/1.1\r\nHost: test\r\n\r\n")
                .await
                .unwrap();
            let resp = read_response(&mut stream).await;
            assert_eq!(resp.status, 200);
            assert_eq!(resp.body, b"<b>home</b>");
            tokio::time::sleep(Duration::from_millis(400)).await;
        }

        let _ = server.stop.send(());
    }

    #[tokio::test]
    async fn test_idle_keep_alive_is_closed() {
        let root = site();
        let server = start(&root, short_timeouts).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(b"GET /index.html HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(read_response(&mut stream).await.status, 200);

        // The server hangs up on its own; the client never sends again
        let mut rest = Vec::new();
        let closed = tokio::time::timeout(
            Duration::from_secs(5),
            stream.read_to_end(&mut rest),
        )
        .await;
        assert!(closed.is_ok(), "idle connection was kept open");

        let _ = server.stop.send(());
    }

    #[tokio::test]
    async fn test_http_1_0() {
        let root = site();
        let server = start(&root, |_| {}).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(b"GET /index.html HTTP/1.0\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.starts_with("HTTP/1."), "got: {text}");
        assert!(text.contains(" 200 "), "got: {text}");
        assert!(text.ends_with("<b>home</b>"));

        let _ = server.stop.send(());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_do_not_mix() {
        let root = TempRoot::new("server-concurrent");
        let a = vec![b'a'; 64 * 1024];
        let b = vec![b'b'; 48 * 1024];
        root.file("a.bin", &a);
        root.file("b.bin", &b);
        let server = start(&root, |_| {}).await;

        let mut tasks = Vec::new();
        for i in 0..32 {
            let addr = server.addr;
            let (path, expected) = if i % 2 == 0 {
                ("/a.bin", a.clone())
            } else {
                ("/b.bin", b.clone())
            };
            tasks.push(tokio::spawn(async move {
                let resp = get(addr, path).await;
                assert_eq!(resp.status, 200);
                assert_eq!(resp.body, expected, "{path}");
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let _ = server.stop.send(());
    }

    #[tokio::test]
    async fn test_max_connections() {
        let root = site();
        let server = start(&root, |c| c.performance.max_connections = Some(1)).await;

        // Hold the only slot open with an idle keep-alive connection
        let mut first = TcpStream::connect(server.addr).await.unwrap();
        first
            .write_all(b"GET /index.html HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(read_response(&mut first).await.status, 200);

        let mut second = TcpStream::connect(server.addr).await.unwrap();
        let _ = second
            .write_all(b"GET /index.html HTTP/1.1\r\nHost: test\r\n\r\n")
            .await;
        let mut raw = Vec::new();
        let _ = second.read_to_end(&mut raw).await;
        assert!(raw.is_empty());

        let _ = server.stop.send(());
    }

    #[tokio::test]
    async fn test_shutdown_closes_listener() {
        let root = site();
        let server = start(&root, |_| {}).await;
        let addr = server.addr;

        let _ = server.stop.send(());
        server.handle.await.unwrap().unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
