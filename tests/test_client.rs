//! End-to-end tests for the pooled request dispatcher, run against
//! in-process TCP servers with scripted behavior.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use courier::http::request::Request;
use courier::{Address, ClientConfig, Error, HttpClient};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn spawn_server<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handler.clone()(stream));
        }
    });
    addr
}

/// Read bytes until the end of the request head. Returns false on EOF.
async fn read_request_head(stream: &mut TcpStream) -> bool {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = match stream.read(&mut tmp).await {
            Ok(n) => n,
            Err(_) => return false,
        };
        if n == 0 {
            return false;
        }
        buf.extend_from_slice(&tmp[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return true;
        }
    }
}

fn simple_get(addr: SocketAddr) -> (Request, Address) {
    let request = Request::get("/").header("Host", addr.ip().to_string()).build();
    (request, Address::new(addr.ip().to_string(), addr.port(), false))
}

#[tokio::test]
async fn test_request_returns_content_length_body() {
    init_logging();
    let server = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 7\r\n\r\nTEST123")
                .await
                .unwrap();
        }
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);
    let response = client
        .request(request, addr, Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.body_text(), "TEST123");
}

#[tokio::test]
async fn test_body_read_until_close() {
    let server = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\n\r\nstreamed without a declared length")
                .await
                .unwrap();
            stream.shutdown().await.unwrap();
        }
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);
    let response = client
        .request(request, addr.clone(), Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(response.body_text(), "streamed without a declared length");
    // A close-terminated exchange leaves nothing to pool.
    assert_eq!(client.idle_connections(&addr).await, 0);
}

#[tokio::test]
async fn test_chunked_response_end_to_end() {
    let server = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                      3\r\nhel\r\n2\r\nlo\r\n0\r\n\r\n",
                )
                .await
                .unwrap();
        }
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);
    let response = client
        .request(request, addr.clone(), Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(response.body_text(), "hello");
    // Cleanly finished keep-alive exchange: the connection is pooled.
    assert_eq!(client.idle_connections(&addr).await, 1);
}

#[tokio::test]
async fn test_oversized_declared_length_fails_and_closes() {
    let server = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            // Twice the default 1 MiB cap.
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2097152\r\n\r\n")
                .await
                .unwrap();
        }
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);
    let err = client
        .request(request, addr.clone(), Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Oversized { size: 2097152, .. }));
    assert_eq!(client.idle_connections(&addr).await, 0);
}

#[tokio::test]
async fn test_oversized_streamed_body_fails() {
    let server = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            stream.write_all(b"HTTP/1.1 200 OK\r\n\r\n").await.unwrap();
            stream.write_all(&[b'x'; 4096]).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    })
    .await;

    let config = ClientConfig {
        max_body_size: 1024,
        ..ClientConfig::default()
    };
    let client = HttpClient::new(config);
    let (request, addr) = simple_get(server);
    let err = client
        .request(request, addr, Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Oversized { .. }));
}

#[tokio::test]
async fn test_timeout_against_silent_server() {
    init_logging();
    let server = spawn_server(|mut stream: TcpStream| async move {
        read_request_head(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);

    let started = Instant::now();
    let err = client
        .request(request, addr, Duration::from_millis(300))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, Error::Timeout));
    assert!(elapsed >= Duration::from_millis(300), "resolved early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "resolved late: {elapsed:?}");
}

#[tokio::test]
async fn test_unsatisfied_content_length_is_incomplete() {
    let server = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nfour")
                .await
                .unwrap();
            stream.shutdown().await.unwrap();
        }
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);
    let err = client
        .request(request, addr, Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::IncompleteBody));
}

#[tokio::test]
async fn test_keep_alive_connection_is_reused() {
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    let server = spawn_server(move |mut stream: TcpStream| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            // Serve any number of requests on this connection.
            while read_request_head(&mut stream).await {
                stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                    .await
                    .unwrap();
            }
        }
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);

    for _ in 0..3 {
        let response = client
            .request(request.clone(), addr.clone(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(response.body_text(), "ok");
    }

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(client.idle_connections(&addr).await, 1);
}

#[tokio::test]
async fn test_dead_pooled_connection_is_discarded() {
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    let server = spawn_server(move |mut stream: TcpStream| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            // One response, then close: the pooled connection goes stale.
            if read_request_head(&mut stream).await {
                stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                    .await
                    .unwrap();
            }
        }
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (request, addr) = simple_get(server);

    client
        .request(request.clone(), addr.clone(), Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(client.idle_connections(&addr).await, 1);

    // Let the server's FIN land so the liveness probe sees the close.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let response = client
        .request(request, addr.clone(), Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(response.body_text(), "ok");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_max_concurrent_bounds_in_flight_requests() {
    init_logging();
    let current = Arc::new(AtomicUsize::new(0));
    let high_water = Arc::new(AtomicUsize::new(0));

    let (cur, high) = (current.clone(), high_water.clone());
    let server = spawn_server(move |mut stream: TcpStream| {
        let (cur, high) = (cur.clone(), high.clone());
        async move {
            if read_request_head(&mut stream).await {
                let now = cur.fetch_add(1, Ordering::SeqCst) + 1;
                high.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                cur.fetch_sub(1, Ordering::SeqCst);
                stream
                    .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 4\r\n\r\ndone")
                    .await
                    .unwrap();
            }
        }
    })
    .await;

    let config = ClientConfig {
        max_concurrent: 2,
        ..ClientConfig::default()
    };
    let client = HttpClient::new(config);
    let (request, addr) = simple_get(server);

    let handles: Vec<_> = (0..50)
        .map(|_| client.submit(request.clone(), addr.clone(), Duration::from_secs(10)))
        .collect();

    for handle in handles {
        let response = handle.wait().await.unwrap();
        assert_eq!(response.body_text(), "done");
    }

    assert!(
        high_water.load(Ordering::SeqCst) <= 2,
        "admission control leaked: {} requests in flight",
        high_water.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_stop_fails_queued_requests_without_running_them() {
    let server = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            tokio::time::sleep(Duration::from_millis(200)).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                .await
                .unwrap();
        }
    })
    .await;

    let config = ClientConfig {
        max_concurrent: 1,
        ..ClientConfig::default()
    };
    let client = HttpClient::new(config);
    let (request, addr) = simple_get(server);

    let first = client.submit(request.clone(), addr.clone(), Duration::from_secs(5));
    let queued_a = client.submit(request.clone(), addr.clone(), Duration::from_secs(5));
    let queued_b = client.submit(request.clone(), addr.clone(), Duration::from_secs(5));

    // Give the first request time to occupy the only slot.
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.stop();

    assert!(matches!(queued_a.wait().await, Err(Error::Stopped)));
    assert!(matches!(queued_b.wait().await, Err(Error::Stopped)));
    // The in-flight request still runs to completion.
    assert_eq!(first.wait().await.unwrap().body_text(), "ok");

    // And nothing is admitted after stop.
    let late = client.submit(request, addr, Duration::from_secs(5));
    assert!(matches!(late.wait().await, Err(Error::Stopped)));
}

#[tokio::test]
async fn test_failures_are_isolated_per_request() {
    // One destination that answers, one that closes immediately.
    let good = spawn_server(|mut stream: TcpStream| async move {
        if read_request_head(&mut stream).await {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                .await
                .unwrap();
        }
    })
    .await;
    let bad = spawn_server(|stream: TcpStream| async move {
        drop(stream);
    })
    .await;

    let client = HttpClient::new(ClientConfig::default());
    let (good_req, good_addr) = simple_get(good);
    let (bad_req, bad_addr) = simple_get(bad);

    let bad_handle = client.submit(bad_req, bad_addr, Duration::from_secs(2));
    let good_handle = client.submit(good_req, good_addr, Duration::from_secs(2));

    assert!(matches!(
        bad_handle.wait().await,
        Err(Error::ConnectionClosed) | Err(Error::Io(_))
    ));
    assert_eq!(good_handle.wait().await.unwrap().body_text(), "ok");
}
