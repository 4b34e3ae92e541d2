mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use reelgrab_engine::{
    CancellationToken, DownloadError, SegmentDownloader, SegmentFetcher, create_client,
};

use common::{TestServer, fast_config};

fn fetcher() -> SegmentFetcher {
    fetcher_with_timeout(fast_config().request_timeout)
}

fn fetcher_with_timeout(request_timeout: Duration) -> SegmentFetcher {
    let config = fast_config().with_request_timeout(request_timeout);
    let client = create_client(&config).unwrap();
    SegmentFetcher::new(client, &config)
}

/// Route whose first `stalled` requests hang well past a short request timeout.
fn stalling_router(stalled: usize, hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/slow.ts",
        get(move || {
            let hits = Arc::clone(&hits);
            async move {
                if hits.fetch_add(1, Ordering::SeqCst) < stalled {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                b"ok".to_vec()
            }
        }),
    )
}

#[tokio::test]
async fn recovers_after_transient_server_errors() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new().route(
        "/seg0.ts",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
                } else {
                    (StatusCode::OK, b"segment-zero".to_vec())
                }
            }
        }),
    );
    let server = TestServer::new(router).await;

    let bytes = fetcher()
        .fetch(&server.url("/seg0.ts"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(&bytes[..], b"segment-zero");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_three_attempts() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new().route(
        "/seg1.ts",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::SERVICE_UNAVAILABLE
            }
        }),
    );
    let server = TestServer::new(router).await;
    let url = server.url("/seg1.ts");

    let err = fetcher()
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    match err {
        DownloadError::Fetch {
            url: failed_url,
            attempts,
            source,
        } => {
            assert_eq!(failed_url, url);
            assert_eq!(attempts, 3);
            assert!(matches!(
                *source,
                DownloadError::HttpStatus { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_retried_then_reported() {
    // Bind and drop a listener so the port is known to be closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = fetcher()
        .fetch(
            &format!("http://127.0.0.1:{port}/seg.ts"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Fetch { attempts: 3, .. }));
}

#[tokio::test]
async fn malformed_url_is_not_retried() {
    let err = fetcher()
        .fetch("::not-a-url::", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::InvalidUrl { .. }));
}

#[tokio::test]
async fn timed_out_attempts_are_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server = TestServer::new(stalling_router(2, Arc::clone(&hits))).await;

    let bytes = fetcher_with_timeout(Duration::from_millis(200))
        .fetch(&server.url("/slow.ts"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(&bytes[..], b"ok");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn stalled_segment_fails_with_timeout_after_three_attempts() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server = TestServer::new(stalling_router(usize::MAX, Arc::clone(&hits))).await;
    let url = server.url("/slow.ts");

    let err = fetcher_with_timeout(Duration::from_millis(200))
        .fetch(&url, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    match err {
        DownloadError::Fetch {
            attempts, source, ..
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                *source,
                DownloadError::Timeout { url: ref timed_out, after }
                    if after == Duration::from_millis(200) && *timed_out == url
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
