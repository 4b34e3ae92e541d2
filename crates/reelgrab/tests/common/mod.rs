#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use reelgrab_engine::{DownloaderConfig, RetryPolicy};
use tokio::net::TcpListener;
use url::Url;

/// Local HTTP server on a random port, shut down on drop.
pub struct TestServer {
    base_url: Url,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("test listener address");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.expect("run test server");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("parse base URL"),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        self.base_url
            .join(path)
            .expect("join server URL")
            .to_string()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Default config with millisecond backoff so retry tests stay fast.
pub fn fast_config() -> DownloaderConfig {
    DownloaderConfig::default()
        .with_request_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        })
}
