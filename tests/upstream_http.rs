//! End-to-end tests over real sockets: client → proxy → mock backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_cache_proxy::config::ProxyConfig;
use edge_cache_proxy::http::HttpServer;
use edge_cache_proxy::lifecycle::Shutdown;

mod common;

use common::SECRET;

async fn start_proxy(config: ProxyConfig, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn proxies_catalog_bundles_end_to_end() {
    let backend = common::start_mock_backend(r#"{"data":[{"id":1}]}"#).await;
    let shutdown = Shutdown::new();
    let proxy = start_proxy(common::test_config(&backend.base_url()), &shutdown).await;

    let res = client()
        .get(format!(
            "http://{}/catalog/v1/assets/5/bundles?key={}&sortOrder=Desc",
            proxy, SECRET
        ))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-upstream-status"], "200");
    assert_eq!(res.headers()["x-cache-policy"], "OVERRIDE");
    assert_eq!(res.text().await.unwrap(), r#"{"data":[{"id":1}]}"#);

    assert_eq!(backend.targets(), vec!["/v1/assets/5/bundles?limit=100&sortOrder=Asc"]);
    shutdown.trigger();
}

#[tokio::test]
async fn credential_never_reaches_upstream() {
    let backend = common::start_mock_backend("{}").await;
    let shutdown = Shutdown::new();
    let proxy = start_proxy(common::test_config(&backend.base_url()), &shutdown).await;

    let res = client()
        .get(format!(
            "http://{}/avatar/v1/users/77/outfits?page=1&key={}&itemsPerPage=25",
            proxy, SECRET
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let targets = backend.targets();
    assert_eq!(targets, vec!["/v1/users/77/outfits?itemsPerPage=25&page=1"]);
    assert!(!targets[0].contains(SECRET));
    shutdown.trigger();
}

#[tokio::test]
async fn retries_transient_upstream_status() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let backend = common::start_programmable_backend(move |_target| {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                (500, "{}".to_string())
            } else {
                (200, r#"{"ok":true}"#.to_string())
            }
        }
    })
    .await;
    let shutdown = Shutdown::new();
    let proxy = start_proxy(common::test_config(&backend.base_url()), &shutdown).await;

    let res = client()
        .get(format!("http://{}/avatar/v1/users/1/avatar", proxy))
        .header("x-app-key", SECRET)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200, "Should succeed after one retry");
    assert_eq!(res.headers()["x-upstream-attempts"], "2");
    assert_eq!(backend.calls(), 2);
    shutdown.trigger();
}

#[tokio::test]
async fn coalesces_concurrent_requests_over_the_wire() {
    let backend = common::start_programmable_backend(|_target| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        (200, r#"{"slow":true}"#.to_string())
    })
    .await;
    let shutdown = Shutdown::new();
    let proxy = start_proxy(common::test_config(&backend.base_url()), &shutdown).await;

    let client = client();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let url = format!("http://{}/avatar/v1/users/12/outfits?page=1", proxy);
        handles.push(tokio::spawn(async move {
            client.get(url).header("x-app-key", SECRET).send().await.unwrap()
        }));
    }

    for handle in handles {
        let res = handle.await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), r#"{"slow":true}"#);
    }
    assert_eq!(backend.calls(), 1);
    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_returns_bad_gateway() {
    let dead = common::closed_port().await;
    let shutdown = Shutdown::new();
    let proxy = start_proxy(common::test_config(&format!("http://{}", dead)), &shutdown).await;

    let res = client()
        .get(format!("http://{}/avatar/v1/users/1/avatar", proxy))
        .header("x-app-key", SECRET)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    assert_eq!(res.headers()["x-upstream-status"], "0");
    let body: serde_json::Value = serde_json::from_str(&res.text().await.unwrap()).unwrap();
    assert_eq!(body["error"], "upstream unreachable");
    assert_eq!(body["backend"], "avatar");
    shutdown.trigger();
}
