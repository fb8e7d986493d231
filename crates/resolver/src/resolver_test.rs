//! Tests for the resolver variants

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use steer_ring::Endpoint;
use tokio::sync::mpsc;

use crate::{
    ChangeCallback, DnsResolver, EndpointsApi, EndpointsStream, K8sSvcResolver, ResolveError,
    Resolver, StaticResolver, WatchEvent,
};

type Recorded = Arc<StdMutex<Vec<Vec<Endpoint>>>>;

fn recording_callback() -> (ChangeCallback, Recorded) {
    let seen: Recorded = Arc::new(StdMutex::new(Vec::new()));
    let captured = Arc::clone(&seen);
    let callback: ChangeCallback = Arc::new(move |endpoints| {
        let captured = Arc::clone(&captured);
        Box::pin(async move {
            captured.lock().unwrap().push(endpoints);
        })
    });
    (callback, seen)
}

fn eps(names: &[&str]) -> Vec<Endpoint> {
    names.iter().map(|n| Endpoint::canonical(n)).collect()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

// ============================================================================
// Static resolver
// ============================================================================

#[test]
fn test_static_rejects_empty_list() {
    let hostnames: Vec<String> = Vec::new();
    assert!(matches!(
        StaticResolver::new(&hostnames),
        Err(ResolveError::NoEndpoints)
    ));
}

#[tokio::test]
async fn test_static_adopts_canonical_sorted_set_on_start() {
    let resolver =
        StaticResolver::new(&["backend-2:4318", "backend-1", "backend-1:4317"]).unwrap();
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);

    resolver.start().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], eps(&["backend-1:4317", "backend-2:4318"]));
}

#[tokio::test]
async fn test_static_resolve_is_stable() {
    let resolver = StaticResolver::new(&["a", "b"]).unwrap();
    assert_eq!(resolver.resolve().await.unwrap(), eps(&["a", "b"]));
    assert_eq!(resolver.resolve().await.unwrap(), eps(&["a", "b"]));
}

// ============================================================================
// DNS resolver
// ============================================================================

fn addr(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 4317))
}

fn scripted_lookup(
    results: Arc<StdMutex<Vec<SocketAddr>>>,
) -> Arc<dyn Fn(String) -> futures::future::BoxFuture<'static, std::io::Result<Vec<SocketAddr>>> + Send + Sync>
{
    Arc::new(move |_target| {
        let results = Arc::clone(&results);
        Box::pin(async move { Ok(results.lock().unwrap().clone()) })
    })
}

#[test]
fn test_dns_rejects_empty_hostname() {
    assert!(matches!(
        DnsResolver::new("", None, None, None),
        Err(ResolveError::NoHostname)
    ));
}

#[test]
fn test_dns_rejects_zero_interval() {
    assert!(matches!(
        DnsResolver::new("backends", None, Some(Duration::ZERO), None),
        Err(ResolveError::InvalidInterval)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_dns_start_adopts_inline() {
    let results = Arc::new(StdMutex::new(vec![addr(1), addr(2)]));
    let resolver = DnsResolver::new("backends", None, None, None)
        .unwrap()
        .with_lookup(scripted_lookup(Arc::clone(&results)));
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);

    resolver.start().await.unwrap();

    // Adoption happened before start returned.
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[eps(&["10.0.0.1:4317", "10.0.0.2:4317"])]
    );

    resolver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dns_adopts_on_change_only() {
    let results = Arc::new(StdMutex::new(vec![addr(1)]));
    let resolver = DnsResolver::new("backends", None, Some(Duration::from_millis(50)), None)
        .unwrap()
        .with_lookup(scripted_lookup(Arc::clone(&results)));
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);
    resolver.start().await.unwrap();

    // Several unchanged ticks: no additional adoption.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);

    // Membership grows: exactly one more adoption.
    results.lock().unwrap().push(addr(2));
    let seen_clone = Arc::clone(&seen);
    wait_until(move || seen_clone.lock().unwrap().len() == 2).await;
    assert_eq!(
        seen.lock().unwrap()[1],
        eps(&["10.0.0.1:4317", "10.0.0.2:4317"])
    );

    resolver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dns_failure_keeps_last_adopted_set() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    let lookup: Arc<
        dyn Fn(String) -> futures::future::BoxFuture<'static, std::io::Result<Vec<SocketAddr>>>
            + Send
            + Sync,
    > = Arc::new(move |_target| {
        let n = calls_clone.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if n == 0 {
                Ok(vec![addr(1)])
            } else {
                Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such host",
                ))
            }
        })
    });

    let resolver = DnsResolver::new("backends", None, Some(Duration::from_millis(50)), None)
        .unwrap()
        .with_lookup(lookup);
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);
    resolver.start().await.unwrap();

    // Failing ticks never clear the adopted membership.
    let calls_clone = Arc::clone(&calls);
    wait_until(move || calls_clone.load(Ordering::SeqCst) >= 4).await;
    assert_eq!(seen.lock().unwrap().len(), 1);

    resolver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dns_lookup_timeout() {
    let lookup: Arc<
        dyn Fn(String) -> futures::future::BoxFuture<'static, std::io::Result<Vec<SocketAddr>>>
            + Send
            + Sync,
    > = Arc::new(|_target| Box::pin(std::future::pending()));

    let resolver = DnsResolver::new("backends", None, None, None)
        .unwrap()
        .with_lookup(lookup);

    assert!(matches!(
        resolver.resolve().await,
        Err(ResolveError::LookupTimeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_dns_no_callbacks_after_shutdown() {
    let results = Arc::new(StdMutex::new(vec![addr(1)]));
    let resolver = DnsResolver::new("backends", None, Some(Duration::from_millis(50)), None)
        .unwrap()
        .with_lookup(scripted_lookup(Arc::clone(&results)));
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);
    resolver.start().await.unwrap();

    resolver.shutdown().await.unwrap();

    // A change after shutdown is never observed.
    results.lock().unwrap().push(addr(2));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// ============================================================================
// K8s service resolver
// ============================================================================

struct ChannelStream(mpsc::UnboundedReceiver<WatchEvent>);

#[async_trait]
impl EndpointsStream for ChannelStream {
    async fn next(&mut self) -> Option<WatchEvent> {
        self.0.recv().await
    }
}

struct FakeApi {
    listed: StdMutex<Vec<String>>,
    watch_senders: StdMutex<Vec<mpsc::UnboundedSender<WatchEvent>>>,
    watch_calls: AtomicUsize,
}

impl FakeApi {
    fn new(listed: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            listed: StdMutex::new(listed.iter().map(|s| s.to_string()).collect()),
            watch_senders: StdMutex::new(Vec::new()),
            watch_calls: AtomicUsize::new(0),
        })
    }

    fn send(&self, event: WatchEvent) {
        let senders = self.watch_senders.lock().unwrap();
        senders
            .last()
            .expect("no watch open")
            .send(event)
            .expect("watch stream dropped");
    }

    fn disconnect(&self) {
        self.watch_senders.lock().unwrap().clear();
    }
}

#[async_trait]
impl EndpointsApi for FakeApi {
    async fn list(&self, _service: &str, _namespace: &str) -> Result<Vec<String>, ResolveError> {
        Ok(self.listed.lock().unwrap().clone())
    }

    async fn watch(
        &self,
        _service: &str,
        _namespace: &str,
    ) -> Result<Box<dyn EndpointsStream>, ResolveError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.watch_senders.lock().unwrap().push(tx);
        Ok(Box::new(ChannelStream(rx)))
    }
}

#[test]
fn test_k8s_rejects_missing_service_and_ports() {
    let api = FakeApi::new(&[]);
    assert!(matches!(
        K8sSvcResolver::new(Arc::clone(&api) as Arc<dyn EndpointsApi>, "", vec![4317]),
        Err(ResolveError::NoService)
    ));
    assert!(matches!(
        K8sSvcResolver::new(api as Arc<dyn EndpointsApi>, "otelcol", vec![]),
        Err(ResolveError::NoPorts)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_k8s_initial_list_crossed_with_ports() {
    let api = FakeApi::new(&["10.0.0.1", "10.0.0.2"]);
    let resolver = K8sSvcResolver::new(
        Arc::clone(&api) as Arc<dyn EndpointsApi>,
        "otelcol.observability",
        vec![4317, 4318],
    )
    .unwrap();
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);

    resolver.start().await.unwrap();

    assert_eq!(
        seen.lock().unwrap()[0],
        eps(&[
            "10.0.0.1:4317",
            "10.0.0.1:4318",
            "10.0.0.2:4317",
            "10.0.0.2:4318",
        ])
    );

    resolver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_k8s_applies_deltas() {
    let api = FakeApi::new(&["10.0.0.1"]);
    let resolver = K8sSvcResolver::new(
        Arc::clone(&api) as Arc<dyn EndpointsApi>,
        "otelcol",
        vec![4317],
    )
    .unwrap();
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);
    resolver.start().await.unwrap();

    // Wait for the watch to open before sending events.
    let api_clone = Arc::clone(&api);
    wait_until(move || api_clone.watch_calls.load(Ordering::SeqCst) >= 1).await;

    api.send(WatchEvent::Added(vec!["10.0.0.2".into()]));
    let seen_clone = Arc::clone(&seen);
    wait_until(move || seen_clone.lock().unwrap().len() == 2).await;
    assert_eq!(
        seen.lock().unwrap()[1],
        eps(&["10.0.0.1:4317", "10.0.0.2:4317"])
    );

    api.send(WatchEvent::Deleted(vec!["10.0.0.1".into()]));
    let seen_clone = Arc::clone(&seen);
    wait_until(move || seen_clone.lock().unwrap().len() == 3).await;
    assert_eq!(seen.lock().unwrap()[2], eps(&["10.0.0.2:4317"]));

    api.send(WatchEvent::Modified(vec![
        "10.0.0.3".into(),
        "10.0.0.4".into(),
    ]));
    let seen_clone = Arc::clone(&seen);
    wait_until(move || seen_clone.lock().unwrap().len() == 4).await;
    assert_eq!(
        seen.lock().unwrap()[3],
        eps(&["10.0.0.3:4317", "10.0.0.4:4317"])
    );

    resolver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_k8s_coalesces_no_op_events() {
    let api = FakeApi::new(&["10.0.0.1"]);
    let resolver = K8sSvcResolver::new(
        Arc::clone(&api) as Arc<dyn EndpointsApi>,
        "otelcol",
        vec![4317],
    )
    .unwrap();
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);
    resolver.start().await.unwrap();

    let api_clone = Arc::clone(&api);
    wait_until(move || api_clone.watch_calls.load(Ordering::SeqCst) >= 1).await;

    // An event that leaves the set unchanged fires no callback.
    api.send(WatchEvent::Added(vec!["10.0.0.1".into()]));
    api.send(WatchEvent::Modified(vec!["10.0.0.1".into()]));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);

    resolver.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_k8s_reconnects_after_disconnect() {
    let api = FakeApi::new(&["10.0.0.1"]);
    let resolver = K8sSvcResolver::new(
        Arc::clone(&api) as Arc<dyn EndpointsApi>,
        "otelcol",
        vec![4317],
    )
    .unwrap();
    let (callback, seen) = recording_callback();
    resolver.on_change(callback);
    resolver.start().await.unwrap();

    let api_clone = Arc::clone(&api);
    wait_until(move || api_clone.watch_calls.load(Ordering::SeqCst) >= 1).await;

    // Membership changes while the watch is down; the re-list on
    // reconnect picks it up.
    *api.listed.lock().unwrap() = vec!["10.0.0.1".into(), "10.0.0.9".into()];
    api.disconnect();

    let api_clone = Arc::clone(&api);
    wait_until(move || api_clone.watch_calls.load(Ordering::SeqCst) >= 2).await;
    let seen_clone = Arc::clone(&seen);
    wait_until(move || seen_clone.lock().unwrap().len() == 2).await;
    assert_eq!(
        seen.lock().unwrap()[1],
        eps(&["10.0.0.1:4317", "10.0.0.9:4317"])
    );

    resolver.shutdown().await.unwrap();
}
