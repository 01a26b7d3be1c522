//! Load test for the pendulum server.
//!
//! Spawns multiple query clients that:
//! - Connect to the `/ws` query channel
//! - Ask for the angle of one pendulum id every interval, round-robin
//! - Classify and count the replies
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N       Number of clients to spawn (default: 100)
//!   --duration S      Test duration in seconds (default: 30)
//!   --interval-ms M   Delay between queries per client (default: 10)
//!   --ids A,B,C       Pendulum ids to query (default: all from GET /pendulums)
//!   --url URL         Query channel URL (default: ws://127.0.0.1:3001/ws)

use futures_util::{SinkExt, StreamExt};
use pendulum_shared::protocol::QueryReply;
use pendulum_shared::Pendulum;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

struct Metrics {
    connected: AtomicU64,
    queries_sent: AtomicU64,
    angles_received: AtomicU64,
    rest_angles: AtomicU64,
    not_found: AtomicU64,
    other_errors: AtomicU64,
    unparsed: AtomicU64,
    errors: AtomicU64,
    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            connected: AtomicU64::new(0),
            queries_sent: AtomicU64::new(0),
            angles_received: AtomicU64::new(0),
            rest_angles: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            other_errors: AtomicU64::new(0),
            unparsed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }

    fn record_reply(&self, text: &str) {
        match QueryReply::parse(text) {
            Some(QueryReply::Angle(angle)) => {
                self.angles_received.fetch_add(1, Ordering::Relaxed);
                if angle == 0.0 {
                    self.rest_angles.fetch_add(1, Ordering::Relaxed);
                }
            }
            Some(QueryReply::NotFound) => {
                self.not_found.fetch_add(1, Ordering::Relaxed);
            }
            Some(_) => {
                self.other_errors.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.unparsed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    ids: Arc<Vec<String>>,
    interval: Duration,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    // Offset each client so they don't all hit the same id together
    let mut next = client_id as usize;

    while Instant::now() < test_end {
        ticker.tick().await;

        let id = &ids[next % ids.len()];
        next += 1;

        let sent_at = Instant::now();
        if ws.send(Message::Text(id.clone().into())).await.is_err() {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            break;
        }
        metrics.queries_sent.fetch_add(1, Ordering::Relaxed);

        // Replies come back in request order, one per query
        let reply = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break Some(text),
                Some(Ok(Message::Close(frame))) => {
                    if client_id < 3 {
                        eprintln!("Client {} got Close: {:?}", client_id, frame);
                    }
                    break None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    if client_id < 3 {
                        eprintln!("Client {} error: {}", client_id, e);
                    }
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break None;
                }
                None => break None,
            }
        };

        let Some(text) = reply else {
            break;
        };
        metrics
            .latency_sum_us
            .fetch_add(sent_at.elapsed().as_micros() as u64, Ordering::Relaxed);
        metrics.latency_count.fetch_add(1, Ordering::Relaxed);
        metrics.record_reply(text.as_str());
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

/// Ask `GET /pendulums` on the same host for the current ids.
async fn discover_ids(ws_url: &str) -> Result<Vec<String>, String> {
    let authority = ws_url
        .strip_prefix("ws://")
        .and_then(|rest| rest.split('/').next())
        .ok_or_else(|| format!("Cannot derive HTTP host from {}", ws_url))?;

    let response = reqwest::Client::new()
        .get(format!("http://{}/pendulums", authority))
        .send()
        .await
        .map_err(|e| format!("GET /pendulums: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("GET /pendulums returned {}", response.status()));
    }

    let records: Vec<Pendulum> = response
        .json()
        .await
        .map_err(|e| format!("Bad /pendulums body: {}", e))?;
    Ok(records.into_iter().map(|p| p.id).collect())
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 100;
    let mut duration_secs: u64 = 30;
    let mut interval_ms: u64 = 10;
    let mut ids: Vec<String> = Vec::new();
    let mut url = "ws://127.0.0.1:3001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--interval-ms" => {
                i += 1;
                interval_ms = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(10);
            }
            "--ids" => {
                i += 1;
                ids = args
                    .get(i)
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|id| !id.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default();
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    if ids.is_empty() {
        match discover_ids(&url).await {
            Ok(found) => ids = found,
            Err(e) => {
                eprintln!("Could not list pendulums: {}", e);
                std::process::exit(1);
            }
        }
    }
    if ids.is_empty() {
        eprintln!("No pendulums to query; create some first or pass --ids");
        std::process::exit(1);
    }

    println!("=== Pendulum Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Query interval: {}ms per client", interval_ms);
    println!("Pendulums: {}", ids.len());
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::new());
    let ids = Arc::new(ids);
    let duration = Duration::from_secs(duration_secs);
    let interval = Duration::from_millis(interval_ms.max(1));

    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let ids = Arc::clone(&ids);
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, ids, interval, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, queries={}, angles={}, at_rest={}, not_found={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.queries_sent.load(Ordering::Relaxed),
                metrics_clone.angles_received.load(Ordering::Relaxed),
                metrics_clone.rest_angles.load(Ordering::Relaxed),
                metrics_clone.not_found.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let queries = metrics.queries_sent.load(Ordering::Relaxed);
    let angles = metrics.angles_received.load(Ordering::Relaxed);
    let at_rest = metrics.rest_angles.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_us.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total queries sent: {}", queries);
    println!("Angle replies: {}", angles);
    println!("Angle replies at rest: {}", at_rest);
    println!(
        "Not-found replies: {}",
        metrics.not_found.load(Ordering::Relaxed)
    );
    println!(
        "Other error replies: {}",
        metrics.other_errors.load(Ordering::Relaxed)
    );
    println!("Unparsed replies: {}", metrics.unparsed.load(Ordering::Relaxed));
    println!("Transport errors: {}", metrics.errors.load(Ordering::Relaxed));

    if latency_count > 0 {
        println!(
            "Average round trip: {:.2}ms",
            latency_sum as f64 / latency_count as f64 / 1000.0
        );
    }

    println!();
    println!(
        "Queries/sec (total): {:.0}",
        queries as f64 / duration_secs.max(1) as f64
    );
    if angles > 0 {
        println!(
            "Stopped share: {:.1}%",
            at_rest as f64 / angles as f64 * 100.0
        );
    }
}
