//! Prometheus-compatible metrics endpoint
//!
//! Exposes host session metrics in Prometheus text format and as JSON.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::game::state::{GameState, MatchPhase};

/// Tick samples kept for percentile calculation
const TICK_HISTORY: usize = 1000;

/// Metrics registry for the host session
#[derive(Debug)]
pub struct Metrics {
    // Player counts
    pub total_players: AtomicU64,
    pub human_players: AtomicU64,
    pub bot_players: AtomicU64,
    pub zombies: AtomicU64,
    pub survivors: AtomicU64,

    // Match
    /// 0=Lobby, 1=Countdown, 2=Playing, 3=GameOver
    pub match_phase: AtomicU64,
    pub time_left_seconds: AtomicU64,
    pub infections_total: AtomicU64,
    pub matches_finished: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    // Network
    pub connections_active: AtomicU64,
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub messages_dropped: AtomicU64,
    pub decode_failures: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_players: AtomicU64::new(0),
            human_players: AtomicU64::new(0),
            bot_players: AtomicU64::new(0),
            zombies: AtomicU64::new(0),
            survivors: AtomicU64::new(0),
            match_phase: AtomicU64::new(0),
            time_left_seconds: AtomicU64::new(0),
            infections_total: AtomicU64::new(0),
            matches_finished: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us
                .store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Refresh the session gauges from the authoritative state
    pub fn record_game_state(&self, state: &GameState) {
        let bots = state.bot_count() as u64;
        let total = state.players.len() as u64;
        self.total_players.store(total, Ordering::Relaxed);
        self.bot_players.store(bots, Ordering::Relaxed);
        self.human_players.store(total - bots, Ordering::Relaxed);
        self.zombies.store(state.counts.zombies as u64, Ordering::Relaxed);
        self.survivors.store(state.counts.survivors as u64, Ordering::Relaxed);

        let phase = match state.match_state.phase() {
            MatchPhase::Lobby => 0,
            MatchPhase::Countdown => 1,
            MatchPhase::Playing => 2,
            MatchPhase::GameOver => 3,
        };
        self.match_phase.store(phase, Ordering::Relaxed);
        self.time_left_seconds
            .store(state.match_state.time_left().ceil() as u64, Ordering::Relaxed);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn phase_name(&self) -> &'static str {
        match self.match_phase.load(Ordering::Relaxed) {
            0 => "lobby",
            1 => "countdown",
            2 => "playing",
            _ => "game_over",
        }
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("outbreak_players_total", "Total number of players", "gauge",
            self.total_players.load(Ordering::Relaxed));
        metric!("outbreak_players_human", "Number of human players", "gauge",
            self.human_players.load(Ordering::Relaxed));
        metric!("outbreak_players_bot", "Number of bot players", "gauge",
            self.bot_players.load(Ordering::Relaxed));
        metric!("outbreak_zombies", "Players currently in the zombie role", "gauge",
            self.zombies.load(Ordering::Relaxed));
        metric!("outbreak_survivors", "Players currently in the survivor role", "gauge",
            self.survivors.load(Ordering::Relaxed));

        metric!("outbreak_match_phase", "Match phase (0=Lobby, 3=GameOver)", "gauge",
            self.match_phase.load(Ordering::Relaxed));
        output.push_str(&format!(
            "# HELP outbreak_match_state Human-readable match phase\n# TYPE outbreak_match_state gauge\noutbreak_match_state{{phase=\"{}\"}} 1\n",
            self.phase_name()
        ));
        metric!("outbreak_time_left_seconds", "Seconds left in the current phase", "gauge",
            self.time_left_seconds.load(Ordering::Relaxed));
        metric!("outbreak_infections_total", "Survivors infected", "counter",
            self.infections_total.load(Ordering::Relaxed));
        metric!("outbreak_matches_finished_total", "Matches that reached GameOver", "counter",
            self.matches_finished.load(Ordering::Relaxed));

        metric!("outbreak_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("outbreak_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("outbreak_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("outbreak_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("outbreak_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));

        metric!("outbreak_connections_active", "Open peer connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("outbreak_messages_sent_total", "Total messages sent", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("outbreak_messages_received_total", "Total messages received", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("outbreak_messages_dropped_total", "Outbound frames dropped on full or closed queues", "counter",
            self.messages_dropped.load(Ordering::Relaxed));
        metric!("outbreak_decode_failures_total", "Inbound frames that failed to decode", "counter",
            self.decode_failures.load(Ordering::Relaxed));
        metric!("outbreak_bytes_sent_total", "Total bytes sent", "counter",
            self.bytes_sent.load(Ordering::Relaxed));
        metric!("outbreak_bytes_received_total", "Total bytes received", "counter",
            self.bytes_received.load(Ordering::Relaxed));
        metric!("outbreak_uptime_seconds", "Host uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        serde_json::json!({
            "players": {
                "total": load(&self.total_players),
                "human": load(&self.human_players),
                "bot": load(&self.bot_players),
                "zombies": load(&self.zombies),
                "survivors": load(&self.survivors),
            },
            "match": {
                "phase": self.phase_name(),
                "time_left_seconds": load(&self.time_left_seconds),
                "infections": load(&self.infections_total),
                "finished": load(&self.matches_finished),
            },
            "performance": {
                "tick_time_us": load(&self.tick_time_us),
                "tick_time_p95_us": load(&self.tick_time_p95_us),
                "tick_time_p99_us": load(&self.tick_time_p99_us),
                "tick_time_max_us": load(&self.tick_time_max_us),
                "tick_count": load(&self.tick_count),
            },
            "network": {
                "connections": load(&self.connections_active),
                "messages_sent": load(&self.messages_sent),
                "messages_received": load(&self.messages_received),
                "messages_dropped": load(&self.messages_dropped),
                "decode_failures": load(&self.decode_failures),
                "bytes_sent": load(&self.bytes_sent),
                "bytes_received": load(&self.bytes_received),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the HTTP response for a raw request
fn respond(metrics: &Metrics, request: &str) -> String {
    let ok = |content_type: &str, body: String| {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            content_type,
            body.len(),
            body
        )
    };

    if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
        ok("application/json", metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        ok("text/plain; version=0.0.4", metrics.to_prometheus())
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        ok("text/plain", "OK".to_string())
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = respond(&metrics, &request);
                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
