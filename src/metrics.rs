//! # Métricas
//! src/metrics.rs
//!
//! Contadores compartidos entre workers: requests atendidos por código,
//! latencias recientes, conexiones rechazadas por cola llena, workers
//! ocupados y profundidad de la cola.

use crate::http::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Latencias que se guardan para calcular percentiles
const LATENCY_WINDOW: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    total_requests: u64,
    status_codes: HashMap<u16, u64>,

    /// Microsegundos, las más viejas primero
    latencies: VecDeque<u64>,

    rejected_connections: u64,
    busy_workers: u64,
}

/// Foto de las métricas en un instante
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub status_codes: HashMap<u16, u64>,
    pub rejected_connections: u64,
    pub busy_workers: u64,

    /// Conexiones esperando un worker. Lo completa quien conoce la cola.
    pub queue_depth: usize,

    pub uptime: Duration,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
}

impl MetricsSnapshot {
    /// Requests respondidos con `status`
    pub fn count(&self, status: StatusCode) -> u64 {
        self.status_codes.get(&status.as_u16()).copied().unwrap_or(0)
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData::default())),
            start_time: Instant::now(),
        }
    }

    // Un worker que entra en pánico con el lock tomado no debe dejar las
    // métricas inutilizables para el resto
    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registra un request atendido
    pub fn record_request(&self, status: StatusCode, latency: Duration) {
        let mut data = self.data();

        data.total_requests += 1;
        *data.status_codes.entry(status.as_u16()).or_insert(0) += 1;

        if data.latencies.len() >= LATENCY_WINDOW {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);
    }

    /// Conexión rechazada antes de llegar a un worker
    pub fn record_rejected(&self) {
        self.data().rejected_connections += 1;
    }

    /// Marca un worker como ocupado hasta que se suelte el guard, también
    /// si el trabajo termina en pánico
    #[must_use = "el worker vuelve a idle al soltar el guard"]
    pub fn worker_busy(&self) -> BusyGuard {
        self.data().busy_workers += 1;
        BusyGuard {
            metrics: self.clone(),
        }
    }

    fn worker_idle(&self) {
        let mut data = self.data();
        data.busy_workers = data.busy_workers.saturating_sub(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();
        let (p50, p95, p99, avg) = percentiles(&data.latencies);

        MetricsSnapshot {
            total_requests: data.total_requests,
            status_codes: data.status_codes.clone(),
            rejected_connections: data.rejected_connections,
            busy_workers: data.busy_workers,
            queue_depth: 0,
            uptime: self.start_time.elapsed(),
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
        }
    }
}

/// Devuelve el worker a idle en `Drop`
pub struct BusyGuard {
    metrics: MetricsCollector,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.metrics.worker_idle();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// (p50, p95, p99, promedio)
fn percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let at = |pct: usize| sorted[(len * pct / 100).min(len - 1)];
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (at(50), at(95), at(99), avg)
}
