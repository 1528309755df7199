//! # Pool de Workers
//! src/server/pool.rs
//!
//! Un número fijo de threads de larga vida que consumen la misma
//! `TaskQueue`. Cada worker procesa un elemento completo antes de tomar el
//! siguiente y solo termina al sacar un centinela `Task::Shutdown`.

use super::queue::{Task, TaskQueue};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct WorkerPool<T> {
    queue: TaskQueue<T>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Arranca `size` workers que ejecutan `job` por cada elemento de `queue`
    pub fn spawn<F>(size: usize, queue: TaskQueue<T>, job: F) -> std::io::Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            let queue = queue.clone();
            let job = Arc::clone(&job);

            let handle = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(id, queue, job))?;
            workers.push(handle);
        }

        tracing::info!(workers = size, "worker pool started");

        Ok(Self { queue, workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn queue(&self) -> &TaskQueue<T> {
        &self.queue
    }

    /// Encola un centinela por worker y espera a que todos terminen.
    /// El trabajo encolado antes de los centinelas se procesa primero.
    pub fn shutdown(self) {
        for _ in 0..self.workers.len() {
            self.queue.push_shutdown();
        }

        for handle in self.workers {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::error!(worker = %name, "worker thread panicked");
            }
        }

        tracing::info!("worker pool stopped");
    }
}

fn worker_loop<T, F>(id: usize, queue: TaskQueue<T>, job: Arc<F>)
where
    F: Fn(T),
{
    tracing::debug!(worker = id, "worker started");

    loop {
        let item = match queue.pop() {
            Task::Work(item) => item,
            Task::Shutdown => break,
        };

        // Un fallo en un elemento nunca mata al worker
        if panic::catch_unwind(AssertUnwindSafe(|| job(item))).is_err() {
            tracing::error!(worker = id, "job panicked, worker keeps running");
        }
    }

    tracing::debug!(worker = id, "worker stopped");
}
