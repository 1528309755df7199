//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP concurrente:
//! 1. Un thread acepta conexiones y las encola
//! 2. Un pool fijo de workers saca conexiones de la cola
//! 3. Cada worker lee el request, lo despacha y escribe la respuesta
//! 4. El apagado encola un centinela por worker

pub mod dispatch;
pub mod pool;
pub mod queue;
pub mod tcp;

pub use dispatch::{AppState, Middleware};
pub use pool::WorkerPool;
pub use queue::{QueueFull, Task, TaskQueue};
pub use tcp::{Server, ServerHandle};
