//! # Cola de Tareas
//! src/server/queue.rs
//!
//! Cola FIFO thread-safe entre el accept loop (único productor) y los
//! workers (consumidores). `pop` bloquea hasta que haya algo.
//!
//! Además de trabajo, la cola transporta un centinela `Task::Shutdown`: el
//! worker que lo saca termina su loop. Se encola uno por worker para un
//! apagado cooperativo.
//!
//! Sin capacidad la cola crece sin límite. Con capacidad, `push` rechaza
//! cuando está llena en lugar de bloquear al productor; los centinelas
//! nunca se rechazan.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use thiserror::Error;

/// Elemento de la cola
#[derive(Debug)]
pub enum Task<T> {
    Work(T),
    Shutdown,
}

/// La cola estaba llena; se devuelve el elemento al llamador
#[derive(Debug, Error)]
#[error("queue is full (capacity {capacity})")]
pub struct QueueFull<T> {
    pub item: T,
    pub capacity: usize,
}

pub struct TaskQueue<T> {
    items: Arc<Mutex<VecDeque<Task<T>>>>,

    /// Notifica a los workers esperando
    available: Arc<Condvar>,

    capacity: Option<usize>,
}

impl<T> TaskQueue<T> {
    /// Cola sin límite
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Cola con capacidad máxima para trabajo (`None` = sin límite)
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
            available: Arc::new(Condvar::new()),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Task<T>>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Encola trabajo. Falla solo si la cola tiene capacidad y está llena.
    pub fn push(&self, item: T) -> Result<(), QueueFull<T>> {
        let mut items = self.lock();

        if let Some(capacity) = self.capacity {
            let pending = items.iter().filter(|task| matches!(task, Task::Work(_))).count();
            if pending >= capacity {
                return Err(QueueFull { item, capacity });
            }
        }

        items.push_back(Task::Work(item));
        self.available.notify_one();
        Ok(())
    }

    /// Encola un centinela de apagado
    pub fn push_shutdown(&self) {
        self.lock().push_back(Task::Shutdown);
        self.available.notify_one();
    }

    /// Saca el elemento más antiguo, bloqueando mientras la cola esté vacía
    pub fn pop(&self) -> Task<T> {
        let mut items = self.lock();

        loop {
            if let Some(task) = items.pop_front() {
                return task;
            }

            items = self
                .available
                .wait(items)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Versión no bloqueante de `pop`
    pub fn try_pop(&self) -> Option<Task<T>> {
        self.lock().pop_front()
    }

    /// Elementos pendientes, centinelas incluidos
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            available: Arc::clone(&self.available),
            capacity: self.capacity,
        }
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn unwrap_work<T>(task: Task<T>) -> T {
        match task {
            Task::Work(item) => item,
            Task::Shutdown => panic!("expected work, got shutdown"),
        }
    }

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::unbounded();
        for i in 0..5 {
            queue.push(i).unwrap();
        }
        let out: Vec<i32> = (0..5).map(|_| unwrap_work(queue.pop())).collect();
        assert_eq!(out, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_unbounded_grows() {
        let queue = TaskQueue::unbounded();
        for i in 0..10_000 {
            queue.push(i).unwrap();
        }
        assert_eq!(queue.len(), 10_000);
    }

    #[test]
    fn test_bounded_rejects_when_full() {
        let queue = TaskQueue::with_capacity(Some(2));
        queue.push("a").unwrap();
        queue.push("b").unwrap();

        let err = queue.push("c").unwrap_err();
        assert_eq!(err.item, "c");
        assert_eq!(err.capacity, 2);

        // Los centinelas siempre entran
        queue.push_shutdown();
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_shutdown_is_delivered_in_order() {
        let queue = TaskQueue::unbounded();
        queue.push(1).unwrap();
        queue.push_shutdown();

        assert!(matches!(queue.pop(), Task::Work(1)));
        assert!(matches!(queue.pop(), Task::Shutdown));
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue: TaskQueue<u32> = TaskQueue::unbounded();
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || unwrap_work(queue.pop()))
        };

        thread::sleep(Duration::from_millis(50));
        queue.push(42).unwrap();

        assert_eq!(consumer.join().unwrap(), 42);
    }

    #[test]
    fn test_multiple_consumers_each_item_once() {
        let queue: TaskQueue<u32> = TaskQueue::unbounded();
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Task::Work(item) = queue.pop() {
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        for i in 0..1000 {
            queue.push(i).unwrap();
        }
        for _ in 0..4 {
            queue.push_shutdown();
        }

        let mut all: Vec<u32> = consumers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
