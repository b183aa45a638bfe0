//! # Task Queue
//!
//! FIFO exclusivity for asynchronous queue commands.
//!
//! Each guild queue owns one [`TaskQueue`]. A command calls
//! [`TaskQueue::acquire`] before touching queue state and holds the returned
//! [`TaskPermit`] for the whole read-modify-write sequence, including the
//! awaits into the transport or the related-song provider. Tickets are
//! admitted strictly in arrival order, so two concurrent `skip` calls can
//! never both observe "one song left" and both fetch a related song.
//!
//! Releasing happens when the permit is dropped, which covers every exit
//! path of a command (`?`, early `return`, panics unwinding through it).
//! A waiter whose future is dropped before admission leaves the line
//! without blocking the tickets behind it.

use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Consistency errors of the task queue. These indicate a defect in the
/// queue engine itself, never a user mistake.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskQueueError {
    #[error("el ticket {ticket} no es el ticket activo")]
    NotActive { ticket: u64 },
}

#[derive(Debug)]
struct Waiter {
    ticket: u64,
    admit: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct State {
    next_ticket: u64,
    active: Option<u64>,
    waiters: VecDeque<Waiter>,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<State>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Espera turno; se resuelve cuando todos los tickets anteriores fueron liberados
    pub async fn acquire(&self) -> TaskPermit<'_> {
        let (ticket, admitted) = {
            let mut state = self.state.lock();
            let ticket = state.next_ticket;
            state.next_ticket += 1;

            // Sin ticket activo la fila siempre está vacía
            if state.active.is_none() {
                state.active = Some(ticket);
                return TaskPermit::new(self, ticket);
            }

            let (admit, admitted) = oneshot::channel();
            state.waiters.push_back(Waiter { ticket, admit });
            debug!("⏳ Ticket {} en espera ({} en fila)", ticket, state.waiters.len());
            (ticket, admitted)
        };

        let pending = PendingTicket {
            queue: self,
            ticket: Some(ticket),
        };

        // El sender sólo se consume al admitir este ticket
        let _ = admitted.await;
        pending.admit()
    }

    /// Número de tickets esperando turno
    pub fn pending(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Indica si algún comando tiene la exclusividad
    pub fn is_locked(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Libera `ticket` y admite al siguiente en la fila
    pub(crate) fn release(&self, ticket: u64) -> Result<(), TaskQueueError> {
        let mut state = self.state.lock();
        if state.active != Some(ticket) {
            error!(
                "❌ Liberación inválida del ticket {} (activo: {:?})",
                ticket, state.active
            );
            return Err(TaskQueueError::NotActive { ticket });
        }

        Self::promote_next(&mut state);
        Ok(())
    }

    /// Retira un ticket cuyo futuro fue descartado antes de observar su admisión
    fn abandon(&self, ticket: u64) {
        let mut state = self.state.lock();
        if state.active == Some(ticket) {
            Self::promote_next(&mut state);
        } else {
            state.waiters.retain(|waiter| waiter.ticket != ticket);
        }
    }

    fn promote_next(state: &mut State) {
        state.active = None;
        while let Some(waiter) = state.waiters.pop_front() {
            state.active = Some(waiter.ticket);
            if waiter.admit.send(()).is_ok() {
                return;
            }
        }
        state.active = None;
    }
}

/// Ticket admitido. Libera la exclusividad al soltarse.
#[derive(Debug)]
#[must_use = "la exclusividad se libera en cuanto se suelta el permiso"]
pub struct TaskPermit<'a> {
    queue: &'a TaskQueue,
    ticket: Option<u64>,
}

impl<'a> TaskPermit<'a> {
    fn new(queue: &'a TaskQueue, ticket: u64) -> Self {
        Self {
            queue,
            ticket: Some(ticket),
        }
    }

    pub fn ticket(&self) -> u64 {
        self.ticket.unwrap_or_default()
    }

    /// Liberación explícita, equivalente a soltar el permiso
    pub fn release(mut self) -> Result<(), TaskQueueError> {
        match self.ticket.take() {
            Some(ticket) => self.queue.release(ticket),
            None => Ok(()),
        }
    }
}

impl Drop for TaskPermit<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            // El error ya quedó registrado en release
            let _ = self.queue.release(ticket);
        }
    }
}

struct PendingTicket<'a> {
    queue: &'a TaskQueue,
    ticket: Option<u64>,
}

impl<'a> PendingTicket<'a> {
    fn admit(mut self) -> TaskPermit<'a> {
        let ticket = self.ticket.take().unwrap_or_default();
        TaskPermit::new(self.queue, ticket)
    }
}

impl Drop for PendingTicket<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            debug!("🚫 Ticket {} abandonado antes de ser admitido", ticket);
            self.queue.abandon(ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_uncontended_acquire() {
        let queue = TaskQueue::new();
        let permit = queue.acquire().await;
        assert!(queue.is_locked());
        assert_eq!(queue.pending(), 0);
        drop(permit);
        assert!(!queue.is_locked());
    }

    #[tokio::test]
    async fn test_tickets_admitted_in_arrival_order() {
        let queue = Arc::new(TaskQueue::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = queue.acquire().await;
        let mut tasks = Vec::new();
        for i in 0..5 {
            let task_queue = queue.clone();
            let order = order.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = task_queue.acquire().await;
                order.lock().push(i);
            }));
            settle().await;
            assert_eq!(queue.pending(), i + 1);
        }

        first.release().unwrap();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
        assert!(!queue.is_locked());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_critical_sections_never_overlap() {
        let queue = Arc::new(TaskQueue::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let queue = queue.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    let _permit = queue.acquire().await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            task.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_double_release_is_reported() {
        let queue = TaskQueue::new();
        let permit = queue.acquire().await;
        let ticket = permit.ticket();
        permit.release().unwrap();

        assert_eq!(
            queue.release(ticket),
            Err(TaskQueueError::NotActive { ticket })
        );
    }

    #[tokio::test]
    async fn test_release_without_active_ticket() {
        let queue = TaskQueue::new();
        assert_eq!(
            queue.release(7),
            Err(TaskQueueError::NotActive { ticket: 7 })
        );
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_block_line() {
        let queue = Arc::new(TaskQueue::new());
        let first = queue.acquire().await;

        let timed_out = tokio::time::timeout(Duration::from_millis(5), queue.acquire()).await;
        assert!(timed_out.is_err());
        assert_eq!(queue.pending(), 0);

        let next = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let permit = queue.acquire().await;
                permit.ticket()
            })
        };
        settle().await;
        drop(first);

        let ticket = tokio::time::timeout(Duration::from_secs(1), next)
            .await
            .expect("el siguiente ticket debe ser admitido")
            .unwrap();
        assert_eq!(ticket, 2);
    }
}
