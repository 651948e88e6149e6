//! Bounded FIFO channels for the capture pipeline workers.
//!
//! Receivers park on a condition variable while the queue is empty; senders
//! park while it is full. Closing from either side wakes all waiters. A
//! rejected send hands the value back so callers can complete or retry it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Result of attempting to enqueue. Rejections return the value.
#[derive(Debug)]
pub enum SendOutcome<T> {
    /// Value was accepted.
    Ok,
    /// Queue is full (non-blocking send only).
    Full(T),
    /// Queue is closed.
    Closed(T),
}

impl<T> SendOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, SendOutcome::Ok)
    }
}

/// Result of attempting to dequeue.
#[derive(Debug)]
pub enum RecvOutcome<T> {
    /// Received value.
    Data(T),
    /// Queue currently empty (timed out or non-blocking receive).
    Empty,
    /// Queue has been closed and drained.
    Closed,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    readable: Condvar,
    writable: Condvar,
}

/// Sender half of a bounded queue.
pub struct BoundedTx<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for BoundedTx<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> BoundedTx<T> {
    /// Attempt to send without blocking.
    pub fn try_send(&self, value: T) -> SendOutcome<T> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return SendOutcome::Closed(value);
        }
        if state.items.len() >= self.inner.capacity {
            return SendOutcome::Full(value);
        }
        state.items.push_back(value);
        self.inner.readable.notify_one();
        SendOutcome::Ok
    }

    /// Send, parking until there is room or the queue closes.
    pub fn send(&self, value: T) -> SendOutcome<T> {
        let mut state = self.inner.state.lock();
        while !state.closed && state.items.len() >= self.inner.capacity {
            self.inner.writable.wait(&mut state);
        }
        if state.closed {
            return SendOutcome::Closed(value);
        }
        state.items.push_back(value);
        self.inner.readable.notify_one();
        SendOutcome::Ok
    }

    /// Close the queue; receivers drain remaining items then see `Closed`.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        self.inner.readable.notify_all();
        self.inner.writable.notify_all();
    }
}

/// Receiver half of a bounded queue.
pub struct BoundedRx<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for BoundedRx<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> BoundedRx<T> {
    /// Attempt to receive without blocking.
    pub fn try_recv(&self) -> RecvOutcome<T> {
        let mut state = self.inner.state.lock();
        match state.items.pop_front() {
            Some(value) => {
                self.inner.writable.notify_one();
                RecvOutcome::Data(value)
            }
            None if state.closed => RecvOutcome::Closed,
            None => RecvOutcome::Empty,
        }
    }

    /// Receive, parking up to `timeout` while the queue is empty.
    ///
    /// A bounded wait keeps worker loops responsive to stop signals.
    pub fn recv_timeout(&self, timeout: Duration) -> RecvOutcome<T> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(value) = state.items.pop_front() {
                self.inner.writable.notify_one();
                return RecvOutcome::Data(value);
            }
            if state.closed {
                return RecvOutcome::Closed;
            }
            if self
                .inner
                .readable
                .wait_for(&mut state, timeout)
                .timed_out()
            {
                return RecvOutcome::Empty;
            }
        }
    }

    /// Close the queue from the receiving side; senders see `Closed`.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        self.inner.readable.notify_all();
        self.inner.writable.notify_all();
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Create a bounded queue with the given capacity (at least 1).
pub fn bounded<T>(capacity: usize) -> (BoundedTx<T>, BoundedRx<T>) {
    let inner = Arc::new(Shared {
        state: Mutex::new(State {
            items: VecDeque::new(),
            closed: false,
        }),
        capacity: capacity.max(1),
        readable: Condvar::new(),
        writable: Condvar::new(),
    });
    (
        BoundedTx {
            inner: inner.clone(),
        },
        BoundedRx { inner },
    )
}
