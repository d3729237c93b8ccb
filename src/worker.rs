//! Promises and worker threads for running the landmark detector off the render thread.

use std::{
    io,
    panic::resume_unwind,
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};

/// Creates a connected pair of [`Promise`] and [`PromiseHandle`].
pub fn promise<T>() -> (Promise<T>, PromiseHandle<T>) {
    // Capacity of 1 means that `Promise::fulfill` will never block.
    let (sender, recv) = channel::bounded(1);
    (Promise { inner: sender }, PromiseHandle { recv })
}

/// An empty slot that can be filled with a `T`, fulfilling the promise.
///
/// Fulfilling a [`Promise`] lets the connected [`PromiseHandle`] retrieve the value.
pub struct Promise<T> {
    inner: Sender<T>,
}

impl<T> Promise<T> {
    /// Fulfills the promise with a value, consuming it.
    ///
    /// This method does not block or fail. If the connected [`PromiseHandle`] was dropped, `value`
    /// is dropped and nothing happens.
    pub fn fulfill(self, value: T) {
        self.inner.send(value).ok();
    }
}

/// A handle connected to a [`Promise`] that will eventually resolve to a value of type `T`.
pub struct PromiseHandle<T> {
    recv: Receiver<T>,
}

impl<T> PromiseHandle<T> {
    /// Blocks the calling thread until the [`Promise`] is fulfilled.
    pub fn block(self) -> Result<T, PromiseDropped> {
        self.recv.recv().map_err(|_| PromiseDropped { _priv: () })
    }

    /// Retrieves the value without blocking.
    ///
    /// Returns [`None`] while the [`Promise`] is still pending. Once this returns [`Some`], the
    /// handle is spent and must not be polled again.
    pub fn poll(&self) -> Option<Result<T, PromiseDropped>> {
        match self.recv.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PromiseDropped { _priv: () })),
        }
    }
}

/// Indicates that the connected [`Promise`] was dropped without being fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromiseDropped {
    _priv: (),
}

/// A builder object that can be used to configure and spawn a [`Worker`].
#[derive(Clone)]
pub struct WorkerBuilder {
    name: Option<String>,
    capacity: usize,
}

impl WorkerBuilder {
    /// Sets the name of the [`Worker`] thread.
    pub fn name<N: Into<String>>(self, name: N) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Sets the channel capacity of the [`Worker`].
    ///
    /// With the default capacity of 0, [`Worker::send`] blocks until the worker has finished
    /// processing any preceding message.
    pub fn capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Spawns a [`Worker`] thread that uses `handler` to process incoming messages.
    pub fn spawn<I, F>(self, mut handler: F) -> io::Result<Worker<I>>
    where
        I: Send + 'static,
        F: FnMut(I) + Send + 'static,
    {
        let (sender, recv) = channel::bounded(self.capacity);
        let name = self.name.unwrap_or_else(|| "worker".to_string());
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            log::trace!("worker '{name}' starting");
            for message in recv {
                handler(message);
            }
            log::trace!("worker '{name}' exiting");
        })?;

        Ok(Worker {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

/// A handle to a worker thread that processes messages of type `I`.
///
/// When dropped, the channel to the thread will be closed and the thread will be joined. If the
/// thread has panicked, the panic will be forwarded to the thread dropping the `Worker`.
pub struct Worker<I: Send + 'static> {
    sender: Option<Sender<I>>,
    handle: Option<JoinHandle<()>>,
}

impl<I: Send + 'static> Drop for Worker<I> {
    fn drop(&mut self) {
        drop(self.sender.take());
        self.wait_for_exit();
    }
}

impl Worker<()> {
    /// Returns a builder that can be used to configure and spawn a [`Worker`].
    #[inline]
    pub fn builder() -> WorkerBuilder {
        WorkerBuilder {
            name: None,
            capacity: 0,
        }
    }
}

impl<I: Send + 'static> Worker<I> {
    fn wait_for_exit(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                if !thread::panicking() {
                    resume_unwind(payload);
                }
            }
        }
    }

    /// Sends a message to the worker thread.
    ///
    /// This will block until the thread is available to accept the message.
    ///
    /// If the worker has panicked, this will propagate the panic to the calling thread.
    pub fn send(&mut self, msg: I) {
        let sent = match &self.sender {
            Some(sender) => sender.send(msg).is_ok(),
            None => false,
        };
        if !sent {
            self.wait_for_exit();
        }
    }

    /// Sends a message to the worker thread without blocking.
    ///
    /// Fails with [`TrySendError::Full`] if the channel has no room for `msg`, and with
    /// [`TrySendError::Disconnected`] if the worker thread has exited. Never propagates a panic of
    /// the worker thread.
    pub fn try_send(&self, msg: I) -> Result<(), TrySendError<I>> {
        match &self.sender {
            Some(sender) => sender.try_send(msg),
            None => Err(TrySendError::Disconnected(msg)),
        }
    }

    /// Closes the channel and waits for the worker thread to exit.
    ///
    /// Unlike dropping the [`Worker`], this returns the panic payload of the thread (if any)
    /// instead of resuming the panic.
    pub fn join(mut self) -> thread::Result<()> {
        drop(self.sender.take());
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}
