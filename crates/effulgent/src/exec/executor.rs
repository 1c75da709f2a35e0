use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

type Job<B> = Box<dyn FnOnce(&mut B) + Send + 'static>;

/// Errors reported by [`BackendExecutor`].
#[derive(Debug)]
pub enum ExecutorError {
    /// The executor thread could not be spawned.
    Spawn(std::io::Error),
    /// The backend factory failed on the executor thread.
    Backend(anyhow::Error),
    /// The executor thread is gone (a job panicked or the queue was closed).
    Closed,
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::Spawn(e) => write!(f, "failed to spawn backend thread: {e}"),
            ExecutorError::Backend(e) => write!(f, "failed to initialize backend: {e:#}"),
            ExecutorError::Closed => f.write_str("backend executor is closed"),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Spawn(e) => Some(e),
            ExecutorError::Backend(e) => Some(&**e),
            ExecutorError::Closed => None,
        }
    }
}

/// Single-threaded executor that owns a backend.
///
/// Native windowing toolkits expect every window, renderer and event call to
/// happen on one thread. The executor spawns that thread, builds the backend
/// on it, and runs submitted jobs strictly in submission order. The backend
/// never leaves the thread, so it does not need to be `Send`.
///
/// Dropping the executor closes the queue, lets pending jobs finish and joins
/// the thread.
pub struct BackendExecutor<B> {
    tx: Option<Sender<Job<B>>>,
    thread: Option<JoinHandle<()>>,
    name: String,
}

impl<B: 'static> BackendExecutor<B> {
    /// Spawns the executor thread and builds the backend on it.
    ///
    /// Blocks until `factory` has returned, so a backend that fails to
    /// initialize is reported here rather than on the first call.
    pub fn spawn<F>(name: impl Into<String>, factory: F) -> Result<Self, ExecutorError>
    where
        F: FnOnce() -> anyhow::Result<B> + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Job<B>>();
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || match factory() {
                Ok(backend) => {
                    let _ = ready_tx.send(Ok(()));
                    drop(ready_tx);
                    serve(backend, rx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(ExecutorError::Spawn)?;

        let ready = ready_rx.recv().map_err(|_| ExecutorError::Closed)?;
        if let Err(e) = ready {
            let _ = thread.join();
            return Err(ExecutorError::Backend(e));
        }

        log::debug!("backend executor `{name}` started");

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
            name,
        })
    }

    /// Name of the executor thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `job` without waiting for it to run.
    pub fn submit<F>(&self, job: F) -> Result<(), ExecutorError>
    where
        F: FnOnce(&mut B) + Send + 'static,
    {
        let tx = self.tx.as_ref().ok_or(ExecutorError::Closed)?;
        tx.send(Box::new(job)).map_err(|_| ExecutorError::Closed)
    }

    /// Queues `job` and blocks until it has run, returning its result.
    ///
    /// Every job submitted earlier has completed by the time this returns.
    pub fn call<R, F>(&self, job: F) -> Result<R, ExecutorError>
    where
        R: Send + 'static,
        F: FnOnce(&mut B) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.submit(move |backend| {
            let _ = reply_tx.send(job(backend));
        })?;
        reply_rx.recv().map_err(|_| ExecutorError::Closed)
    }

    /// Blocks until every job submitted so far has run.
    pub fn flush(&self) -> Result<(), ExecutorError> {
        self.call(|_| ())
    }
}

impl<B> Drop for BackendExecutor<B> {
    fn drop(&mut self) {
        // Closing the sender ends the serve loop once the queue is drained.
        drop(self.tx.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("backend executor `{}` panicked", self.name);
            }
        }
    }
}

fn serve<B>(mut backend: B, rx: Receiver<Job<B>>) {
    while let Ok(job) = rx.recv() {
        job(&mut backend);
    }
}
