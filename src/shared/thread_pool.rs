use std::sync::{mpsc, Arc, Mutex};
use std::thread;

/// A pool of OS threads consuming jobs (`FnOnce` closures) from a shared
/// queue. Threads are spawned in the [ThreadPool::new] constructor and
/// joined when the pool is dropped. Used by the dns servers to serve
/// requests concurrently.
pub struct ThreadPool {
    label: String,
    workers: Vec<Worker>,
    sender: mpsc::Sender<PoolMessage>,
}

enum PoolMessage {
    Job(Box<dyn FnOnce() + Send + 'static>),
    Stop,
}

impl ThreadPool {
    /// Creates a new [`ThreadPool`] with `size` threads (must be > 0).
    /// The label is used in logs when the pool is teared down.
    pub fn new(size: usize, label: &str) -> ThreadPool {
        assert!(size > 0);
        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..size).map(|_| Worker::spawn(Arc::clone(&receiver))).collect();
        ThreadPool {
            label: label.to_string(),
            workers,
            sender,
        }
    }

    /// Enqueue a job to be executed by the first free thread of the pool.
    pub fn execute<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.sender.send(PoolMessage::Job(Box::new(job))).unwrap();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        log::warn!("Shutting down '{}' thread pool.", self.label);
        for _ in &self.workers {
            self.sender.send(PoolMessage::Stop).unwrap();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.thread.take() {
                handle.join().unwrap();
            }
        }
        log::warn!("Thread pool '{}' shut down.", self.label);
    }
}

/// A single thread of the [`ThreadPool`]. The thread loops dequeuing
/// jobs from the shared receiver until a stop message arrives.
struct Worker {
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn spawn(receiver: Arc<Mutex<mpsc::Receiver<PoolMessage>>>) -> Worker {
        let thread = thread::spawn(move || loop {
            let message = {
                let receiver_guard = receiver.lock().unwrap();
                receiver_guard.recv().unwrap()
            };
            match message {
                PoolMessage::Stop => return,
                PoolMessage::Job(job) => job(),
            }
        });

        Worker { thread: Some(thread) }
    }
}
