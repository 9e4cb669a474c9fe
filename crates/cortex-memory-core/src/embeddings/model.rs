//! Primary embedder: a local sentence-embedding model on a dedicated worker
//! thread, so the ONNX runtime never blocks the request-handling thread
//! (spec §5 scheduling model).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{l2_normalize, Embedder, EMBEDDING_DIMENSIONS, EMBED_TIMEOUT_SECS};
use crate::error::{Error, Result};

enum WorkerRequest {
    EmbedBatch(Vec<String>, mpsc::Sender<std::result::Result<Vec<Vec<f32>>, String>>),
    Shutdown,
}

/// Wraps `fastembed::TextEmbedding` behind a worker thread and a bounded
/// request channel. `embed`/`embed_batch` block the calling thread only
/// until the worker replies or `EMBED_TIMEOUT_SECS` elapses — whichever
/// comes first — so a stalled model can never hang a request indefinitely.
pub struct LocalModelEmbedder {
    tx: mpsc::Sender<WorkerRequest>,
    ready: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl LocalModelEmbedder {
    /// Spawn the worker thread and begin loading the model in the
    /// background. `ready()` reports `false` until loading completes.
    pub fn spawn(cache_dir: std::path::PathBuf) -> Self {
        let (tx, rx) = mpsc::channel::<WorkerRequest>();
        let ready = Arc::new(AtomicBool::new(false));
        let ready_writer = Arc::clone(&ready);

        let worker = std::thread::Builder::new()
            .name("cortex-embedder".into())
            .spawn(move || Self::worker_loop(rx, ready_writer, cache_dir))
            .expect("failed to spawn embedder worker thread");

        Self { tx, ready, worker: Some(worker) }
    }

    fn worker_loop(
        rx: mpsc::Receiver<WorkerRequest>,
        ready: Arc<AtomicBool>,
        cache_dir: std::path::PathBuf,
    ) {
        let _ = std::fs::create_dir_all(&cache_dir);
        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_cache_dir(cache_dir);

        let model = match TextEmbedding::try_new(options) {
            Ok(m) => {
                ready.store(true, Ordering::SeqCst);
                Some(m)
            }
            Err(e) => {
                tracing::warn!("embedding model failed to load, falling back: {e}");
                None
            }
        };

        for request in rx {
            match request {
                WorkerRequest::Shutdown => break,
                WorkerRequest::EmbedBatch(texts, reply) => {
                    let result = match &model {
                        Some(m) => m
                            .embed(texts, None)
                            .map(|embeddings| {
                                embeddings
                                    .into_iter()
                                    .map(|mut v| {
                                        v.truncate(EMBEDDING_DIMENSIONS);
                                        v.resize(EMBEDDING_DIMENSIONS, 0.0);
                                        l2_normalize(&mut v);
                                        v
                                    })
                                    .collect()
                            })
                            .map_err(|e| e.to_string()),
                        None => Err("embedding model unavailable".to_string()),
                    };
                    let _ = reply.send(result);
                }
            }
        }
    }

    fn request_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(WorkerRequest::EmbedBatch(texts, reply_tx))
            .map_err(|_| Error::Init("embedder worker has shut down".to_string()))?;

        match reply_rx.recv_timeout(Duration::from_secs(EMBED_TIMEOUT_SECS)) {
            Ok(Ok(vectors)) => Ok(vectors),
            Ok(Err(msg)) => Err(Error::Init(msg)),
            Err(_) => Err(Error::Init(format!(
                "embedding timed out after {EMBED_TIMEOUT_SECS}s"
            ))),
        }
    }
}

impl Embedder for LocalModelEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_batch(vec![text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Init("embedder returned no vector".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.request_batch(texts.to_vec())
    }

    fn ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

impl Drop for LocalModelEmbedder {
    fn drop(&mut self) {
        let _ = self.tx.send(WorkerRequest::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
