// Deterministic model stand-ins shared by unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::embeddings::Embedder;
use crate::generation::{GenerationError, Generator};

pub const TEST_DIMENSION: usize = 32;

/// Bag-of-words embedder: identical texts map to identical vectors
#[derive(Debug)]
pub struct HashEmbedder {
    model: String,
    calls: AtomicUsize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::with_model("hash-embedder")
    }
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn hash_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; TEST_DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.to_lowercase().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        let bucket = usize::try_from(hash % TEST_DIMENSION as u64).expect("bucket fits");
        vector[bucket] += 1.0;
    }
    vector
}

impl Embedder for HashEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

/// Embedder whose server is always down
#[derive(Debug)]
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model(&self) -> &str {
        "hash-embedder"
    }

    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow::anyhow!("embedding server unreachable"))
    }
}

/// [`HashEmbedder`] that sleeps before every call
#[derive(Debug)]
pub struct SlowEmbedder {
    delay: Duration,
    inner: HashEmbedder,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: HashEmbedder::new(),
        }
    }
}

impl Embedder for SlowEmbedder {
    fn model(&self) -> &str {
        self.inner.model()
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        thread::sleep(self.delay);
        self.inner.embed(texts)
    }
}

/// Generator returning a canned result and recording every prompt
#[derive(Debug)]
pub struct StubGenerator {
    result: Result<String, GenerationError>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn answering(answer: &str) -> Self {
        Self {
            result: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            result: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

impl Generator for StubGenerator {
    fn model(&self) -> &str {
        "stub-generator"
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());
        self.result.clone()
    }
}
