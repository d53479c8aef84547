//! Shared relay runtime state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tandem_translate::Translator;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::registry::SessionRegistry;
use crate::timer::TimerEngine;

/// Everything the frame handlers need, shared across connections.
pub struct RelayState {
    /// Session membership and broadcast fan-out.
    pub registry: Arc<SessionRegistry>,
    /// Timer lifecycle driver.
    pub timer: TimerEngine,
    /// Chat translation backend.
    pub translator: Arc<dyn Translator>,
    /// Language the teacher writes in.
    pub source_lang: String,
    connections: AtomicUsize,
}

impl RelayState {
    /// Assemble relay state from configuration and a translator.
    pub fn new(
        config: &RelayConfig,
        translator: Arc<dyn Translator>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        let registry = Arc::new(SessionRegistry::new(config.default_student_lang.clone()));
        let timer = TimerEngine::new(Arc::clone(&registry), shutdown);
        Arc::new(Self {
            registry,
            timer,
            translator,
            source_lang: config.source_lang.clone(),
            connections: AtomicUsize::new(0),
        })
    }

    /// Record a newly opened connection.
    pub fn connection_opened(&self) {
        let _ = self.connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed connection.
    pub fn connection_closed(&self) {
        let _ = self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Currently open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}
