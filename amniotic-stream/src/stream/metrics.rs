//! Live resource counters for stream sessions
//!
//! Gauges are incremented when a resource is acquired and decremented by a
//! [`ResourceGuard`] when it is dropped, so they stay correct on every exit
//! path including panics inside a session thread.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Which gauge a guard releases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Session,
    Decoder,
    Encoder,
}

/// Process-wide streaming counters
#[derive(Debug, Default)]
pub struct StreamMetrics {
    active_sessions: AtomicUsize,
    open_decoders: AtomicUsize,
    open_encoders: AtomicUsize,
    sessions_started: AtomicU64,
    decoder_failures: AtomicU64,
}

/// Point-in-time copy of [`StreamMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub active_sessions: usize,
    pub open_decoders: usize,
    pub open_encoders: usize,
    pub sessions_started: u64,
    pub decoder_failures: u64,
}

impl StreamMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn gauge(&self, resource: Resource) -> &AtomicUsize {
        match resource {
            Resource::Session => &self.active_sessions,
            Resource::Decoder => &self.open_decoders,
            Resource::Encoder => &self.open_encoders,
        }
    }

    /// Count a newly acquired resource; the returned guard releases it
    pub fn acquire(self: &Arc<Self>, resource: Resource) -> ResourceGuard {
        self.gauge(resource).fetch_add(1, Ordering::SeqCst);
        if resource == Resource::Session {
            self.sessions_started.fetch_add(1, Ordering::Relaxed);
        }
        ResourceGuard {
            metrics: Arc::clone(self),
            resource,
        }
    }

    pub fn record_decoder_failure(&self) {
        self.decoder_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    pub fn open_decoders(&self) -> usize {
        self.open_decoders.load(Ordering::SeqCst)
    }

    pub fn open_encoders(&self) -> usize {
        self.open_encoders.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_sessions: self.active_sessions(),
            open_decoders: self.open_decoders(),
            open_encoders: self.open_encoders(),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            decoder_failures: self.decoder_failures.load(Ordering::Relaxed),
        }
    }
}

/// Decrements its gauge on drop
#[derive(Debug)]
pub struct ResourceGuard {
    metrics: Arc<StreamMetrics>,
    resource: Resource,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.metrics.gauge(self.resource).fetch_sub(1, Ordering::SeqCst);
    }
}
