//! MJPEG relay
//!
//! Copies an upstream byte stream to a sink in bounded chunks without
//! looking at the frames. The upstream is released exactly once on every
//! exit path, including the relay future being dropped mid-copy.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;

/// Upper bound for one relayed chunk (100 KiB)
pub const RELAY_CHUNK_SIZE: usize = 100 * 1024;

/// Content type used when the NAS does not declare one
pub const DEFAULT_MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace";

/// Source side of the relay
#[async_trait]
pub trait Upstream: Send + 'static {
    /// Read at most `max_len` bytes; an empty chunk means the upstream closed
    async fn read_chunk(&mut self, max_len: usize) -> Result<Bytes>;

    /// Give the connection back
    async fn release(&mut self);
}

/// Destination side of the relay
#[async_trait]
pub trait ChunkSink: Send {
    /// Write one chunk; an error means the consumer went away
    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Signal end-of-output
    async fn finish(&mut self);

    /// Resolves once the consumer has gone away
    ///
    /// Lets the relay stop while the upstream is idle. Sinks that cannot
    /// tell never resolve and are only noticed on the next `write`.
    async fn closed(&mut self) {
        futures::future::pending::<()>().await
    }
}

/// Why a relay stopped
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RelayEnd {
    #[default]
    UpstreamClosed,
    SinkClosed,
    UpstreamError(String),
}

/// Outcome of one relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    pub chunks: usize,
    pub bytes: usize,
    pub end: RelayEnd,
}

/// Releases the upstream when dropped, on a spawned task
struct ReleaseOnDrop<U: Upstream>(Option<U>);

impl<U: Upstream> Drop for ReleaseOnDrop<U> {
    fn drop(&mut self) {
        let Some(mut upstream) = self.0.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    upstream.release().await;
                });
            }
            // No runtime left (shutdown): dropping closes the connection
            Err(_) => drop(upstream),
        }
    }
}

/// Relay `upstream` into `sink` until the upstream closes or the sink goes away
pub async fn relay_mjpeg<U, S>(upstream: U, mut sink: S) -> RelayStats
where
    U: Upstream,
    S: ChunkSink,
{
    let mut upstream = ReleaseOnDrop(Some(upstream));
    let mut stats = RelayStats::default();

    let end = loop {
        let Some(source) = upstream.0.as_mut() else {
            break RelayEnd::UpstreamClosed;
        };

        // A stalled upstream must not outlive the consumer
        let read = tokio::select! {
            read = source.read_chunk(RELAY_CHUNK_SIZE) => read,
            _ = sink.closed() => break RelayEnd::SinkClosed,
        };

        let chunk = match read {
            Ok(chunk) => chunk,
            Err(e) => break RelayEnd::UpstreamError(e.to_string()),
        };

        if chunk.is_empty() {
            break RelayEnd::UpstreamClosed;
        }

        let len = chunk.len();
        if sink.write(chunk).await.is_err() {
            break RelayEnd::SinkClosed;
        }

        stats.chunks += 1;
        stats.bytes += len;
    };

    drop(upstream);
    sink.finish().await;

    stats.end = end;
    stats
}

// ========================================
// reqwest upstream
// ========================================

/// Upstream backed by an open reqwest response
pub struct HttpUpstream {
    response: Option<reqwest::Response>,
    pending: Bytes,
    content_type: String,
}

impl HttpUpstream {
    pub fn new(response: reqwest::Response) -> Self {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_MJPEG_CONTENT_TYPE)
            .to_string();

        Self {
            response: Some(response),
            pending: Bytes::new(),
            content_type,
        }
    }

    /// Content type declared by the NAS
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn read_chunk(&mut self, max_len: usize) -> Result<Bytes> {
        while self.pending.is_empty() {
            let Some(response) = self.response.as_mut() else {
                return Ok(Bytes::new());
            };

            match response.chunk().await? {
                Some(chunk) => self.pending = chunk,
                None => return Ok(Bytes::new()),
            }
        }

        let len = max_len.min(self.pending.len());
        Ok(self.pending.split_to(len))
    }

    async fn release(&mut self) {
        if self.response.take().is_some() {
            tracing::debug!("MJPEG upstream released");
        }
    }
}

// ========================================
// channel sink
// ========================================

type BodyItem = std::result::Result<Bytes, std::io::Error>;

/// Sink feeding a bounded channel that backs an HTTP response body
pub struct ChannelSink {
    tx: Option<mpsc::Sender<BodyItem>>,
}

#[async_trait]
impl ChunkSink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| Error::Internal("sink already finished".to_string()))?;

        tx.send(Ok(chunk))
            .await
            .map_err(|_| Error::Internal("stream consumer went away".to_string()))
    }

    async fn finish(&mut self) {
        self.tx.take();
    }

    async fn closed(&mut self) {
        if let Some(tx) = self.tx.as_ref() {
            tx.closed().await;
        }
    }
}

/// Create a sink and the body stream it feeds
///
/// Dropping the stream (client disconnect) closes the channel, which ends
/// the relay even while the upstream is not sending.
pub fn channel_sink(capacity: usize) -> (ChannelSink, impl Stream<Item = BodyItem> + Send + 'static) {
    let (tx, rx) = mpsc::channel(capacity);

    let body = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    (ChannelSink { tx: Some(tx) }, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct FakeUpstream {
        chunks: VecDeque<Bytes>,
        releases: Arc<AtomicUsize>,
    }

    impl FakeUpstream {
        fn new(sizes: &[usize], releases: Arc<AtomicUsize>) -> Self {
            Self {
                chunks: sizes.iter().map(|&n| Bytes::from(vec![0xFF; n])).collect(),
                releases,
            }
        }
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn read_chunk(&mut self, max_len: usize) -> Result<Bytes> {
            let chunk = self.chunks.pop_front().unwrap_or_default();
            assert!(chunk.len() <= max_len);
            Ok(chunk)
        }

        async fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Record {
        writes: Vec<usize>,
        finished: usize,
    }

    struct RecordingSink {
        record: Arc<Mutex<Record>>,
        accept: Option<usize>,
    }

    impl RecordingSink {
        fn new(accept: Option<usize>) -> (Self, Arc<Mutex<Record>>) {
            let record = Arc::new(Mutex::new(Record::default()));
            (
                Self {
                    record: record.clone(),
                    accept,
                },
                record,
            )
        }
    }

    #[async_trait]
    impl ChunkSink for RecordingSink {
        async fn write(&mut self, chunk: Bytes) -> Result<()> {
            let mut record = self.record.lock().unwrap();
            if let Some(limit) = self.accept {
                if record.writes.len() >= limit {
                    return Err(Error::Internal("closed".to_string()));
                }
            }
            record.writes.push(chunk.len());
            Ok(())
        }

        async fn finish(&mut self) {
            self.record.lock().unwrap().finished += 1;
        }
    }

    async fn wait_for_release(releases: &AtomicUsize) {
        for _ in 0..50 {
            if releases.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_relay_three_chunk_upstream() {
        let releases = Arc::new(AtomicUsize::new(0));
        let upstream = FakeUpstream::new(&[50 * 1024, 50 * 1024, 0], releases.clone());
        let (sink, record) = RecordingSink::new(None);

        let stats = relay_mjpeg(upstream, sink).await;
        wait_for_release(&releases).await;

        let record = record.lock().unwrap();
        assert_eq!(record.writes, vec![50 * 1024, 50 * 1024]);
        assert_eq!(record.finished, 1);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.bytes, 100 * 1024);
        assert_eq!(stats.end, RelayEnd::UpstreamClosed);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relay_stops_when_sink_closes() {
        let releases = Arc::new(AtomicUsize::new(0));
        let upstream = FakeUpstream::new(&[10, 10, 10, 10], releases.clone());
        let (sink, record) = RecordingSink::new(Some(1));

        let stats = relay_mjpeg(upstream, sink).await;
        wait_for_release(&releases).await;

        let record = record.lock().unwrap();
        assert_eq!(record.writes, vec![10]);
        assert_eq!(record.finished, 1);
        assert_eq!(stats.end, RelayEnd::SinkClosed);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relay_cancelled_mid_copy_still_releases() {
        struct PendingUpstream {
            releases: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Upstream for PendingUpstream {
            async fn read_chunk(&mut self, _max_len: usize) -> Result<Bytes> {
                futures::future::pending().await
            }

            async fn release(&mut self) {
                self.releases.fetch_add(1, Ordering::SeqCst);
            }
        }

        let releases = Arc::new(AtomicUsize::new(0));
        let (sink, _body) = channel_sink(4);
        let task = tokio::spawn(relay_mjpeg(
            PendingUpstream {
                releases: releases.clone(),
            },
            sink,
        ));

        tokio::task::yield_now().await;
        task.abort();
        let _ = task.await;
        wait_for_release(&releases).await;

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_disconnect_releases_idle_upstream() {
        struct StallingUpstream {
            first: Option<Bytes>,
            releases: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Upstream for StallingUpstream {
            async fn read_chunk(&mut self, _max_len: usize) -> Result<Bytes> {
                match self.first.take() {
                    Some(chunk) => Ok(chunk),
                    None => futures::future::pending().await,
                }
            }

            async fn release(&mut self) {
                self.releases.fetch_add(1, Ordering::SeqCst);
            }
        }

        let releases = Arc::new(AtomicUsize::new(0));
        let (sink, body) = channel_sink(4);
        let task = tokio::spawn(relay_mjpeg(
            StallingUpstream {
                first: Some(Bytes::from_static(b"--myboundary")),
                releases: releases.clone(),
            },
            sink,
        ));

        let mut body = Box::pin(body);
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first.as_ref(), b"--myboundary");
        drop(body);

        let stats = tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("relay kept running after the client left")
            .unwrap();
        wait_for_release(&releases).await;

        assert_eq!(stats.end, RelayEnd::SinkClosed);
        assert_eq!(stats.chunks, 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_sink_ends_body_on_finish() {
        let (mut sink, body) = channel_sink(4);
        sink.write(Bytes::from_static(b"--frame")).await.unwrap();
        sink.finish().await;

        let items: Vec<_> = body.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().as_ref(), b"--frame");

        assert!(sink.write(Bytes::from_static(b"late")).await.is_err());
    }

    #[tokio::test]
    async fn test_channel_sink_write_fails_after_consumer_drops() {
        let (mut sink, body) = channel_sink(1);
        drop(body);
        assert!(sink.write(Bytes::from_static(b"x")).await.is_err());
    }
}
