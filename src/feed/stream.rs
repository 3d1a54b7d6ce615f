//! Stream-based feed.
//!
//! Receives readings as newline-delimited JSON from an async byte stream,
//! typically a TCP connection to the ingestion process.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Feed;
use crate::data::Reading;
use crate::error::FeedError;
use crate::store::MemoryStore;

/// A feed that appends readings arriving on an async stream.
///
/// A background task reads one JSON reading per line and inserts it into
/// the store. Lines that fail to parse are skipped and recorded as the
/// current error. When the stream ends the feed reports "Connection closed"
/// so the dashboard can show that it is no longer live.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use plantpulse::feed::StreamFeed;
/// use plantpulse::store::MemoryStore;
///
/// # tokio_test::block_on(async {
/// let data = b"{\"timestamp\": 0, \"sensors\": {\"moisture\": 40}}\n";
/// let feed = StreamFeed::spawn(Cursor::new(data.to_vec()), MemoryStore::new("memory"), "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamFeed {
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
    task: JoinHandle<()>,
}

impl StreamFeed {
    /// Spawn a background task that reads from the given async reader.
    pub fn spawn<R>(reader: R, store: MemoryStore, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let last_error = Arc::new(Mutex::new(None));
        let error_handle = last_error.clone();
        let desc = description.to_string();

        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        info!(source = %desc, "Reading stream closed");
                        *error_handle.lock() = Some(FeedError::Closed.to_string());
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Reading>(trimmed) {
                            Ok(reading) => {
                                debug!(timestamp = %reading.timestamp, "Received reading");
                                *error_handle.lock() = None;
                                store.insert(reading);
                            }
                            Err(e) => {
                                warn!(error = %e, "Skipping malformed reading");
                                *error_handle.lock() = Some(FeedError::from(e).to_string());
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Reading stream failed");
                        *error_handle.lock() = Some(FeedError::from(e).to_string());
                        break;
                    }
                }
            }
        });

        Self {
            description: format!("stream: {}", description),
            last_error,
            task,
        }
    }

    /// Connect to a TCP endpoint serving newline-delimited readings.
    pub async fn connect(address: &str, store: MemoryStore) -> Result<Self, FeedError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| FeedError::Connect {
                address: address.to_string(),
                source,
            })?;
        info!(address, "Connected to reading stream");
        Ok(Self::spawn(stream, store, &format!("tcp://{}", address)))
    }

    /// True once the reader task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for StreamFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Feed for StreamFeed {
    fn poll(&mut self) -> bool {
        false
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metric;
    use std::io::Cursor;

    fn line(ms: i64, moisture: f64) -> String {
        format!(r#"{{"timestamp":{},"sensors":{{"moisture":{}}}}}"#, ms, moisture)
    }

    #[tokio::test]
    async fn test_stream_feed_inserts_readings() {
        let data = format!("{}\n{}\n", line(1000, 30.0), line(2000, 31.0));
        let store = MemoryStore::new("test");

        let feed = StreamFeed::spawn(Cursor::new(data), store.clone(), "test");

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(store.len(), 2);
        assert!(feed.is_finished());
        assert_eq!(feed.error().as_deref(), Some("Connection closed"));
    }

    #[tokio::test]
    async fn test_stream_feed_skips_bad_lines() {
        let data = format!("garbage\n{}\n", line(1000, 30.0));
        let store = MemoryStore::new("test");

        let _feed = StreamFeed::spawn(Cursor::new(data), store.clone(), "test");

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_feed_notifies_subscribers() {
        use crate::store::{ReadingQuery, ReadingStore, SnapshotPoll};

        let store = MemoryStore::new("test");
        let mut latest = store.subscribe(ReadingQuery::latest()).unwrap();
        let _ = latest.poll();

        let _feed = StreamFeed::spawn(Cursor::new(format!("{}\n", line(5000, 55.0))), store.clone(), "test");

        let rows = latest.changed().await.unwrap();
        assert_eq!(rows[0].value(Metric::Moisture), Some(55.0));
        assert_eq!(latest.poll(), SnapshotPoll::Idle);
    }

    #[tokio::test]
    async fn test_connect_reads_from_tcp() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(format!("{}\n", line(1000, 42.0)).as_bytes())
                .await
                .unwrap();
        });

        let store = MemoryStore::new("test");
        let feed = StreamFeed::connect(&address, store.clone()).await.unwrap();
        server.await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(store.len(), 1);
        assert_eq!(feed.description(), format!("stream: tcp://{}", address));
    }

    #[tokio::test]
    async fn test_connect_failure_names_address() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = StreamFeed::connect(&address, MemoryStore::new("test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains(&address));
    }

    #[tokio::test]
    async fn test_stream_feed_description() {
        let feed = StreamFeed::spawn(Cursor::new(""), MemoryStore::new("test"), "tcp://localhost:9090");
        assert_eq!(feed.description(), "stream: tcp://localhost:9090");
    }
}
