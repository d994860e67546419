//! Transport boundary
//!
//! A [`StreamSink`] is whatever carries items to one observer: an RPC
//! server stream, a socket, an in-process channel. A send error ends the
//! pump that owns the sink.

use std::future::Future;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::registry::{SharedEvent, SharedFrame};
use crate::view::{EventSnapshot, FrameSnapshot};

/// Destination of one observer stream
///
/// `send` may wait on the observer's connection; only the owning pump is
/// held up by it.
pub trait StreamSink<T>: Send {
    /// Forward one item to the observer
    fn send(&mut self, item: T) -> impl Future<Output = Result<()>> + Send;
}

/// In-process observer
impl<T: Send> StreamSink<T> for mpsc::Sender<T> {
    fn send(&mut self, item: T) -> impl Future<Output = Result<()>> + Send {
        async move {
            mpsc::Sender::send(&*self, item)
                .await
                .map_err(|_| Error::SinkClosed)
        }
    }
}

/// Writes each item as one line of JSON
///
/// Frames are written as [`FrameSnapshot`]s and events as
/// [`EventSnapshot`]s, i.e. with base64 payloads. Each line is flushed
/// before the next item is taken.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    lines_written: u64,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
        }
    }

    /// Lines written so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_line<S>(&mut self, value: &S) -> Result<()>
    where
        S: Serialize + Sync,
    {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        self.lines_written += 1;
        Ok(())
    }
}

impl<W> StreamSink<SharedFrame> for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn send(&mut self, item: SharedFrame) -> impl Future<Output = Result<()>> + Send {
        async move {
            let snapshot = FrameSnapshot::from_frame(&item);
            self.write_line(&snapshot).await
        }
    }
}

impl<W> StreamSink<SharedEvent> for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn send(&mut self, item: SharedEvent) -> impl Future<Output = Result<()>> + Send {
        async move {
            let snapshot = EventSnapshot::from_event(&item);
            self.write_line(&snapshot).await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, BufReader};

    use super::*;
    use crate::registry::{EventItem, FrameItem};

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (mut tx, mut rx) = mpsc::channel::<u32>(4);

        StreamSink::send(&mut tx, 5).await.unwrap();
        assert_eq!(rx.recv().await, Some(5));
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (mut tx, rx) = mpsc::channel::<u32>(4);
        drop(rx);

        let err = StreamSink::send(&mut tx, 5).await.unwrap_err();
        assert!(matches!(err, Error::SinkClosed));
    }

    #[tokio::test]
    async fn test_json_lines_frames_and_events() {
        let (client, server) = tokio::io::duplex(4096);
        let mut sink = JsonLinesSink::new(client);

        let frame: SharedFrame = Arc::new(FrameItem::preview("a1", vec![1u8, 2, 3], 100));
        StreamSink::send(&mut sink, frame).await.unwrap();
        let event: SharedEvent = Arc::new(EventItem::new("a1", &b"hi"[..]));
        StreamSink::send(&mut sink, event).await.unwrap();
        assert_eq!(sink.lines_written(), 2);

        let mut lines = BufReader::new(server).lines();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            r#"{"agentId":"a1","imageBase64":"AQID","isPreview":true,"timestamp":100}"#
        );
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            r#"{"agentId":"a1","payloadBase64":"aGk="}"#
        );
    }

    #[tokio::test]
    async fn test_json_lines_broken_pipe() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let mut sink = JsonLinesSink::new(client);

        let frame: SharedFrame = Arc::new(FrameItem::offline("a1"));
        let err = StreamSink::send(&mut sink, frame).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_disconnect());
    }
}
