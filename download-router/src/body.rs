use crate::errors::GatewayError;
use crate::fetcher::ArtifactStream;
use crate::metrics_defs::{ARTIFACT_BYTES, ARTIFACT_STREAM_INTERRUPTED};
use futures_util::StreamExt;
use hyper::body::{Body, Bytes, Frame};
use shared::{counter, histogram};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Response body relaying an artifact from the store to the caller chunk by
/// chunk. The upstream stream is released when the body is dropped, whether
/// the transfer completed, failed or the caller went away.
pub struct ArtifactBody {
    stream: ArtifactStream,
    build: String,
    bytes_sent: u64,
    finished: bool,
}

impl ArtifactBody {
    pub fn new(stream: ArtifactStream, build: impl Into<String>) -> Self {
        ArtifactBody {
            stream,
            build: build.into(),
            bytes_sent: 0,
            finished: false,
        }
    }
}

impl Body for ArtifactBody {
    type Data = Bytes;
    type Error = GatewayError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.stream.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                self.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
            Poll::Ready(Some(Err(e))) => {
                // Headers are already out, the caller only sees a truncated body.
                self.finished = true;
                tracing::error!(
                    build = %self.build,
                    bytes_sent = self.bytes_sent,
                    error = %e,
                    "error writing download of application binary"
                );
                counter!(ARTIFACT_STREAM_INTERRUPTED).increment(1);
                Poll::Ready(Some(Err(e.into())))
            }
            Poll::Ready(None) => {
                self.finished = true;
                histogram!(ARTIFACT_BYTES).record(self.bytes_sent as f64);
                tracing::debug!(build = %self.build, bytes_sent = self.bytes_sent, "artifact delivered");
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished
    }
}

impl Drop for ArtifactBody {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                build = %self.build,
                bytes_sent = self.bytes_sent,
                "artifact download abandoned by client"
            );
            counter!(ARTIFACT_STREAM_INTERRUPTED).increment(1);
        }
    }
}
