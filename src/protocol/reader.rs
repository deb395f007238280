//! Drives a [`SecureMessageReader`] from an async byte stream.

use crate::core::codec::ChunkCodec;
use crate::error::Result;
use crate::protocol::pipeline::SecureMessageReader;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, instrument};

/// Feed every chunk read from `reader` into `pipeline` until end of stream.
///
/// Chunk-level failures are reported through the pipeline's sink and do
/// not stop the loop. A framing error from the codec does: once the stream
/// is out of step with the chunk boundaries nothing after it can be trusted.
///
/// The codec frames with the pipeline's own chunk size limit.
///
/// Returns the number of chunks fed.
#[instrument(skip_all, fields(max_chunk_size = pipeline.max_chunk_size()))]
pub async fn read_channel<R>(reader: R, pipeline: &mut SecureMessageReader) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut framed = FramedRead::new(reader, ChunkCodec::new(pipeline.max_chunk_size()));
    let mut chunks = 0;

    while let Some(result) = framed.next().await {
        match result {
            Ok(chunk) => {
                chunks += 1;
                let outcome = pipeline.feed(chunk);
                debug!(?outcome, chunks, "chunk fed");
            }
            Err(e) => {
                error!(error = %e, chunks, "chunk stream out of sync");
                return Err(e);
            }
        }
    }

    debug!(chunks, "chunk stream closed");
    Ok(chunks)
}
