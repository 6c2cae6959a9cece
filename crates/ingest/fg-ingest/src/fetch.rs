//! Chunked object retrieval.
//!
//! Streams one object's body as a lazy sequence of byte chunks. Chunk size
//! is whatever the transport delivers - a performance detail, never a
//! semantic one. Downstream stages must produce the same result for any
//! chunking of the same bytes.

use async_stream::try_stream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use fg_error::{FgError, Result};
use futures::Stream;
use tracing::debug;

/// Fetch one object's body as a stream of byte chunks.
///
/// The concatenation of all yielded chunks equals the object's full body,
/// in order. A failed GET or an interrupted read yields [`FgError::Fetch`];
/// chunks already yielded are not rolled back - the caller decides whether
/// to abandon the object (the default policy) or keep partial data.
pub fn fetch_chunks<'a>(
    client: &'a Client,
    bucket: &str,
    key: &str,
) -> impl Stream<Item = Result<Bytes>> + 'a {
    let bucket = bucket.to_string();
    let key = key.to_string();

    try_stream! {
        let resp = client
            .get_object()
            .bucket(&bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| FgError::fetch(&key, e))?;

        let mut body = resp.body;
        let mut bytes_read = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| FgError::fetch(&key, e))?
        {
            bytes_read += chunk.len() as u64;
            yield chunk;
        }

        debug!(key = %key, bytes = bytes_read, "Fetched object body");
    }
}
