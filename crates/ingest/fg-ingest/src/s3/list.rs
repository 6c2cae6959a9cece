//! S3 object listing with pagination support.

use async_stream::try_stream;
use aws_sdk_s3::Client;
use chrono::DateTime;
use fg_error::{FgError, Result};
use futures::Stream;

use crate::FlowLogObject;

/// List objects in an S3 bucket with optional prefix filtering.
///
/// Returns a stream of [`FlowLogObject`] items, consuming the store's
/// continuation-token pagination transparently. Directory markers (keys
/// ending with `/`) are filtered out.
///
/// A failed page yields a fatal [`FgError::Listing`]: an incomplete listing
/// would silently produce a partial traffic profile.
///
/// # Example
///
/// ```ignore
/// use futures::{StreamExt, pin_mut};
///
/// let stream = list_objects(&client, "flow-logs", Some("vpc/"));
/// pin_mut!(stream);
///
/// while let Some(result) = stream.next().await {
///     let obj = result?;
///     println!("Found: {} ({} bytes)", obj.key, obj.size);
/// }
/// ```
pub fn list_objects<'a>(
    client: &'a Client,
    bucket: &str,
    prefix: Option<&str>,
) -> impl Stream<Item = Result<FlowLogObject>> + 'a {
    let bucket = bucket.to_string();
    let prefix = prefix.map(|s| s.to_string());

    try_stream! {
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = client.list_objects_v2().bucket(&bucket);

            if let Some(ref prefix) = prefix {
                req = req.prefix(prefix);
            }

            if let Some(ref token) = continuation_token {
                req = req.continuation_token(token);
            }

            let resp = req.send().await.map_err(|e| FgError::Listing {
                bucket: bucket.clone(),
                reason: e.to_string(),
            })?;

            if let Some(contents) = resp.contents {
                for obj in contents {
                    let key = obj.key.unwrap_or_default();

                    // Skip directory markers and empty keys
                    if key.is_empty() || key.ends_with('/') {
                        continue;
                    }

                    let last_modified = obj
                        .last_modified
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()));

                    yield FlowLogObject {
                        key,
                        size: obj.size.unwrap_or(0) as u64,
                        last_modified,
                    };
                }
            }

            if resp.is_truncated == Some(true) {
                continuation_token = resp.next_continuation_token;
                if continuation_token.is_none() {
                    // No more pages
                    break;
                }
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_flow_log_object_creation() {
        let obj = FlowLogObject {
            key: "vpc/2024/08/flows.log".to_string(),
            size: 1024,
            last_modified: Some(Utc::now()),
        };

        assert_eq!(obj.key, "vpc/2024/08/flows.log");
        assert_eq!(obj.size, 1024);
        assert!(obj.last_modified.is_some());
    }

    #[test]
    fn test_flow_log_object_without_timestamp() {
        let obj = FlowLogObject {
            key: "flows.log".to_string(),
            size: 512,
            last_modified: None,
        };

        assert!(obj.last_modified.is_none());
    }
}
