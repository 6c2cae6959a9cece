//! Input locator parsing.
//!
//! The analyzer accepts an ARN-like locator (`arn:aws:s3:::bucket/prefix`)
//! or an `s3://bucket/prefix` URI, and decomposes it into a bucket name and
//! an optional key prefix. Parsing happens before any I/O; a malformed
//! locator aborts the run.

use fg_error::{FgError, Result};

/// A parsed bucket locator: bucket name plus optional key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLocator {
    bucket: String,
    prefix: Option<String>,
}

impl BucketLocator {
    /// Parse a locator string into bucket and prefix.
    ///
    /// Accepted forms:
    /// - ARN: `arn:aws:s3:::my-bucket/some/prefix/`
    /// - URI: `s3://my-bucket/some/prefix/`
    ///
    /// The prefix is optional in both forms.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            return Err(invalid(input, "empty locator"));
        }

        let resource = if let Some(rest) = input.strip_prefix("s3://") {
            rest
        } else if input.starts_with("arn:") {
            // ARN fields are colon-separated; the resource is everything
            // after the fifth colon (resource paths may themselves contain
            // colons, so limit the split).
            let mut fields = input.splitn(6, ':');
            let resource = fields.nth(5).unwrap_or("");
            if resource.is_empty() {
                return Err(invalid(input, "missing bucket in ARN resource field"));
            }
            resource
        } else {
            return Err(invalid(
                input,
                "expected an ARN (arn:aws:s3:::bucket/prefix) or an s3:// URI",
            ));
        };

        let (bucket, prefix) = match resource.split_once('/') {
            Some((bucket, rest)) => {
                let prefix = rest.trim();
                let prefix = if prefix.is_empty() {
                    None
                } else {
                    Some(prefix.to_string())
                };
                (bucket, prefix)
            }
            None => (resource, None),
        };

        if bucket.is_empty() {
            return Err(invalid(input, "empty bucket name"));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// The bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The key prefix, if one was given.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

impl std::fmt::Display for BucketLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "s3://{}/{}", self.bucket, prefix),
            None => write!(f, "s3://{}", self.bucket),
        }
    }
}

fn invalid(locator: &str, reason: &str) -> FgError {
    FgError::Locator {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}
