// Remote object URIs
// Bucket roots and archive targets for gs:// and s3:// storage

use percent_encoding::percent_decode_str;
use std::fmt;
use url::Url;

use crate::errors::SweepError;

/// Location in remote object storage (`gs://bucket/key` or `s3://bucket/key`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUri {
    pub scheme: String,
    pub bucket: String,
    /// Object key or prefix, without leading or trailing '/'
    pub key: String,
}

impl RemoteUri {
    /// Parse a bucket root or object URI. The key may be empty (bucket root).
    pub fn parse(uri: &str) -> Result<Self, SweepError> {
        let url = Url::parse(uri)
            .map_err(|e| SweepError::Config(format!("Invalid remote URI '{}': {}", uri, e)))?;

        match url.scheme() {
            "gs" | "s3" => {}
            scheme => {
                return Err(SweepError::Config(format!(
                    "Unsupported remote URI scheme '{}' in '{}' (expected gs:// or s3://)",
                    scheme, uri
                )))
            }
        }

        let bucket = url
            .host_str()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| SweepError::Config(format!("Remote URI missing bucket: {}", uri)))?
            .to_string();

        // Url keeps the path percent-encoded; object keys are stored as typed
        let key = percent_decode_str(url.path())
            .decode_utf8()
            .map_err(|e| SweepError::Config(format!("Remote URI key is not UTF-8 in '{}': {}", uri, e)))?
            .trim_matches('/')
            .to_string();

        Ok(Self {
            scheme: url.scheme().to_string(),
            bucket,
            key,
        })
    }

    /// Append an object name below this prefix
    pub fn join(&self, name: &str) -> Self {
        let name = name.trim_start_matches('/');
        let key = if self.key.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.key, name)
        };
        Self {
            scheme: self.scheme.clone(),
            bucket: self.bucket.clone(),
            key,
        }
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}://{}", self.scheme, self.bucket)
        } else {
            write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
        }
    }
}
