//! Playback sources: local recordings and recordings served over HTTP.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;

use futures::TryStreamExt;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::io::StreamReader;
use url::Url;

use crate::error::{Error, Result};

/// A readable recording stream.
pub type SourceReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// Where a recording is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// An `http` or `https` URL.
    Remote(Url),
}

impl Source {
    /// Interpret a user-supplied source string.
    ///
    /// Absolute `http`/`https` URLs are remote, `file` URLs and anything
    /// that is not a URL are local paths. Single-letter schemes are treated
    /// as paths so `c:recording.json` still names a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPath`] for an empty string and
    /// [`Error::UnsupportedScheme`] for URLs with any other scheme.
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(Error::missing_path("recording to play"));
        }

        let Ok(url) = Url::parse(source) else {
            return Ok(Self::Local(PathBuf::from(source)));
        };

        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|()| Error::UnsupportedScheme {
                    scheme: "file".to_string(),
                }),
            scheme if scheme.len() == 1 => Ok(Self::Local(PathBuf::from(source))),
            scheme => Err(Error::UnsupportedScheme {
                scheme: scheme.to_string(),
            }),
        }
    }

    /// Check if the source is fetched over the network.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Open the source for streaming reads.
    ///
    /// Remote bodies are streamed as they arrive rather than buffered whole.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OpenSource`] if a local file cannot be opened,
    /// [`Error::Fetch`] if the request fails and [`Error::HttpStatus`] if
    /// the server answers with a non-success status.
    pub async fn open(&self) -> Result<SourceReader> {
        match self {
            Self::Local(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| Error::OpenSource {
                        path: path.clone(),
                        source,
                    })?;
                tracing::debug!(path = %path.display(), "opened local recording");
                Ok(Box::pin(BufReader::new(file)))
            }
            Self::Remote(url) => {
                let fetch = |source| Error::Fetch {
                    url: url.to_string(),
                    source,
                };
                let response = reqwest::get(url.clone()).await.map_err(fetch)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(Error::HttpStatus {
                        url: url.to_string(),
                        status,
                    });
                }
                tracing::debug!(%url, %status, "fetching remote recording");

                let body = response.bytes_stream().map_err(std::io::Error::other);
                Ok(Box::pin(StreamReader::new(body)))
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}
