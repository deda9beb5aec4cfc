//! Source locations and fetching.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;

use bytes::Bytes;
use tracing::{debug, info, instrument};
use url::Url;

use player_ipc::{StatusCategory, StatusSink};

use crate::error::DemuxError;
use crate::DemuxResult;

const MIB: f64 = 1024.0 * 1024.0;

/// Where the media comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A local file.
    File(PathBuf),

    /// An HTTP(S) resource.
    Http(Url),
}

impl MediaSource {
    /// Parse a source location.
    ///
    /// Accepts `http(s)://` and `file://` URLs. Anything that does not
    /// parse as an absolute URL, or carries a drive-letter "scheme", is
    /// taken as a local path.
    pub fn parse(uri: &str) -> DemuxResult<Self> {
        match Url::parse(uri) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::File)
                    .map_err(|()| DemuxError::InvalidUri(uri.to_string())),
                scheme if scheme.len() == 1 => Ok(Self::File(PathBuf::from(uri))),
                scheme => Err(DemuxError::UnsupportedSource(scheme.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::File(PathBuf::from(uri))),
            Err(e) => Err(DemuxError::InvalidUri(format!("{uri}: {e}"))),
        }
    }

    /// Open the source for reading.
    fn open(&self) -> DemuxResult<Box<dyn Read + Send>> {
        match self {
            Self::File(path) => {
                let file = File::open(path)?;
                Ok(Box::new(file))
            }
            Self::Http(url) => {
                let response = ureq::get(url.as_str()).call()?;
                debug!(status = %response.status(), "HTTP response");
                Ok(Box::new(response.into_body().into_reader()))
            }
        }
    }
}

/// Accumulates fetched bytes and reports progress.
pub struct FetchSink<'a> {
    buffer: Vec<u8>,
    status: &'a dyn StatusSink,
}

impl<'a> FetchSink<'a> {
    /// Create an empty sink reporting to `status`.
    pub fn new(status: &'a dyn StatusSink) -> Self {
        Self {
            buffer: Vec::new(),
            status,
        }
    }

    /// Append a chunk and report the running total in MiB.
    pub fn write(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        self.status.report(
            StatusCategory::Fetch,
            format!("{:.1} MiB", self.buffer.len() as f64 / MIB),
        );
    }

    /// Bytes received so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Finish the fetch and hand over the bytes.
    pub fn close(self) -> Bytes {
        self.status.report(StatusCategory::Fetch, "Done".to_string());
        Bytes::from(self.buffer)
    }
}

/// Fetch the whole source, reporting progress after every read.
#[instrument(name = "fetch", skip(status))]
pub fn fetch(source: &MediaSource, chunk_size: usize, status: &dyn StatusSink) -> DemuxResult<Bytes> {
    let mut reader = source.open()?;
    let mut sink = FetchSink::new(status);
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => sink.write(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    info!(bytes = sink.len(), "Fetch complete");
    Ok(sink.close())
}
