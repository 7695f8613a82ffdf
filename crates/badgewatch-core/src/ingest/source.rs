// ── Scanner sources ──
//
// The radio itself lives in an external scanning service. A `ScanSource`
// is our side of that boundary: something that can be started, yields
// already-parsed frames, and must be stopped to release the scanner.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

use super::Frame;
use super::wire::WireFrame;
use crate::error::CoreError;

/// A stream of frames backed by an external scanning resource.
///
/// `stop` must release that resource and be safe to call more than once.
pub trait ScanSource: Send {
    /// Human-readable name for logs and errors.
    fn name(&self) -> &str;

    fn start(&mut self) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Next frame, or `None` once the scanner has nothing more to say.
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>, CoreError>> + Send;

    fn stop(&mut self) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Running count of input the source skipped because it did not parse.
    fn malformed_lines(&self) -> u64 {
        0
    }
}

/// Where a [`LineSource`] reads newline-delimited JSON frames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Stdin,
    File(PathBuf),
    /// `host:port` of a scanning service that streams frames over TCP.
    Tcp(String),
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("stdin"),
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}

type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// Reads JSON-lines frames (see [`WireFrame`]) from stdin, a file, or TCP.
///
/// Blank lines are skipped. Lines that do not parse are logged and
/// skipped; read errors end the source with [`CoreError::Scanner`].
pub struct LineSource {
    name: String,
    spec: Option<SourceSpec>,
    reader: Option<BoxedReader>,
    line: String,
    line_no: u64,
    malformed: u64,
}

impl LineSource {
    pub fn new(spec: SourceSpec) -> Self {
        Self {
            name: spec.to_string(),
            spec: Some(spec),
            reader: None,
            line: String::new(),
            line_no: 0,
            malformed: 0,
        }
    }

    /// Wrap an already-open reader. `start` is then a no-op.
    pub fn from_reader<R>(name: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            name: name.into(),
            spec: None,
            reader: Some(Box::new(BufReader::new(reader))),
            line: String::new(),
            line_no: 0,
            malformed: 0,
        }
    }
}

impl ScanSource for LineSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<(), CoreError> {
        if self.reader.is_some() {
            return Ok(());
        }
        let Some(spec) = self.spec.clone() else {
            return Err(CoreError::ScannerNotStarted {
                source_name: self.name.clone(),
            });
        };
        self.reader = Some(open(&self.name, &spec).await?);
        debug!(source = %self.name, "line source opened");
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, CoreError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(CoreError::ScannerNotStarted {
                source_name: self.name.clone(),
            });
        };

        loop {
            self.line.clear();
            let n = reader
                .read_line(&mut self.line)
                .await
                .map_err(|e| CoreError::scanner(&self.name, e))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }

            match WireFrame::parse(text) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => {
                    self.malformed += 1;
                    warn!(source = %self.name, line = self.line_no, error = %e, "skipping malformed frame");
                }
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CoreError> {
        if self.reader.take().is_some() {
            debug!(source = %self.name, lines = self.line_no, "line source closed");
        }
        Ok(())
    }

    fn malformed_lines(&self) -> u64 {
        self.malformed
    }
}

async fn open(name: &str, spec: &SourceSpec) -> Result<BoxedReader, CoreError> {
    let reader: BoxedReader = match spec {
        SourceSpec::Stdin => Box::new(BufReader::new(tokio::io::stdin())),
        SourceSpec::File(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| CoreError::scanner(name, e))?;
            Box::new(BufReader::new(file))
        }
        SourceSpec::Tcp(addr) => {
            let stream = tokio::net::TcpStream::connect(addr.as_str())
                .await
                .map_err(|e| CoreError::scanner(name, e))?;
            Box::new(BufReader::new(stream))
        }
    };
    Ok(reader)
}
