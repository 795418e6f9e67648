//! Transport layer for MCP
//!
//! Messages are newline-delimited JSON. Reads must be cancel-safe: the server
//! races them against outgoing responses.

use crate::error::{McpError, McpResult};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

/// MCP Transport abstraction
#[async_trait]
pub trait Transport: Send {
    /// Read the next message; `None` once the peer has closed the stream.
    ///
    /// A message that cannot be decoded is reported as [`McpError::Parse`]
    /// and the stream stays usable. Any other error is fatal.
    async fn read_request(&mut self) -> McpResult<Option<String>>;

    /// Write one message
    async fn write_response(&mut self, response: &str) -> McpResult<()>;
}

/// Newline-delimited JSON over any async byte stream pair
pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    // survives a cancelled read so no bytes are lost
    pending: Vec<u8>,
    writer: W,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            writer,
        }
    }
}

/// Transport over the process's stdin and stdout
pub fn stdio() -> LineTransport<Stdin, Stdout> {
    LineTransport::new(tokio::io::stdin(), tokio::io::stdout())
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_request(&mut self) -> McpResult<Option<String>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.pending).await?;
            if read == 0 && self.pending.is_empty() {
                return Ok(None);
            }

            let bytes = std::mem::take(&mut self.pending);
            let line = String::from_utf8(bytes)
                .map_err(|e| McpError::Parse(format!("Message is not valid UTF-8: {}", e.utf8_error())))?;
            let line = line.trim();
            // blank lines are keep-alives
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    async fn write_response(&mut self, response: &str) -> McpResult<()> {
        self.writer.write_all(response.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_lines_and_skips_blanks() {
        let input: &[u8] = b"{\"a\":1}\n\n   \n{\"b\":2}\n";
        let mut transport = LineTransport::new(input, Vec::new());

        assert_eq!(transport.read_request().await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(transport.read_request().await.unwrap().as_deref(), Some("{\"b\":2}"));
        assert_eq!(transport.read_request().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_poison_the_stream() {
        let input: &[u8] = b"{\"a\":\"\xff\xfe\"}\n{\"b\":2}\r\n{\"c\":3}";
        let mut transport = LineTransport::new(input, Vec::new());

        assert!(matches!(transport.read_request().await, Err(McpError::Parse(_))));
        assert_eq!(transport.read_request().await.unwrap().as_deref(), Some("{\"b\":2}"));
        assert_eq!(transport.read_request().await.unwrap().as_deref(), Some("{\"c\":3}"));
        assert_eq!(transport.read_request().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writes_one_line_per_message() {
        let input: &[u8] = b"";
        let mut transport = LineTransport::new(input, Vec::new());
        transport.write_response("{\"x\":1}").await.unwrap();
        transport.write_response("{\"y\":2}").await.unwrap();
        assert_eq!(transport.writer, b"{\"x\":1}\n{\"y\":2}\n".to_vec());
    }
}
