use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter, Error, ErrorKind, Result};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::{Command, Response};

/// Longest command line accepted, CRLF included. A client sending more is
/// dropped since the rest of its line can't be told apart from new commands.
const MAX_LINE_SIZE: usize = 4096;

#[derive(Debug)]
pub(crate) struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    buffer: Vec<u8>,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream) -> Connection {
        let (reader, writer) = stream.into_split();
        Connection {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            buffer: Vec::with_capacity(256),
        }
    }

    /// Reads the next command, `None` once the peer has closed the stream.
    ///
    /// A malformed command is an `InvalidData` error; the connection can keep
    /// going after it. Any other error is fatal.
    pub(crate) async fn read_command(&mut self) -> Result<Option<Command>> {
        read_command(&mut self.reader, &mut self.buffer).await
    }

    pub(crate) async fn write_response(&mut self, response: &Response) -> Result<()> {
        self.writer.write_all(&response.to_line()?).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

async fn read_command<R: AsyncBufRead + Unpin>(r: &mut R, buf: &mut Vec<u8>) -> Result<Option<Command>> {
    buf.clear();
    let len = (&mut *r).take(MAX_LINE_SIZE as u64).read_until(b'\n', buf).await?;
    if len == 0 {
        return Ok(None);
    }
    if buf[len - 1] != b'\n' {
        if len == MAX_LINE_SIZE {
            return Err(Error::other("command line too long"));
        }
        return Err(Error::new(ErrorKind::InvalidData, "command not terminated with CRLF"));
    }
    if len < 2 || buf[len - 2] != b'\r' {
        return Err(Error::new(ErrorKind::InvalidData, "command not terminated with CRLF"));
    }
    Command::parse(&buf[..len - 2]).map(Some)
}
