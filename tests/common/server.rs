//! Test server.
//!
//! A local listener that accepts one client and exchanges raw lines with it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

pub struct TestServer {
    listener: TcpListener,
}

impl TestServer {
    /// Bind to an ephemeral port on localhost.
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the next client.
    pub async fn accept(&self) -> anyhow::Result<TestPeer> {
        let (stream, _) = timeout(Duration::from_secs(5), self.listener.accept()).await??;
        Ok(TestPeer::new(stream))
    }
}

/// The server side of one accepted connection.
pub struct TestPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestPeer {
    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Send one line, CRLF appended.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the client without its terminator, `None` on EOF.
    pub async fn recv(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await??;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }

    /// Read lines until one starts with `prefix`.
    pub async fn recv_until(&mut self, prefix: &str) -> anyhow::Result<String> {
        loop {
            match self.recv().await? {
                Some(line) if line.starts_with(prefix) => return Ok(line),
                Some(_) => continue,
                None => anyhow::bail!("connection closed before {prefix:?}"),
            }
        }
    }

    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
