//! One-shot TCP transport to the miner API.
//!
//! The CGMiner API has no framing: connect, send the command bytes with no
//! terminator, half-close the write side, then read until the miner closes
//! the connection. Equivalent to
//! `echo -n "cmd" | socat stdio tcp:host:port,shut-none`.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::PollError;

/// Query a miner with a single command, returning the full reply as text.
///
/// The timeout covers the whole exchange (connect, write, and read to EOF).
/// Invalid byte sequences in the reply are replaced, never fatal. The
/// socket is closed on every exit path.
pub async fn query_miner(
    host: &str,
    port: u16,
    cmd: &str,
    timeout: Duration,
) -> Result<String, PollError> {
    match tokio::time::timeout(timeout, exchange(host, port, cmd)).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(err)) => Err(classify_io(host, port, err, timeout)),
        Err(_) => Err(PollError::Timeout {
            host: host.to_string(),
            port,
            timeout,
        }),
    }
}

async fn exchange(host: &str, port: u16, cmd: &str) -> io::Result<String> {
    let mut stream = TcpStream::connect((host, port)).await?;
    stream.write_all(cmd.as_bytes()).await?;
    // Half-close: signal end-of-command while keeping the read side open.
    stream.shutdown().await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;
    Ok(String::from_utf8_lossy(&reply).into_owned())
}

fn classify_io(host: &str, port: u16, err: io::Error, timeout: Duration) -> PollError {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => PollError::ConnectionRefused {
            host: host.to_string(),
            port,
        },
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => PollError::Timeout {
            host: host.to_string(),
            port,
            timeout,
        },
        _ => PollError::Network {
            host: host.to_string(),
            port,
            source: err,
        },
    }
}
