//! Message framing for length-prefixed protocol
//!
//! Handles reading and writing framed messages over streams.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::game::constants::net::MAX_MESSAGE_SIZE;

/// Errors that can occur during message framing
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Message too large: {0} bytes (max {1})")]
    MessageTooLarge(usize, usize),
    #[error("Frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Read a length-prefixed message from a stream
///
/// Format: [4 bytes little-endian length][payload]
pub async fn read_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::ConnectionClosed);
        }
        Err(e) => return Err(FramingError::Io(e)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(len, MAX_MESSAGE_SIZE));
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; len];
    match stream.read_exact(&mut buf).await {
        Ok(_) => Ok(buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FramingError::ConnectionClosed),
        Err(e) => Err(FramingError::Io(e)),
    }
}

/// Read a frame and interpret it as UTF-8 text
pub async fn read_text<R: AsyncRead + Unpin>(stream: &mut R) -> Result<String, FramingError> {
    let bytes = read_message(stream).await?;
    String::from_utf8(bytes).map_err(|_| FramingError::InvalidUtf8)
}

/// Write a length-prefixed message to a stream
///
/// Format: [4 bytes little-endian length][payload]
pub async fn write_message<W: AsyncWrite + Unpin>(
    stream: &mut W,
    data: &[u8],
) -> Result<(), FramingError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(data.len(), MAX_MESSAGE_SIZE));
    }

    let len_bytes = (data.len() as u32).to_le_bytes();
    stream.write_all(&len_bytes).await?;
    stream.write_all(data).await?;
    stream.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_write_then_read() {
        let (mut client, mut server) = duplex(1024);

        write_message(&mut client, b"{\"type\":\"JOIN\"}").await.unwrap();
        write_message(&mut client, b"").await.unwrap();

        assert_eq!(read_message(&mut server).await.unwrap(), b"{\"type\":\"JOIN\"}");
        assert!(read_message(&mut server).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_length_prefix_is_little_endian() {
        let (mut client, mut server) = duplex(64);
        write_message(&mut client, b"abc").await.unwrap();

        let mut raw = [0u8; 7];
        server.read_exact(&mut raw).await.unwrap();
        assert_eq!(&raw[..4], &[3, 0, 0, 0]);
        assert_eq!(&raw[4..], b"abc");
    }

    #[tokio::test]
    async fn test_read_text() {
        let (mut client, mut server) = duplex(64);
        write_message(&mut client, "héllo".as_bytes()).await.unwrap();
        write_message(&mut client, &[0xff, 0xfe]).await.unwrap();

        assert_eq!(read_text(&mut server).await.unwrap(), "héllo");
        assert!(matches!(read_text(&mut server).await, Err(FramingError::InvalidUtf8)));
    }

    #[tokio::test]
    async fn test_rejects_oversized_frames() {
        let (mut client, mut server) = duplex(64);

        let big = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            write_message(&mut client, &big).await,
            Err(FramingError::MessageTooLarge(_, _))
        ));

        let len = (MAX_MESSAGE_SIZE as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();
        assert!(matches!(
            read_message(&mut server).await,
            Err(FramingError::MessageTooLarge(_, _))
        ));
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (client, mut server) = duplex(64);
        drop(client);
        assert!(matches!(
            read_message(&mut server).await,
            Err(FramingError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let (mut client, mut server) = duplex(64);
        client.write_all(&10u32.to_le_bytes()).await.unwrap();
        client.write_all(b"short").await.unwrap();
        drop(client);

        assert!(matches!(
            read_message(&mut server).await,
            Err(FramingError::ConnectionClosed)
        ));
    }
}
