//! Wire framing: a 2-byte big-endian length prefix around an encoded
//! [`Message`](crate::proto::Message), plus a one-shot dial helper for
//! outbound requests.
//!
//! Framing is done directly against `tokio::io::{AsyncRead, AsyncWrite}`
//! rather than through a length-delimited codec layer, matching how this
//! protocol is dialed and spoken elsewhere in the corpus: one connection,
//! one request, one response.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::proto::Message;

/// Largest payload a single frame may carry (a `u16` length prefix).
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Write `message` to `writer` as a length-prefixed frame.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Message) -> Result<()> {
    let buf = message.encode();
    if buf.len() > MAX_PAYLOAD {
        return Err(Error::Protocol(format!(
            "message of {} bytes exceeds the {}-byte frame limit",
            buf.len(),
            MAX_PAYLOAD
        )));
    }
    writer.write_u16(buf.len() as u16).await?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame from `reader` and decode it.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let len = reader.read_u16().await? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Message::decode(&buf)
}

/// Dial `address`, send `message`, and wait for the single reply.
///
/// Mirrors the original's connect-send-receive-close request shape: every
/// outbound call opens a fresh connection and the stream is dropped as
/// soon as the reply is in hand.
pub async fn request(address: &str, message: &Message) -> Result<Message> {
    let mut stream = TcpStream::connect(address).await?;
    write_message(&mut stream, message).await?;
    read_message(&mut stream).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::KEY_BYTES;
    use crate::node_info::NodeInfo;
    use crate::proto::MessageType;
    use tokio::net::TcpListener;

    fn sample_message() -> Message {
        let sender = NodeInfo::new([9u8; KEY_BYTES], "127.0.0.1:1234");
        Message::new(MessageType::Ping, sender)
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let mut buf = Vec::new();
        let message = sample_message();
        write_message(&mut buf, &message).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_message(&mut cursor).await.unwrap();
        assert_eq!(decoded.kind, message.kind);
        assert_eq!(decoded.sender, message.sender);
    }

    #[tokio::test]
    async fn request_round_trips_over_loopback_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let received = read_message(&mut socket).await.unwrap();
            assert_eq!(received.kind, MessageType::Ping);

            let reply = Message::new(MessageType::Ack, received.sender.clone());
            write_message(&mut socket, &reply).await.unwrap();
        });

        let reply = request(&addr.to_string(), &sample_message()).await.unwrap();
        assert_eq!(reply.kind, MessageType::Ack);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let sender = NodeInfo::new([1u8; KEY_BYTES], "127.0.0.1:1");
        let message = Message::new(MessageType::Store, sender).with_value(vec![0u8; MAX_PAYLOAD + 1]);

        let mut buf = Vec::new();
        let err = write_message(&mut buf, &message).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
