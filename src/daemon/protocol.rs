//! Binary wire protocol between the ccode client and daemon.
//!
//! Every message starts with a little-endian `i32` kind tag so the receiver
//! can dispatch before decoding anything else. Messages that carry a body
//! follow the tag with a little-endian `u32` byte length and a bincode
//! payload. Inside the payload, byte buffers, strings and arrays carry their
//! own length prefixes, so both sides always know how much to read.
//!
//! ```text
//! Close               [tag = 0]
//! CompletionRequest   [tag = 1][len][buffer, filename, line, column]
//! CompletionResponse  [tag = 2][len][partial, [(word, abbr), ...]]
//! ```
//!
//! There is no version field: client and daemon ship in the same binary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single message body (64 MiB).
///
/// A length prefix above this is treated as a malformed frame instead of an
/// allocation request.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Kind tag written in front of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageKind {
    /// Stop the daemon (no body)
    Close = 0,

    /// Completion request from client to daemon
    Completion = 1,

    /// Completion response from daemon to client
    CompletionResponse = 2,
}

impl MessageKind {
    /// The on-wire tag value.
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// Map an on-wire tag back to a kind.
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Self::Close),
            1 => Some(Self::Completion),
            2 => Some(Self::CompletionResponse),
            _ => None,
        }
    }
}

/// Failure to encode or decode a message.
///
/// Any of these ends the current connection; none of them is fatal to the
/// daemon.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("peer closed the connection before sending a message")]
    Disconnected,

    #[error("stream ended before the declared message length was read")]
    Truncated,

    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("malformed message body: {0}")]
    Malformed(#[from] bincode::Error),

    #[error("unknown message kind {0}")]
    UnknownKind(i32),

    #[error("expected a {expected:?} message, got {found:?}")]
    UnexpectedKind { expected: MessageKind, found: MessageKind },
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(err)
        }
    }
}

/// Completion request from client to daemon.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Current contents of the edited buffer (not necessarily saved, not
    /// necessarily UTF-8)
    pub buffer: Vec<u8>,

    /// Absolute path of the file being edited
    pub filename: String,

    /// Cursor line (1-based)
    pub line: i32,

    /// Cursor column (1-based, 1 = before the first character)
    pub column: i32,
}

/// One completion suggestion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Text to insert
    pub word: String,

    /// Display string: result type padded to a shared column, then the signature
    pub abbr: String,
}

/// Completion response from daemon to client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionResponse {
    /// Byte length of the partial identifier the client should replace (0 if none)
    pub partial: i32,

    /// Ranked proposals
    pub proposals: Vec<Proposal>,
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Close,
    Completion(CompletionRequest),
}

/// Write a kind tag.
pub async fn write_kind<W>(writer: &mut W, kind: MessageKind) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_i32_le(kind.tag()).await?;
    Ok(())
}

/// Read a kind tag.
///
/// A peer that hangs up before the first byte yields
/// [`ProtocolError::Disconnected`]; one that hangs up mid-tag yields
/// [`ProtocolError::Truncated`].
pub async fn read_kind<R>(reader: &mut R) -> Result<MessageKind, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut tag = [0u8; 4];
    let first = reader.read(&mut tag).await?;
    if first == 0 {
        return Err(ProtocolError::Disconnected);
    }
    reader.read_exact(&mut tag[first..]).await?;

    let tag = i32::from_le_bytes(tag);
    MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownKind(tag))
}

async fn write_body<W, T>(writer: &mut W, body: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(body)?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|_| payload.len() <= MAX_FRAME_LEN)
        .ok_or(ProtocolError::FrameTooLarge { len: payload.len(), max: MAX_FRAME_LEN })?;

    writer.write_u32_le(len).await?;
    writer.write_all(&payload).await?;
    Ok(())
}

async fn read_body<R, T>(reader: &mut R) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = reader.read_u32_le().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge { len, max: MAX_FRAME_LEN });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(bincode::deserialize(&payload)?)
}

/// Send a `Close` message.
pub async fn send_close<W>(writer: &mut W) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_kind(writer, MessageKind::Close).await?;
    writer.flush().await?;
    Ok(())
}

/// Send a completion request (tag + body).
pub async fn send_completion_request<W>(
    writer: &mut W,
    request: &CompletionRequest,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_kind(writer, MessageKind::Completion).await?;
    write_body(writer, request).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one client request, dispatching on its kind tag.
pub async fn read_request<R>(reader: &mut R) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match read_kind(reader).await? {
        MessageKind::Close => Ok(Request::Close),
        MessageKind::Completion => Ok(Request::Completion(read_body(reader).await?)),
        found @ MessageKind::CompletionResponse => {
            Err(ProtocolError::UnexpectedKind { expected: MessageKind::Completion, found })
        }
    }
}

/// Send a completion response (tag + body).
pub async fn send_completion_response<W>(
    writer: &mut W,
    response: &CompletionResponse,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_kind(writer, MessageKind::CompletionResponse).await?;
    write_body(writer, response).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a completion response; any other kind is a protocol error.
pub async fn read_completion_response<R>(reader: &mut R) -> Result<CompletionResponse, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match read_kind(reader).await? {
        MessageKind::CompletionResponse => read_body(reader).await,
        found => Err(ProtocolError::UnexpectedKind {
            expected: MessageKind::CompletionResponse,
            found,
        }),
    }
}
