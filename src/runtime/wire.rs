//! Wire format helpers: update frames and status payloads.
//!
//! Two message shapes cross the runner connection:
//!
//! - **Update payload** (client → runner): the JSON-serialized graph,
//!   prefixed with a 4-byte big-endian unsigned length, written as one
//!   frame.
//! - **Status messages** (runner → client): UTF-8 text, `#`-delimited
//!   decimal node IDs; several IDs may arrive concatenated in one read.
//!
//! Frame *reading* is provided for loopback tests and Rust-side runner
//! implementations; the editor client itself never awaits a reply to an
//! update frame.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::types::NodeId;

/// Delimiter between node IDs in a status message.
pub const STATUS_DELIMITER: char = '#';

/// Encode one length-prefixed update frame:
/// `[4-byte big-endian u32 length][UTF-8 payload]`.
#[must_use]
pub fn encode_frame(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut frame = Vec::with_capacity(4 + bytes.len());
    frame.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    frame.extend_from_slice(bytes);
    frame
}

/// Read one length-prefixed frame from `reader` and return its UTF-8
/// payload.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<String> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    String::from_utf8(payload)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Parse a raw status message into the node IDs it reports.
///
/// Empty tokens are skipped; malformed tokens are logged and discarded
/// without poisoning the rest of the message.
#[must_use]
pub fn parse_status_tokens(raw: &[u8]) -> Vec<NodeId> {
    let text = String::from_utf8_lossy(raw);
    let mut ids = Vec::new();
    for token in text.split(STATUS_DELIMITER) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<u64>() {
            Ok(id) => ids.push(NodeId(id)),
            Err(_) => {
                tracing::warn!(token, "discarding malformed status token");
            }
        }
    }
    ids
}
