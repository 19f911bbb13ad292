//! Protocol limits shared by the parsers and the connection machinery.
//!
//! These caps bound every field a peer controls, so a malformed or hostile
//! stream is rejected before it can grow unbounded state. The values match
//! the wire-format contract of the crate and are not configurable.

use std::time::Duration;

/// Longest accepted request method, in bytes.
pub const MAX_METHOD_SIZE: usize = 20;

/// Longest accepted request URI, in bytes.
pub const MAX_URI_SIZE: usize = 2048;

/// Minor-version digit count at which parsing rejects (accepts 1..=4 digits).
pub const MAX_MINOR_VERSION_SIZE: usize = 5;

/// Most digits accepted for a response status code.
pub const MAX_STATUS_CODE_SIZE: usize = 6;

/// Largest numeric value accepted for a response status code.
pub const MAX_STATUS_CODE: u32 = 10000;

/// Longest accepted response status text, in bytes.
pub const MAX_STATUS_TEXT_SIZE: usize = 100;

/// Most bytes accepted for a header block, terminator included.
pub const MAX_HEADERS_BLOCK_SIZE: usize = 8192;

/// Largest `Content-Length` honored for message framing (4 MiB).
pub const MAX_BODY_SIZE: usize = 1 << 22;

/// Size of the socket read buffer used by server connections and client
/// requests.
pub const READ_BUFFER_SIZE: usize = 8192;

/// Default deadline covering a whole server connection or client request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
