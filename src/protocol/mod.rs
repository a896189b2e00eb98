//! Protocol Module
//!
//! Wire protocol for client-server communication.
//!
//! ## Request Format
//! One inline command per line, tokens separated by spaces:
//! ```text
//! SET greeting hello EX 60\r\n
//! ZADD board 10 alice 20 bob\r\n
//! ```
//! Values cannot contain whitespace in inline form.
//!
//! ## Reply Format (RESP2)
//! ```text
//! +OK\r\n                 simple string
//! -ERR message\r\n        error
//! :42\r\n                 integer
//! $5\r\nhello\r\n         bulk string ($-1 = null)
//! *2\r\n...               array of replies
//! ```

mod command;
mod dispatch;
mod reply;

pub use command::{Command, SetCondition};
pub use dispatch::{execute, Action};
pub use reply::{read_reply, Reply};

/// Maximum request line or reply payload size (16 MB)
pub const MAX_LINE_SIZE: usize = 16 * 1024 * 1024;
