//! Command definitions
//!
//! Parses one inline request line into a typed command.

use std::time::Duration;

use bytes::Bytes;

use crate::error::{Result, StoreError};

/// Write precondition for SET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetCondition {
    /// Always write
    #[default]
    Always,

    /// NX: only if the key does not exist
    IfAbsent,

    /// XX: only if the key exists
    IfPresent,
}

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // -------------------------------------------------------------------------
    // Connection
    // -------------------------------------------------------------------------
    Ping,
    Quit,
    Shutdown { save: bool },

    // -------------------------------------------------------------------------
    // Scalars
    // -------------------------------------------------------------------------
    Get {
        key: String,
    },
    GetBit {
        key: String,
        offset: u64,
    },
    Set {
        key: String,
        value: Bytes,
        condition: SetCondition,
        ttl: Option<Duration>,
    },
    SetBit {
        key: String,
        offset: u64,
        bit: u8,
    },
    Del {
        key: String,
    },

    // -------------------------------------------------------------------------
    // Sorted sets
    // -------------------------------------------------------------------------
    ZAdd {
        key: String,
        members: Vec<(String, i64)>,
    },
    ZCard {
        key: String,
    },
    ZCount {
        key: String,
        min: i64,
        max: i64,
    },
    ZRange {
        key: String,
        start: i64,
        stop: i64,
        with_scores: bool,
    },

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------
    Save,
    Load,
}

impl Command {
    /// Parse an inline command line (without the trailing newline)
    ///
    /// Tokens are separated by ASCII whitespace; the command name and
    /// option keywords are case-insensitive.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        let (name, args) = match tokens.split_first() {
            Some((name, args)) => (name.to_ascii_uppercase(), args),
            None => return Err(protocol_error("empty command")),
        };

        match name.as_str() {
            "PING" => {
                expect_arity(&name, args, 0)?;
                Ok(Command::Ping)
            }
            "QUIT" | "EXIT" => Ok(Command::Quit),
            "SHUTDOWN" => match args {
                [] => Ok(Command::Shutdown { save: true }),
                [opt] if opt.eq_ignore_ascii_case("NOSAVE") => Ok(Command::Shutdown { save: false }),
                [opt] if opt.eq_ignore_ascii_case("SAVE") => Ok(Command::Shutdown { save: true }),
                _ => Err(protocol_error("syntax error in SHUTDOWN")),
            },
            "GET" => {
                expect_arity(&name, args, 1)?;
                Ok(Command::Get {
                    key: args[0].to_string(),
                })
            }
            "GETBIT" => {
                expect_arity(&name, args, 2)?;
                Ok(Command::GetBit {
                    key: args[0].to_string(),
                    offset: parse_number(args[1], "bit offset")?,
                })
            }
            "SET" => parse_set(args),
            "SETBIT" => {
                expect_arity(&name, args, 3)?;
                Ok(Command::SetBit {
                    key: args[0].to_string(),
                    offset: parse_number(args[1], "bit offset")?,
                    bit: parse_number(args[2], "bit")?,
                })
            }
            "DEL" => {
                expect_arity(&name, args, 1)?;
                Ok(Command::Del {
                    key: args[0].to_string(),
                })
            }
            "ZADD" => parse_zadd(args),
            "ZCARD" => {
                expect_arity(&name, args, 1)?;
                Ok(Command::ZCard {
                    key: args[0].to_string(),
                })
            }
            "ZCOUNT" => {
                expect_arity(&name, args, 3)?;
                Ok(Command::ZCount {
                    key: args[0].to_string(),
                    min: parse_number(args[1], "min")?,
                    max: parse_number(args[2], "max")?,
                })
            }
            "ZRANGE" => {
                let with_scores = match args.len() {
                    3 => false,
                    4 if args[3].eq_ignore_ascii_case("WITHSCORES") => true,
                    4 => return Err(protocol_error("syntax error in ZRANGE")),
                    _ => return Err(arity_error(&name)),
                };
                Ok(Command::ZRange {
                    key: args[0].to_string(),
                    start: parse_number(args[1], "start")?,
                    stop: parse_number(args[2], "stop")?,
                    with_scores,
                })
            }
            "SAVE" => {
                expect_arity(&name, args, 0)?;
                Ok(Command::Save)
            }
            "LOAD" => {
                expect_arity(&name, args, 0)?;
                Ok(Command::Load)
            }
            _ => Err(protocol_error(&format!("unknown command '{}'", tokens[0]))),
        }
    }

    /// Upper-case command name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Quit => "QUIT",
            Command::Shutdown { .. } => "SHUTDOWN",
            Command::Get { .. } => "GET",
            Command::GetBit { .. } => "GETBIT",
            Command::Set { .. } => "SET",
            Command::SetBit { .. } => "SETBIT",
            Command::Del { .. } => "DEL",
            Command::ZAdd { .. } => "ZADD",
            Command::ZCard { .. } => "ZCARD",
            Command::ZCount { .. } => "ZCOUNT",
            Command::ZRange { .. } => "ZRANGE",
            Command::Save => "SAVE",
            Command::Load => "LOAD",
        }
    }
}

/// `SET key value [NX|XX] [EX seconds|PX milliseconds]`
fn parse_set(args: &[&str]) -> Result<Command> {
    if args.len() < 2 {
        return Err(arity_error("SET"));
    }

    let mut condition = SetCondition::Always;
    let mut ttl = None;
    let mut ttl_seen = false;

    let mut options = args[2..].iter();
    while let Some(option) = options.next() {
        let option = option.to_ascii_uppercase();
        match option.as_str() {
            "NX" | "XX" => {
                if condition != SetCondition::Always {
                    return Err(protocol_error("NX and XX are mutually exclusive"));
                }
                condition = if option == "NX" {
                    SetCondition::IfAbsent
                } else {
                    SetCondition::IfPresent
                };
            }
            "EX" | "PX" => {
                if ttl_seen {
                    return Err(protocol_error("EX and PX are mutually exclusive"));
                }
                ttl_seen = true;
                let amount = options
                    .next()
                    .ok_or_else(|| protocol_error("syntax error in SET"))?;
                let amount: i64 = parse_number(amount, "expire time")?;
                ttl = ttl_from(amount, option == "EX");
            }
            _ => return Err(protocol_error("syntax error in SET")),
        }
    }

    Ok(Command::Set {
        key: args[0].to_string(),
        value: Bytes::copy_from_slice(args[1].as_bytes()),
        condition,
        ttl,
    })
}

/// `ZADD key score member [score member ...]`
fn parse_zadd(args: &[&str]) -> Result<Command> {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(arity_error("ZADD"));
    }

    let members = args[1..]
        .chunks_exact(2)
        .map(|pair| -> Result<(String, i64)> {
            Ok((pair[1].to_string(), parse_number(pair[0], "score")?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Command::ZAdd {
        key: args[0].to_string(),
        members,
    })
}

/// Non-positive amounts mean no expiration
fn ttl_from(amount: i64, seconds: bool) -> Option<Duration> {
    if amount <= 0 {
        return None;
    }
    let amount = amount as u64;
    Some(if seconds {
        Duration::from_secs(amount)
    } else {
        Duration::from_millis(amount)
    })
}

fn parse_number<T: std::str::FromStr>(token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| protocol_error(&format!("{} is not a valid integer: '{}'", what, token)))
}

fn expect_arity(name: &str, args: &[&str], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(arity_error(name))
    }
}

fn arity_error(name: &str) -> StoreError {
    protocol_error(&format!(
        "wrong number of arguments for '{}' command",
        name.to_ascii_lowercase()
    ))
}

fn protocol_error(message: &str) -> StoreError {
    StoreError::Protocol(message.to_string())
}
