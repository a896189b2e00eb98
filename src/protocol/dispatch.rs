//! Command execution
//!
//! Maps each command to one store call and shapes the reply.

use crate::error::StoreError;
use crate::store::Store;

use super::{Command, Reply, SetCondition};

/// What the connection should do after sending the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep reading commands
    Continue,

    /// Close this connection
    Close,

    /// Close this connection and stop the server
    Shutdown { save: bool },
}

/// Execute `command` against `store`
pub fn execute(store: &Store, command: Command) -> (Reply, Action) {
    let reply = match command {
        Command::Ping => Reply::Simple("PONG".to_string()),
        Command::Quit => return (Reply::ok(), Action::Close),
        Command::Shutdown { save } => return (Reply::ok(), Action::Shutdown { save }),

        Command::Get { key } => match store.get(&key) {
            Ok(value) => Reply::bulk(value),
            Err(StoreError::NotFound) => Reply::null(),
            Err(e) => Reply::error(e),
        },
        Command::GetBit { key, offset } => match store.get_bit(&key, offset) {
            Ok(bit) => Reply::Integer(i64::from(bit)),
            Err(StoreError::NotFound) => Reply::Integer(0),
            Err(e) => Reply::error(e),
        },
        Command::Set {
            key,
            value,
            condition,
            ttl,
        } => {
            let result = match condition {
                SetCondition::Always => store.set(&key, value, ttl),
                SetCondition::IfAbsent => store.set_nx(&key, value, ttl),
                SetCondition::IfPresent => store.set_xx(&key, value, ttl),
            };
            match result {
                Ok(()) => Reply::ok(),
                Err(StoreError::AlreadyExists) | Err(StoreError::NotFound) => Reply::null(),
                Err(e) => Reply::error(e),
            }
        }
        Command::SetBit { key, offset, bit } => match store.set_bit(&key, offset, bit, None) {
            Ok(previous) => Reply::Integer(i64::from(previous)),
            Err(e) => Reply::error(e),
        },
        Command::Del { key } => Reply::Integer(i64::from(store.delete(&key).is_some())),

        Command::ZAdd { key, members } => match store.zadd(&key, members) {
            Ok(added) => Reply::count(added),
            Err(e) => Reply::error(e),
        },
        Command::ZCard { key } => count_or_zero(store.zcard(&key)),
        Command::ZCount { key, min, max } => count_or_zero(store.zcount(&key, min, max)),
        Command::ZRange {
            key,
            start,
            stop,
            with_scores,
        } => match store.zrange(&key, start, stop) {
            Ok(members) => {
                let mut items = Vec::with_capacity(members.len() * if with_scores { 2 } else { 1 });
                for (member, score) in members {
                    items.push(Reply::bulk(member));
                    if with_scores {
                        items.push(Reply::bulk(score.to_string()));
                    }
                }
                Reply::Array(items)
            }
            Err(StoreError::NotFound) => Reply::Array(Vec::new()),
            Err(e) => Reply::error(e),
        },

        Command::Save => match store.save_snapshot() {
            Ok(_) => Reply::ok(),
            Err(e) => Reply::error(e),
        },
        Command::Load => match store.load_snapshot() {
            Ok(_) => Reply::ok(),
            Err(e) => Reply::error(e),
        },
    };

    (reply, Action::Continue)
}

fn count_or_zero(result: crate::error::Result<usize>) -> Reply {
    match result {
        Ok(n) => Reply::count(n),
        Err(StoreError::NotFound) => Reply::Integer(0),
        Err(e) => Reply::error(e),
    }
}
