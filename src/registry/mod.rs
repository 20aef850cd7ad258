// SPDX-License-Identifier: MIT
//! Thread-safe in-memory indices.
//!
//! Each registry owns one lock; reads return snapshots so callers iterate
//! without holding anything, and locks are never held across I/O. The
//! hot-reload loop replaces the chain and user registries wholesale; the
//! rest grow for the process lifetime.

pub mod bots;
pub mod chains;
pub mod pauses;
pub mod users;
pub mod val_addrs;

pub use bots::{BotRegistry, RegisteredBot};
pub use chains::{ChainRegistry, RegisteredChain, ValidatorEntry};
pub use pauses::PauseRegistry;
pub use users::UserRegistry;
pub use val_addrs::ValidatorAddressRegistry;
