//! `pageproto`: the chat-side protocol for the pagetrack daemon.
//!
//! [`chat`] classifies inbound chat lines into page requests, admin replies,
//! or noise. [`roster`] holds the set of admins allowed to answer pages.
//! [`feed`] defines the line-based wire format spoken to the game-server chat
//! transport, including channel scopes and the round snapshot.

pub mod chat;
pub mod feed;
pub mod roster;
