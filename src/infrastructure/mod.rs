//! Adapters behind the domain ports: the mobile-money gateway client, the
//! in-memory booking store and the tracing event sink.

pub mod events;
pub mod in_memory;
pub mod momo;
