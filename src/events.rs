//! The event surface exposed to external collaborators (spec.md §6, §9
//! "Event fan-out").
//!
//! A single `Clone` enum carried over a `tokio::sync::broadcast` channel,
//! rather than per-kind callback registration, matching spec.md §9's
//! "concurrent list of subscriber channels ... not language-specific
//! events" note and the teacher's general preference for plain data types
//! over trait-object callback registries.

use crate::name::Name;
use crate::types::Message;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum Event {
    /// A NIC poll found new usable addresses (spec.md §4.3); `added` names
    /// them by presentation string since `NicAddr` is transport-internal.
    NetworkInterfaceDiscovered { added: Vec<String> },

    /// An inbound query (spec.md §4.5 dispatch).
    QueryReceived {
        message: Arc<Message>,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
    },

    /// An inbound answer (spec.md §4.5 dispatch).
    AnswerReceived {
        message: Arc<Message>,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
    },

    /// A datagram failed to parse (spec.md §7); the offending bytes are
    /// carried for observability, then discarded.
    MalformedMessage { bytes: Vec<u8> },

    /// A PTR for `_services._dns-sd._udp.local` was observed (spec.md
    /// §4.7 answer handler).
    ServiceDiscovered { name: Name },

    /// A non-enumeration PTR with TTL>0 was observed under `.local`
    /// (spec.md §4.7).
    ServiceInstanceDiscovered { name: Name, message: Arc<Message> },

    /// A non-enumeration PTR with TTL==0 (goodbye) was observed (spec.md
    /// §4.7, §8 "Goodbye semantics").
    ServiceInstanceShutdown { name: Name, message: Arc<Message> },
}
