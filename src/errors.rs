//! Error taxonomy for the mDNS/DNS-SD stack.
//!
//! Transport and OS errors are swallowed and logged where spec.md §7
//! requires it (see `transport.rs`); only the kinds below ever reach a
//! caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A received datagram could not be parsed as a DNS message. Always
    /// surfaced as an `Event::MalformedMessage`, never propagated.
    #[error("malformed DNS message: {0}")]
    MalformedMessage(String),

    /// The caller tried to send a message whose encoded length exceeds
    /// the service's `max_packet`.
    #[error("encoded packet of {len} bytes exceeds max_packet of {max} bytes")]
    PacketTooLarge { len: usize, max: usize },

    /// A send was attempted before `MulticastService::start()` completed,
    /// or after `stop()`.
    #[error("multicast service has not been started")]
    NotStarted,

    /// `start()` found neither IPv4 nor IPv6 multicast usable.
    #[error("no usable IPv4 or IPv6 multicast transport available")]
    StartupError,

    /// `resolve_async` was cancelled before a matching answer arrived.
    #[error("resolve cancelled")]
    Cancelled,

    /// Opaque I/O failure, e.g. from socket setup. Per-socket operational
    /// errors (a single interface's send/recv failing) are logged and
    /// swallowed in `transport.rs` rather than returned as this variant;
    /// this variant is for failures a caller must see (e.g. bind errors
    /// surfaced by `start()`).
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
