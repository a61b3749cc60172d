//! Tunables recognized by `MulticastService`/`ServiceDiscovery`.

use std::time::Duration;

/// Process-wide default TTLs, per RFC 6762 §10. These are construction-time
/// constants, not mutable singletons (spec.md §9).
pub const SHARED_RECORD_TTL: Duration = Duration::from_secs(75 * 60);
pub const HOST_RECORD_TTL: Duration = Duration::from_secs(120);

/// Fixed mDNS port and group addresses (spec.md §4.4).
pub const MDNS_PORT: u16 = 5353;
pub const MDNS_GROUP_V4: std::net::Ipv4Addr = std::net::Ipv4Addr::new(224, 0, 0, 251);
pub const MDNS_GROUP_V6: std::net::Ipv6Addr =
    std::net::Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x00fb);

/// IP+UDP overhead subtracted from the jumbo datagram limit to derive
/// `max_packet` (spec.md §4.4).
pub const IP_UDP_OVERHEAD: usize = 48;
pub const MAX_DATAGRAM: usize = 9000;
pub const MIN_MAX_PACKET: usize = 512;

/// Sliding window for `RecentMessages` duplicate suppression (spec.md §3).
pub const RECENT_MESSAGE_WINDOW: Duration = Duration::from_secs(1);

/// Configuration accepted by `MulticastService::new` / `ServiceDiscovery::new`.
///
/// Mirrors spec.md §6's configuration table.
#[derive(Clone, Debug)]
pub struct Config {
    /// How often the NIC monitor polls for interface changes.
    pub discovery_interval: Duration,

    /// Whether sender sockets enable multicast loopback.
    pub multicast_loopback: bool,

    /// Enable the IPv4 transport.
    pub use_ipv4: bool,

    /// Enable the IPv6 transport.
    pub use_ipv6: bool,

    /// Whether query responses flatten SRV/TXT/A/AAAA additionals into the
    /// answer section instead of leaving them as additionals.
    pub answers_contain_additional_records: bool,

    /// Whether `send_answer` consults the recent-messages cache.
    pub ignore_duplicate_messages: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            discovery_interval: Duration::from_secs(2 * 60),
            multicast_loopback: true,
            use_ipv4: true,
            use_ipv6: true,
            answers_contain_additional_records: false,
            ignore_duplicate_messages: true,
        }
    }
}
