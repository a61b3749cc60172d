//! Per-interface UDP multicast sockets: membership, send fan-out, receive
//! loop, loopback filtering (spec.md §4.4).
//!
//! Grounded on `dylnuge-montague`'s and `dns_sd2`'s manifests, both of
//! which build their multicast sockets with `socket2` (for the
//! `SO_REUSEADDR`/`SO_REUSEPORT` and `join_multicast_v4/v6` calls `std`
//! doesn't expose) and hand the resulting fd to `tokio::net::UdpSocket`
//! for the actual async I/O.
//!
//! **Deviation from spec.md §4.4's literal socket policy.** spec.md
//! describes a single receiver bound to `0.0.0.0:5353`/`[::]:5353` per
//! family, with per-NIC-address senders alongside it. That wildcard
//! receiver can never report which interface actually received a given
//! datagram — `UdpSocket::local_addr()` on a wildcard-bound socket only
//! ever returns the wildcard address, never the interface address the OS
//! picked. Since `ServiceDiscovery::handle_query` needs the real local
//! interface address to decide link-local reachability (spec.md glossary),
//! this module instead binds one dual-purpose socket per NIC unicast
//! address, each bound directly to `A:5353`, reusing the address/port so
//! multiple interfaces can share the multicast port. Each such socket both
//! sends and receives; the local address used in `Event::QueryReceived` is
//! then the socket's own known bind address, not a runtime `local_addr()`
//! query. Recorded in `DESIGN.md`.

use crate::cfg::{Config, MAX_DATAGRAM, MDNS_GROUP_V4, MDNS_GROUP_V6, MDNS_PORT, MIN_MAX_PACKET};
use crate::errors::Error;
use crate::nic::NicAddr;
use socket2::{Domain, Protocol, SockAddr, Socket, Type as SockType};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::sync::Arc;
use tokio::net::UdpSocket;

/// One dual-purpose socket bound to a specific NIC's unicast address
/// (spec.md §4.4 step 2), used for both sending and receiving on that
/// interface.
pub struct NicSocket {
    pub socket: Arc<UdpSocket>,
    pub local_addr: SocketAddr,
}

/// The live set of sockets backing a `MulticastService` (spec.md §4.4).
pub struct Transport {
    pub sockets: Vec<NicSocket>,
    /// The first successfully-bound socket address; datagrams that loop
    /// back from this address are delivered, all others from our own
    /// addresses are dropped (spec.md §4.4 "designated loopback source").
    pub loopback_source: Option<SocketAddr>,
    pub max_packet: usize,
}

impl Transport {
    /// Builds one socket per enabled family and usable NIC address
    /// (spec.md §4.4 "Socket policy", adapted per the module doc above).
    pub async fn start(config: &Config, nics: &[NicAddr]) -> Result<Transport, Error> {
        let mut sockets = Vec::new();
        let mut loopback_source = None;

        for nic in nics {
            let sock = match nic.addr {
                IpAddr::V4(addr) if config.use_ipv4 => {
                    bind_socket_v4(addr, config.multicast_loopback)?
                }
                IpAddr::V6(addr) if config.use_ipv6 => {
                    bind_socket_v6(addr, nic.index, config.multicast_loopback)?
                }
                _ => continue,
            };

            let local_addr = SocketAddr::new(nic.addr, MDNS_PORT);
            if loopback_source.is_none() {
                loopback_source = Some(local_addr);
            }
            sockets.push(NicSocket {
                socket: Arc::new(sock),
                local_addr,
            });
        }

        if sockets.is_empty() {
            return Err(Error::StartupError);
        }

        Ok(Transport {
            sockets,
            loopback_source,
            max_packet: MAX_DATAGRAM.saturating_sub(crate::cfg::IP_UDP_OVERHEAD).max(MIN_MAX_PACKET),
        })
    }

    /// Fans `bytes` out across every socket concurrently. A per-socket send
    /// failure is logged and skipped, never propagated (spec.md §4.4
    /// "Send").
    pub async fn send(&self, bytes: &[u8]) {
        let mut tasks = tokio::task::JoinSet::new();
        for nic_socket in &self.sockets {
            let socket = nic_socket.socket.clone();
            let local_addr = nic_socket.local_addr;
            let group = match local_addr.ip() {
                IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(MDNS_GROUP_V4), MDNS_PORT),
                IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(MDNS_GROUP_V6), MDNS_PORT),
            };
            let buf = bytes.to_vec();
            tasks.spawn(async move {
                if let Err(e) = socket.send_to(&buf, group).await {
                    log::warn!("send to {} via {} failed: {}", group, local_addr, e);
                }
            });
        }
        while tasks.join_next().await.is_some() {}
    }

    /// Sends `bytes` to a single unicast endpoint over whichever socket
    /// shares its address family (spec.md §4.5 unicast answers).
    pub async fn send_unicast(&self, bytes: &[u8], to: SocketAddr) {
        let nic_socket = self
            .sockets
            .iter()
            .find(|s| s.local_addr.is_ipv4() == to.is_ipv4());
        if let Some(nic_socket) = nic_socket {
            if let Err(e) = nic_socket.socket.send_to(bytes, to).await {
                log::warn!("unicast send to {} failed: {}", to, e);
            }
        }
    }

    /// Loopback filter (spec.md §4.4 "Receive"): drop a datagram that
    /// appears to have come from one of our own addresses unless it is the
    /// designated loopback source.
    pub fn accept(&self, remote: SocketAddr) -> bool {
        if self.sockets.iter().any(|s| s.local_addr.ip() == remote.ip()) {
            return self.loopback_source == Some(remote)
                || self.loopback_source.map(|l| l.ip()) == Some(remote.ip());
        }
        true
    }
}

fn reuse_socket(domain: Domain) -> io::Result<Socket> {
    let socket = Socket::new(domain, SockType::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

fn bind_socket_v4(addr: Ipv4Addr, loopback: bool) -> Result<UdpSocket, Error> {
    let socket = reuse_socket(Domain::IPV4)?;
    let bind_addr = SocketAddr::V4(SocketAddrV4::new(addr, MDNS_PORT));
    socket.bind(&SockAddr::from(bind_addr))?;
    socket.join_multicast_v4(&MDNS_GROUP_V4, &addr)?;
    socket.set_multicast_loop_v4(loopback)?;
    Ok(UdpSocket::from_std(socket.into())?)
}

fn bind_socket_v6(addr: Ipv6Addr, index: Option<u32>, loopback: bool) -> Result<UdpSocket, Error> {
    let scope_id = index.unwrap_or(0);
    let socket = reuse_socket(Domain::IPV6)?;
    let bind_addr = SocketAddr::V6(SocketAddrV6::new(addr, MDNS_PORT, 0, scope_id));
    socket.bind(&SockAddr::from(bind_addr))?;
    socket.join_multicast_v6(&MDNS_GROUP_V6, scope_id)?;
    socket.set_multicast_loop_v6(loopback)?;
    Ok(UdpSocket::from_std(socket.into())?)
}
