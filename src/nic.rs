//! Periodic network-interface discovery (spec.md §4.3).
//!
//! Grounded on `dns_sd2`'s and `uwuhi`'s manifests, both of which reach for
//! `if-addrs` to enumerate local addresses rather than hand-rolling
//! `getifaddrs` bindings the way a C DNS-SD stack would.

use crate::cfg::Config;
use if_addrs::{IfAddr, Interface};
use std::collections::HashSet;
use std::net::IpAddr;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

/// One local unicast address worth joining multicast groups on, paired
/// with the OS interface index IPv6 scoped joins need.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NicAddr {
    pub name: String,
    pub addr: IpAddr,
    pub index: Option<u32>,
    /// IPv4 subnet mask, when known; used for link-local reachability
    /// checks (spec.md glossary "Link-local reachability").
    pub netmask: Option<IpAddr>,
}

/// Result of one poll: addresses that newly appeared/disappeared since the
/// previous poll (spec.md §4.3; everything is `added` on the first poll).
#[derive(Clone, Debug, Default)]
pub struct NicDiff {
    pub added: Vec<NicAddr>,
    pub removed: Vec<NicAddr>,
}

fn netmask_of(iface: &Interface) -> Option<IpAddr> {
    match &iface.addr {
        IfAddr::V4(v4) => Some(IpAddr::V4(v4.netmask)),
        IfAddr::V6(v6) => Some(IpAddr::V6(v6.netmask)),
    }
}

fn usable_addrs() -> std::io::Result<HashSet<NicAddr>> {
    let ifaces: Vec<Interface> = if_addrs::get_if_addrs()?;
    Ok(ifaces
        .iter()
        .filter(|iface| !iface.is_loopback())
        .map(|iface| NicAddr {
            name: iface.name.clone(),
            addr: iface.ip(),
            index: iface.index,
            netmask: netmask_of(iface),
        })
        .collect())
}

/// Polls the OS interface list at `config.discovery_interval`, pushing a
/// `NicDiff` on `tx` each time the set changes (including the first poll,
/// where everything is `added`). Runs until `tx` is dropped or the task is
/// cancelled.
pub async fn run(config: Config, tx: mpsc::UnboundedSender<NicDiff>) {
    let mut known: HashSet<NicAddr> = HashSet::new();
    let mut ticker = interval(max(config.discovery_interval, Duration::from_millis(1)));

    loop {
        ticker.tick().await;

        let current = match usable_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::warn!("nic monitor: failed to enumerate interfaces: {}", e);
                continue;
            }
        };

        let added: Vec<NicAddr> = current.difference(&known).cloned().collect();
        let removed: Vec<NicAddr> = known.difference(&current).cloned().collect();

        if !added.is_empty() || !removed.is_empty() {
            known = current;
            if tx.send(NicDiff { added, removed }).is_err() {
                return;
            }
        }
    }
}

fn max(a: Duration, b: Duration) -> Duration {
    if a > b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nic_diff_default_is_empty() {
        let diff = NicDiff::default();
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
    }
}
