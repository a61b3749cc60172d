//! In-memory authoritative zone for `.local` (spec.md §3, §4.2).
//!
//! Grounded on the teacher's intended (never-wired) `zones.rs`
//! authoritative-data idea, reshaped around spec.md §4.2's `Node`/`RRset`
//! contract: a `Node` is a small map keyed by `(Type, Class)`, each entry a
//! set of records sharing an authoritative flag, guarded by a single
//! crate-wide `RwLock` rather than per-node locks, since mDNS catalogs stay
//! small (spec.md §4.2 "additional detail").

use crate::name::Name;
use crate::types::{Class, Type, RR};
use std::collections::HashMap;
use std::sync::RwLock;

/// All records sharing a `(name, type, class)`, plus whether this crate
/// authored them (vs. learned them from the network).
#[derive(Clone, Debug, Default)]
pub struct RRset {
    pub authoritative: bool,
    pub records: Vec<RR>,
}

/// Everything known about one name, grouped by `(type, class)`.
#[derive(Clone, Debug, Default)]
pub struct Node {
    rrsets: HashMap<(Type, Class), RRset>,
}

impl Node {
    pub fn rrsets(&self) -> impl Iterator<Item = &RRset> {
        self.rrsets.values()
    }
}

/// Mapping from canonical domain name to `Node` (spec.md §3).
#[derive(Default)]
pub struct Catalog {
    nodes: RwLock<HashMap<Name, Node>>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    /// Inserts `rr` into its `(name, type, class)` RRset, deduplicating
    /// identical records and taking the higher TTL on a match (spec.md
    /// §4.2). A TTL-0 record (goodbye) is routed to `remove_record`
    /// instead of inserted, per spec.md §3 "TTL 0 means remove on
    /// acknowledge".
    pub fn add(&self, rr: RR, authoritative: bool) {
        if rr.is_goodbye() {
            self.remove_record(&rr);
            return;
        }

        let mut nodes = self.nodes.write().unwrap();
        let node = nodes.entry(rr.name.clone()).or_default();
        let rrset = node
            .rrsets
            .entry((rr.r#type(), rr.class))
            .or_insert_with(|| RRset {
                authoritative,
                records: Vec::new(),
            });

        // Adding an authoritative RR authors the whole RRset authoritative
        // (spec.md §4.2 invariant).
        rrset.authoritative |= authoritative;

        if let Some(existing) = rrset
            .records
            .iter_mut()
            .find(|r| r.resource == rr.resource)
        {
            if rr.ttl > existing.ttl {
                existing.ttl = rr.ttl;
            }
            existing.cache_flush = rr.cache_flush;
        } else {
            rrset.records.push(rr);
        }
    }

    fn remove_record(&self, rr: &RR) {
        let mut nodes = self.nodes.write().unwrap();
        if let Some(node) = nodes.get_mut(&rr.name) {
            if let Some(rrset) = node.rrsets.get_mut(&(rr.r#type(), rr.class)) {
                rrset.records.retain(|r| r.resource != rr.resource);
                if rrset.records.is_empty() {
                    node.rrsets.remove(&(rr.r#type(), rr.class));
                }
            }
            if node.rrsets.is_empty() {
                nodes.remove(&rr.name);
            }
        }
    }

    /// Removes every RRset under `name` (spec.md §4.2).
    pub fn remove(&self, name: &Name) {
        self.nodes.write().unwrap().remove(name);
    }

    /// Removes a single `(name, type)` RRset across both classes (spec.md
    /// §4.2).
    pub fn remove_rrset(&self, name: &Name, r#type: Type) {
        let mut nodes = self.nodes.write().unwrap();
        if let Some(node) = nodes.get_mut(name) {
            node.rrsets.retain(|(t, _), _| *t != r#type);
            if node.rrsets.is_empty() {
                nodes.remove(name);
            }
        }
    }

    /// Yields all RRsets under `name` (spec.md §4.2 `iter`).
    pub fn iter(&self, name: &Name) -> Vec<RRset> {
        self.nodes
            .read()
            .unwrap()
            .get(name)
            .map(|node| node.rrsets().cloned().collect())
            .unwrap_or_default()
    }

    /// Scans every A/AAAA record in the catalog and inserts a PTR under
    /// `in-addr.arpa`/`ip6.arpa` pointing back at the owning name (spec.md
    /// §4.2).
    pub fn include_reverse_lookup_records(&self) {
        use crate::resource::Resource;

        let snapshot: Vec<(Name, RR)> = {
            let nodes = self.nodes.read().unwrap();
            nodes
                .iter()
                .flat_map(|(name, node)| {
                    node.rrsets
                        .values()
                        .flat_map(|rrset| rrset.records.iter())
                        .filter_map(move |rr| Some((name.clone(), rr.clone())))
                })
                .collect()
        };

        for (owner, rr) in snapshot {
            let ptr_name = match &rr.resource {
                Resource::A(addr) => reverse_name_v4(*addr),
                Resource::AAAA(addr) => reverse_name_v6(*addr),
                _ => continue,
            };

            self.add(
                RR {
                    name: ptr_name,
                    class: rr.class,
                    cache_flush: false,
                    ttl: rr.ttl,
                    resource: Resource::PTR(owner),
                },
                true,
            );
        }
    }
}

fn reverse_name_v4(addr: std::net::Ipv4Addr) -> Name {
    let o = addr.octets();
    Name::parse(&format!(
        "{}.{}.{}.{}.in-addr.arpa",
        o[3], o[2], o[1], o[0]
    ))
}

fn reverse_name_v6(addr: std::net::Ipv6Addr) -> Name {
    let mut nibbles = String::with_capacity(64);
    for byte in addr.octets().iter().rev() {
        nibbles.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
    }
    Name::parse(&format!("{}ip6.arpa", nibbles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn a_record(name: &str, ttl_secs: u64) -> RR {
        RR {
            name: Name::parse(name),
            class: Class::Internet,
            cache_flush: false,
            ttl: Duration::from_secs(ttl_secs),
            resource: Resource::A(Ipv4Addr::new(10, 0, 0, 1)),
        }
    }

    #[test]
    fn add_dedupes_identical_records() {
        let cat = Catalog::new();
        cat.add(a_record("host.local", 120), true);
        cat.add(a_record("host.local", 120), true);
        let rrsets = cat.iter(&Name::parse("host.local"));
        assert_eq!(rrsets.len(), 1);
        assert_eq!(rrsets[0].records.len(), 1);
    }

    #[test]
    fn add_keeps_higher_ttl_on_merge() {
        let cat = Catalog::new();
        cat.add(a_record("host.local", 60), true);
        cat.add(a_record("host.local", 120), true);
        let rrsets = cat.iter(&Name::parse("host.local"));
        assert_eq!(rrsets[0].records[0].ttl, Duration::from_secs(120));
    }

    #[test]
    fn zero_ttl_removes_rather_than_inserts() {
        let cat = Catalog::new();
        cat.add(a_record("host.local", 120), true);
        cat.add(a_record("host.local", 0), true);
        assert!(cat.iter(&Name::parse("host.local")).is_empty());
    }

    #[test]
    fn reverse_lookup_records_are_generated() {
        let cat = Catalog::new();
        cat.add(a_record("host.local", 120), true);
        cat.include_reverse_lookup_records();

        let ptr_name = Name::parse("1.0.0.10.in-addr.arpa");
        let rrsets = cat.iter(&ptr_name);
        assert_eq!(rrsets.len(), 1);
        match &rrsets[0].records[0].resource {
            Resource::PTR(target) => assert_eq!(*target, Name::parse("host.local")),
            other => panic!("expected PTR, got {:?}", other),
        }
    }
}
