//! DNS-SD semantics: advertise, browse, announce/goodbye, subtype and
//! reverse-address PTRs (spec.md §4.7).

use crate::cfg::{Config, HOST_RECORD_TTL, SHARED_RECORD_TTL};
use crate::catalog::Catalog;
use crate::events::Event;
use crate::name::Name;
use crate::nameserver::NameServer;
use crate::resource::{Resource, Srv};
use crate::service::MulticastService;
use crate::types::{Class, Message, Type, RR};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// The well-known enumeration name every advertised service is indexed
/// under (RFC 6763 §9).
fn services_enum_name() -> Name {
    Name::parse("_services._dns-sd._udp.local")
}

/// `(instance_name, service_name, domain="local", port, host_name,
/// resources, subtypes)` (spec.md §3).
#[derive(Clone, Debug)]
pub struct ServiceProfile {
    pub instance_name: String,
    pub service_name: String,
    pub domain: String,
    pub port: u16,
    pub host_name: Option<Name>,
    pub addresses: Vec<IpAddr>,
    pub txt: Vec<Vec<u8>>,
    pub subtypes: Vec<String>,
}

impl ServiceProfile {
    pub fn new(instance_name: &str, service_name: &str, port: u16, addresses: Vec<IpAddr>) -> ServiceProfile {
        ServiceProfile {
            instance_name: instance_name.to_string(),
            service_name: service_name.to_string(),
            domain: "local".to_string(),
            port,
            host_name: None,
            addresses,
            txt: Vec::new(),
            subtypes: Vec::new(),
        }
    }

    /// `service_name.domain`, e.g. `_printer._tcp.local` (spec.md §3).
    pub fn qualified_service(&self) -> Name {
        Name::parse(&format!("{}.{}", self.service_name, self.domain))
    }

    /// `instance_name.qualified_service` (spec.md §3).
    pub fn fully_qualified_instance(&self) -> Name {
        self.qualified_service().prepend(&self.instance_name)
    }

    /// Defaults to `instance_name.<service-label>.domain` with the
    /// leading underscore stripped and `_` mapped to `-` (spec.md §3).
    pub fn host_name(&self) -> Name {
        if let Some(host_name) = &self.host_name {
            return host_name.clone();
        }

        let service_label = self
            .service_name
            .split('.')
            .next()
            .unwrap_or(&self.service_name)
            .trim_start_matches('_')
            .replace('_', "-");

        Name::parse(&format!(
            "{}.{}.{}",
            self.instance_name, service_label, self.domain
        ))
    }

    fn subtype_name(&self, subtype: &str) -> Name {
        Name::parse(&format!("{}._sub.{}", subtype, self.qualified_service()))
    }

    /// One SRV (at `host_name`), one TXT (`txtvers=1` at minimum), and one
    /// A/AAAA per supplied address (spec.md §3).
    fn resources(&self) -> Vec<RR> {
        let host_name = self.host_name();
        let mut out = Vec::with_capacity(2 + self.addresses.len());

        out.push(RR {
            name: self.fully_qualified_instance(),
            class: Class::Internet,
            cache_flush: true,
            ttl: HOST_RECORD_TTL,
            resource: Resource::SRV(Srv {
                priority: 0,
                weight: 0,
                port: self.port,
                target: host_name.clone(),
            }),
        });

        let mut txt = self.txt.clone();
        if txt.is_empty() {
            txt.push(b"txtvers=1".to_vec());
        }
        out.push(RR {
            name: self.fully_qualified_instance(),
            class: Class::Internet,
            cache_flush: true,
            ttl: HOST_RECORD_TTL,
            resource: Resource::TXT(txt),
        });

        for addr in &self.addresses {
            let resource = match addr {
                IpAddr::V4(v4) => Resource::A(*v4),
                IpAddr::V6(v6) => Resource::AAAA(*v6),
            };
            out.push(RR {
                name: host_name.clone(),
                class: Class::Internet,
                cache_flush: true,
                ttl: HOST_RECORD_TTL,
                resource,
            });
        }

        out
    }
}

/// Owns a `MulticastService` and a `NameServer` with an empty catalog,
/// plus the set of profiles this process advertises (spec.md §4.7).
#[derive(Clone)]
pub struct ServiceDiscovery {
    service: MulticastService,
    nameserver: Arc<NameServer>,
    config: Config,
}

impl ServiceDiscovery {
    pub fn new(service: MulticastService, config: Config) -> ServiceDiscovery {
        ServiceDiscovery {
            service,
            nameserver: Arc::new(NameServer::new()),
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.nameserver.catalog
    }

    /// Spawns the query/answer handlers bound to the underlying service's
    /// event stream (spec.md §4.7 "Query handler"/"Answer handler").
    pub fn run_handlers(&self) {
        let mut rx = self.service.subscribe();
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Event::QueryReceived {
                        message,
                        local_addr,
                        remote_addr,
                    }) => {
                        let this = this.clone();
                        tokio::spawn(async move {
                            this.handle_query(&message, local_addr, remote_addr).await;
                        });
                    }
                    Ok(Event::AnswerReceived { message, .. }) => {
                        this.handle_answer(&message);
                    }
                    Ok(_) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                }
            }
        });
    }

    /// `advertise(profile)` (spec.md §4.7).
    pub fn advertise(&self, profile: &ServiceProfile) {
        let catalog = self.catalog();

        catalog.add(
            RR {
                name: services_enum_name(),
                class: Class::Internet,
                cache_flush: false,
                ttl: SHARED_RECORD_TTL,
                resource: Resource::PTR(profile.qualified_service()),
            },
            true,
        );

        catalog.add(
            RR {
                name: profile.qualified_service(),
                class: Class::Internet,
                cache_flush: false,
                ttl: SHARED_RECORD_TTL,
                resource: Resource::PTR(profile.fully_qualified_instance()),
            },
            true,
        );

        for subtype in &profile.subtypes {
            catalog.add(
                RR {
                    name: profile.subtype_name(subtype),
                    class: Class::Internet,
                    cache_flush: false,
                    ttl: SHARED_RECORD_TTL,
                    resource: Resource::PTR(profile.fully_qualified_instance()),
                },
                true,
            );
        }

        for rr in profile.resources() {
            catalog.add(rr, true);
        }

        catalog.include_reverse_lookup_records();
    }

    /// `unadvertise(profile)` (spec.md §4.7): emits a goodbye covering
    /// every PTR `advertise` inserted for this instance — the
    /// `qualified_service` PTR and each subtype PTR, not just the
    /// instance's own resources — then removes them from the catalog.
    pub async fn unadvertise(&self, profile: &ServiceProfile) -> Result<(), crate::errors::Error> {
        let mut withdrawn = vec![RR {
            name: profile.qualified_service(),
            class: Class::Internet,
            cache_flush: false,
            ttl: Duration::ZERO,
            resource: Resource::PTR(profile.fully_qualified_instance()),
        }];
        for subtype in &profile.subtypes {
            withdrawn.push(RR {
                name: profile.subtype_name(subtype),
                class: Class::Internet,
                cache_flush: false,
                ttl: Duration::ZERO,
                resource: Resource::PTR(profile.fully_qualified_instance()),
            });
        }
        for mut rr in profile.resources() {
            rr.ttl = Duration::ZERO;
            withdrawn.push(rr);
        }

        let mut goodbye = Message::new_answer();
        goodbye.answers = withdrawn.clone();
        self.service.send_answer(goodbye, false).await?;

        // Route every withdrawn PTR/resource through `Catalog::add`, which
        // treats a TTL-0 record as a removal (catalog.rs) and only deletes
        // the matching record within its RRset — so a `qualified_service`
        // or subtype PTR shared with other instances of the same service
        // is left alone (spec.md §4.2 `add` merge rule).
        for rr in withdrawn {
            self.catalog().add(rr, true);
        }
        self.catalog().remove(&profile.fully_qualified_instance());
        self.catalog().remove(&profile.host_name());
        Ok(())
    }

    /// `announce(profile)` (spec.md §4.7): two unsolicited answers, ≥1 s
    /// apart, `check_duplicate=false`.
    pub async fn announce(&self, profile: &ServiceProfile) -> Result<(), crate::errors::Error> {
        self.send_announcement(profile).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.send_announcement(profile).await
    }

    async fn send_announcement(&self, profile: &ServiceProfile) -> Result<(), crate::errors::Error> {
        let mut message = Message::new_answer();
        message.answers.push(RR {
            name: profile.qualified_service(),
            class: Class::Internet,
            cache_flush: false,
            ttl: SHARED_RECORD_TTL,
            resource: Resource::PTR(profile.fully_qualified_instance()),
        });
        message.answers.extend(profile.resources());
        self.service.send_answer(message, false).await
    }

    /// `query_all_services()` (spec.md §4.7).
    pub async fn query_all_services(&self) -> Result<(), crate::errors::Error> {
        self.service
            .send_query(services_enum_name(), Type::PTR, Class::Internet)
            .await
    }

    /// `query_service_instances(service[, subtype])` (spec.md §4.7).
    pub async fn query_service_instances(
        &self,
        service: &str,
        subtype: Option<&str>,
    ) -> Result<(), crate::errors::Error> {
        let name = match subtype {
            Some(sub) => Name::parse(&format!("{}._sub.{}.local", sub, service)),
            None => Name::parse(&format!("{}.local", service)),
        };
        self.service.send_query(name, Type::PTR, Class::Internet).await
    }

    /// Unicast variant of `query_service_instances` (spec.md §4.7).
    pub async fn query_service_instances_unicast(
        &self,
        service: &str,
        subtype: Option<&str>,
    ) -> Result<(), crate::errors::Error> {
        let name = match subtype {
            Some(sub) => Name::parse(&format!("{}._sub.{}.local", sub, service)),
            None => Name::parse(&format!("{}.local", service)),
        };
        let mut message = Message::new_query();
        message
            .questions
            .push(crate::types::Question::new(name, Type::PTR, Class::Internet));
        self.service.send_unicast_query(&message).await
    }

    async fn handle_query(&self, request: &Message, local_addr: SocketAddr, remote_addr: SocketAddr) {
        let unicast_requested = request.questions.iter().any(|q| q.unicast_response);

        let mut response = self
            .nameserver
            .resolve(request, self.config.answers_contain_additional_records);

        if response.answers.is_empty() {
            return;
        }

        // Some browsers mishandle additionals on the DNS-SD enumeration
        // record; drop them when the answer set includes it (spec.md
        // §4.7 "Query handler").
        if response
            .answers
            .iter()
            .any(|rr| rr.name == services_enum_name())
        {
            response.additionals.clear();
        }

        if self.config.answers_contain_additional_records {
            let additionals = std::mem::take(&mut response.additionals);
            response.answers.extend(additionals);
        }

        response
            .answers
            .retain(|rr| reachable(rr, local_addr, remote_addr));

        let result = if unicast_requested {
            self.service.send_unicast_answer(response, remote_addr).await
        } else {
            self.service
                .send_answer(response, self.config.ignore_duplicate_messages)
                .await
        };

        if let Err(e) = result {
            log::warn!("failed to answer query from {}: {}", remote_addr, e);
        }
    }

    fn handle_answer(&self, message: &Arc<Message>) {
        for rr in &message.answers {
            if !is_dns_sd_ptr(rr) {
                continue;
            }

            let target = match &rr.resource {
                Resource::PTR(target) => target.clone(),
                _ => continue,
            };

            let event = if rr.name == services_enum_name() {
                Event::ServiceDiscovered { name: target }
            } else if rr.is_goodbye() {
                Event::ServiceInstanceShutdown {
                    name: target,
                    message: message.clone(),
                }
            } else {
                Event::ServiceInstanceDiscovered {
                    name: target,
                    message: message.clone(),
                }
            };

            self.service.raise(event);
        }
    }
}

fn is_dns_sd_ptr(rr: &RR) -> bool {
    matches!(rr.resource, Resource::PTR(_)) && rr.name.is_subdomain_of(&Name::parse("local"))
}

/// Approximates spec.md's glossary "Link-local reachability": same-subnet
/// (IPv4) or equal endpoint (loopback/self). `local_addr` is the specific
/// NIC address the datagram actually arrived on (`transport::NicSocket`
/// binds one dual-purpose socket per interface precisely so this is known
/// exactly, rather than a wildcard bind address — see `transport.rs`'s
/// module doc), so the subnet check below is comparing two real addresses,
/// not an unspecified address against the remote.
fn reachable(_rr: &RR, local_addr: SocketAddr, remote_addr: SocketAddr) -> bool {
    local_addr.ip() == remote_addr.ip() || same_ipv4_subnet(local_addr, remote_addr)
}

fn same_ipv4_subnet(a: SocketAddr, b: SocketAddr) -> bool {
    match (a.ip(), b.ip()) {
        (IpAddr::V4(a), IpAddr::V4(b)) => {
            let a = u32::from(a);
            let b = u32::from(b);
            // /24 is a conservative default absent an actual netmask at
            // this call site (the NIC monitor's netmask lives one layer
            // up, in `transport::Transport`).
            (a & 0xffff_ff00) == (b & 0xffff_ff00)
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn profile() -> ServiceProfile {
        ServiceProfile::new(
            "x",
            "_sdtest._udp",
            1024,
            vec![IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))],
        )
    }

    #[test]
    fn qualified_service_joins_service_and_domain() {
        assert_eq!(
            profile().qualified_service(),
            Name::parse("_sdtest._udp.local")
        );
    }

    #[test]
    fn fully_qualified_instance_prepends_instance_name() {
        assert_eq!(
            profile().fully_qualified_instance(),
            Name::parse("x._sdtest._udp.local")
        );
    }

    #[test]
    fn host_name_strips_leading_underscore_and_maps_dashes() {
        let mut p = profile();
        p.service_name = "_my_service._tcp".to_string();
        assert_eq!(p.host_name(), Name::parse("x.my-service.local"));
    }

    #[test]
    fn resources_always_include_srv_and_txt() {
        let resources = profile().resources();
        assert!(resources
            .iter()
            .any(|rr| matches!(rr.resource, Resource::SRV(_))));
        assert!(resources
            .iter()
            .any(|rr| matches!(rr.resource, Resource::TXT(_))));
    }

    // spec.md §8 scenario 3, exercised against the nameserver/event layer
    // directly rather than real sockets: advertising a profile answers a
    // `_services._dns-sd._udp.local` PTR query, and feeding that answer
    // back through the answer handler raises `ServiceDiscovered`.
    #[tokio::test]
    async fn advertise_then_enumerate_raises_service_discovered() {
        let service = MulticastService::new(Config::default());
        let discovery = ServiceDiscovery::new(service.clone(), Config::default());
        discovery.advertise(&profile());

        let mut query = Message::new_query();
        query.questions.push(crate::types::Question::new(
            services_enum_name(),
            Type::PTR,
            Class::Internet,
        ));

        let answer = discovery.nameserver.resolve(&query, false);
        assert!(answer.answers.iter().any(|rr| matches!(
            &rr.resource,
            Resource::PTR(target) if *target == profile().qualified_service()
        )));

        let mut events = service.subscribe();
        discovery.handle_answer(&Arc::new(answer));

        match events.try_recv().expect("expected a raised event") {
            Event::ServiceDiscovered { name } => {
                assert_eq!(name, profile().qualified_service())
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
