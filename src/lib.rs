//! A link-local name resolution and service discovery stack: Multicast
//! DNS (RFC 6762) and DNS-Based Service Discovery (RFC 6763) over IPv4
//! and IPv6, with no central DNS server required.
//!
//! # Features
//! * A byte-exact DNS wire codec with name compression
//!   ([`Message::from_slice`]/[`Message::to_vec`]).
//! * An in-memory authoritative catalog ([`catalog::Catalog`]) for
//!   `.local` names.
//! * Multi-interface UDP multicast transport with loopback filtering and
//!   duplicate suppression ([`service::MulticastService`]).
//! * DNS-SD service advertisement and discovery
//!   ([`discovery::ServiceDiscovery`]).
//!
//! # Usage
//!
//! ```no_run
//! use rustdns_sd::cfg::Config;
//! use rustdns_sd::discovery::{ServiceDiscovery, ServiceProfile};
//! use rustdns_sd::service::MulticastService;
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! # async fn example() -> Result<(), rustdns_sd::errors::Error> {
//! let service = MulticastService::new(Config::default());
//! service.start().await?;
//!
//! let discovery = ServiceDiscovery::new(service, Config::default());
//! discovery.run_handlers();
//!
//! let profile = ServiceProfile::new(
//!     "my-printer",
//!     "_printer._tcp",
//!     515,
//!     vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42))],
//! );
//! discovery.advertise(&profile);
//! discovery.announce(&profile).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cfg;
pub mod discovery;
pub mod dns;
pub mod errors;
pub mod events;
pub mod io;
pub mod name;
pub mod nameserver;
pub mod nic;
pub mod recent;
pub mod resource;
pub mod service;
pub mod transport;
pub mod types;
pub mod util;

mod display;

#[macro_use]
extern crate num_derive;

#[doc(inline)]
pub use crate::types::*;

#[doc(inline)]
pub use crate::resource::*;

#[doc(inline)]
pub use crate::name::Name;

pub use crate::errors::Error;
