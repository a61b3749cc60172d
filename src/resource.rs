//! Typed RDATA (spec.md §3, §4.1).
//!
//! Grounded on the teacher's `Mx`/`Soa`/`Srv` structs in the (stale, never
//! wired into `lib.rs`) `resource.rs`/`types.rs` split, consolidated here
//! into one coherent, table-dispatched module: `Resource::read_data`
//! selects a per-type constructor the way the teacher's
//! `Record::from_slice` did, and falls through to `Unknown` for any type
//! the match doesn't name, satisfying spec.md §3's "unknown types
//! round-trip opaquely".

use crate::errors::Error;
use crate::io::{Reader, Writer};
use crate::name::Name;
use crate::types::{Class, Type};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Clone, Debug, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mx {
    pub preference: u16,
    pub exchange: Name,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: Name,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Nsec {
    pub next_domain: Name,
    /// Type bitmap, preserved verbatim (spec.md §4.1).
    pub type_bitmap: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hinfo {
    pub cpu: Vec<u8>,
    pub os: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Resource {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(Name),
    NS(Name),
    PTR(Name),
    TXT(Vec<Vec<u8>>),
    MX(Mx),
    SOA(Soa),
    SRV(Srv),
    NSEC(Nsec),
    HINFO(Hinfo),
    /// Any record type not in the closed sum above; `rdata` is the raw
    /// RDATA bytes, preserved verbatim.
    Unknown { r#type: Type, rdata: Vec<u8> },
}

impl Resource {
    pub fn r#type(&self) -> Type {
        match self {
            Resource::A(_) => Type::A,
            Resource::AAAA(_) => Type::AAAA,
            Resource::CNAME(_) => Type::CNAME,
            Resource::NS(_) => Type::NS,
            Resource::PTR(_) => Type::PTR,
            Resource::TXT(_) => Type::TXT,
            Resource::MX(_) => Type::MX,
            Resource::SOA(_) => Type::SOA,
            Resource::SRV(_) => Type::SRV,
            Resource::NSEC(_) => Type::NSEC,
            Resource::HINFO(_) => Type::HINFO,
            Resource::Unknown { r#type, .. } => *r#type,
        }
    }

    /// Parses RDATA of exactly `len` bytes taken from `reader`'s current
    /// position. `reader` must be the full-message reader (not a
    /// pre-sliced one) so embedded names can follow compression pointers
    /// back into earlier parts of the message.
    pub fn read_data(
        r#type: Type,
        class: Class,
        reader: &mut Reader,
        len: usize,
    ) -> Result<Resource, Error> {
        let start = reader.position();
        let resource = Self::read_data_inner(r#type, class, reader, len)?;
        let consumed = reader.position() - start;
        if consumed != len {
            return Err(Error::MalformedMessage(format!(
                "{:?} RDATA claimed {} bytes but {} were consumed",
                r#type, len, consumed
            )));
        }
        Ok(resource)
    }

    fn read_data_inner(
        r#type: Type,
        _class: Class,
        reader: &mut Reader,
        len: usize,
    ) -> Result<Resource, Error> {
        let malformed = |e: std::io::Error| Error::MalformedMessage(e.to_string());

        Ok(match r#type {
            Type::A => Resource::A(reader.read_ipv4().map_err(malformed)?),
            Type::AAAA => Resource::AAAA(reader.read_ipv6().map_err(malformed)?),
            Type::CNAME => Resource::CNAME(reader.read_name().map_err(malformed)?),
            Type::NS => Resource::NS(reader.read_name().map_err(malformed)?),
            Type::PTR => Resource::PTR(reader.read_name().map_err(malformed)?),
            Type::TXT => {
                let mut strings = Vec::new();
                let mut remaining = len;
                while remaining > 0 {
                    let before = reader.position();
                    let s = reader.read_string().map_err(malformed)?;
                    remaining -= reader.position() - before;
                    strings.push(s);
                }
                Resource::TXT(strings)
            }
            Type::MX => Resource::MX(Mx {
                preference: reader.read_u16().map_err(malformed)?,
                exchange: reader.read_name().map_err(malformed)?,
            }),
            Type::SOA => Resource::SOA(Soa {
                mname: reader.read_name().map_err(malformed)?,
                rname: reader.read_name().map_err(malformed)?,
                serial: reader.read_u32().map_err(malformed)?,
                refresh: reader.read_u32().map_err(malformed)?,
                retry: reader.read_u32().map_err(malformed)?,
                expire: reader.read_u32().map_err(malformed)?,
                minimum: reader.read_u32().map_err(malformed)?,
            }),
            Type::SRV => Resource::SRV(Srv {
                priority: reader.read_u16().map_err(malformed)?,
                weight: reader.read_u16().map_err(malformed)?,
                port: reader.read_u16().map_err(malformed)?,
                target: reader.read_name().map_err(malformed)?,
            }),
            Type::NSEC => {
                let before = reader.position();
                let next_domain = reader.read_name().map_err(malformed)?;
                let name_len = reader.position() - before;
                let bitmap_len = len
                    .checked_sub(name_len)
                    .ok_or_else(|| Error::MalformedMessage("NSEC rdata too short".into()))?;
                let type_bitmap = reader.read_exact(bitmap_len).map_err(malformed)?.to_vec();
                Resource::NSEC(Nsec {
                    next_domain,
                    type_bitmap,
                })
            }
            Type::HINFO => Resource::HINFO(Hinfo {
                cpu: reader.read_string().map_err(malformed)?,
                os: reader.read_string().map_err(malformed)?,
            }),
            other @ (Type::ANY | Type::Unknown(_)) => Resource::Unknown {
                r#type: other,
                rdata: reader.read_exact(len).map_err(malformed)?.to_vec(),
            },
        })
    }

    /// Writes RDATA into a length-prefixed scope (spec.md §4.1
    /// push/pop), returning the scope's contents via `writer`.
    pub fn write_data(&self, writer: &mut Writer) -> Result<(), Error> {
        let write = |r: std::io::Result<()>| r.map_err(|e| Error::MalformedMessage(e.to_string()));

        match self {
            Resource::A(ip) => writer.write_ipv4(ip),
            Resource::AAAA(ip) => writer.write_ipv6(ip),
            Resource::CNAME(n) | Resource::NS(n) | Resource::PTR(n) => {
                write(writer.write_name(n))?
            }
            Resource::TXT(strings) => {
                if strings.is_empty() {
                    write(writer.write_string(b""))?;
                }
                for s in strings {
                    write(writer.write_string(s))?;
                }
            }
            Resource::MX(mx) => {
                writer.write_u16(mx.preference);
                write(writer.write_name(&mx.exchange))?;
            }
            Resource::SOA(soa) => {
                write(writer.write_name(&soa.mname))?;
                write(writer.write_name(&soa.rname))?;
                writer.write_u32(soa.serial);
                writer.write_u32(soa.refresh);
                writer.write_u32(soa.retry);
                writer.write_u32(soa.expire);
                writer.write_u32(soa.minimum);
            }
            Resource::SRV(srv) => {
                writer.write_u16(srv.priority);
                writer.write_u16(srv.weight);
                writer.write_u16(srv.port);
                write(writer.write_name(&srv.target))?;
            }
            Resource::NSEC(nsec) => {
                write(writer.write_name(&nsec.next_domain))?;
                writer.write_bytes(&nsec.type_bitmap);
            }
            Resource::HINFO(hinfo) => {
                write(writer.write_string(&hinfo.cpu))?;
                write(writer.write_string(&hinfo.os))?;
            }
            Resource::Unknown { rdata, .. } => writer.write_bytes(rdata),
        }

        Ok(())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resource::A(ip) => write!(f, "{}", ip),
            Resource::AAAA(ip) => write!(f, "{}", ip),
            Resource::CNAME(n) | Resource::NS(n) | Resource::PTR(n) => write!(f, "{}", n),
            Resource::TXT(strings) => {
                let parts: Vec<String> = strings
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                write!(f, "\"{}\"", parts.join(" "))
            }
            Resource::MX(mx) => write!(f, "{} {}", mx.preference, mx.exchange),
            Resource::SOA(soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            Resource::SRV(srv) => {
                write!(f, "{} {} {} {}", srv.priority, srv.weight, srv.port, srv.target)
            }
            Resource::NSEC(nsec) => write!(f, "{} (...)", nsec.next_domain),
            Resource::HINFO(hinfo) => write!(
                f,
                "\"{}\" \"{}\"",
                String::from_utf8_lossy(&hinfo.cpu),
                String::from_utf8_lossy(&hinfo.os)
            ),
            Resource::Unknown { r#type, rdata } => write!(f, "\\# {} {}", r#type, rdata.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Writer;

    fn round_trip(r: &Resource, class: Class) -> Resource {
        let mut w = Writer::new();
        r.write_data(&mut w).unwrap();
        let buf = w.into_vec();
        let mut reader = Reader::new(&buf);
        Resource::read_data(r.r#type(), class, &mut reader, buf.len()).unwrap()
    }

    #[test]
    fn a_round_trips() {
        let r = Resource::A(Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(round_trip(&r, Class::Internet), r);
    }

    #[test]
    fn srv_round_trips() {
        let r = Resource::SRV(Srv {
            priority: 0,
            weight: 0,
            port: 1024,
            target: Name::parse("host.local"),
        });
        assert_eq!(round_trip(&r, Class::Internet), r);
    }

    #[test]
    fn txt_round_trips_multiple_strings() {
        let r = Resource::TXT(vec![b"txtvers=1".to_vec(), b"a=b".to_vec()]);
        assert_eq!(round_trip(&r, Class::Internet), r);
    }

    #[test]
    fn hinfo_round_trips() {
        let r = Resource::HINFO(Hinfo {
            cpu: b"ARM".to_vec(),
            os: b"LINUX".to_vec(),
        });
        assert_eq!(round_trip(&r, Class::Internet), r);
    }

    #[test]
    fn unknown_type_round_trips_opaquely() {
        let r = Resource::Unknown {
            r#type: Type::Unknown(999),
            rdata: vec![1, 2, 3, 4],
        };
        assert_eq!(round_trip(&r, Class::Internet), r);
    }
}
