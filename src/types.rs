//! Message shape and RR type/class registries (spec.md §3, §4.1).
//!
//! Grounded on the teacher's `types.rs`: same `Opcode`/`Rcode`/`QR` shape
//! (`num-derive` `FromPrimitive` + `strum` `Display`/`EnumString`), same
//! `Message`/`Question`/RR split. `Type` departs from the teacher's
//! closed `FromPrimitive`-derived enum because spec.md §3 requires "an
//! open registry for unknowns" — `num_derive::FromPrimitive` cannot
//! target a variant with a payload, so `Type` gets a hand-written
//! `from_u16`/`to_u16` pair instead of the derive.

use crate::resource::Resource;
use std::fmt;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Query/Response bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum QR {
    Query,
    Response,
}

impl QR {
    pub fn from_bool(b: bool) -> QR {
        if b {
            QR::Response
        } else {
            QR::Query
        }
    }

    pub fn to_bool(self) -> bool {
        matches!(self, QR::Response)
    }
}

/// Kind of query. See RFC 1035 §4.1.1.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, Eq, PartialEq)]
#[repr(u8)]
pub enum Opcode {
    Query = 0,
    IQuery = 1,
    Status = 2,
    Notify = 4,
    Update = 5,
}

impl Default for Opcode {
    fn default() -> Self {
        Opcode::Query
    }
}

/// Response code. See RFC 1035 §4.1.1.
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, Eq, PartialEq)]
#[repr(u8)]
pub enum Rcode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NXDomain = 3,
    NotImp = 4,
    Refused = 5,
}

impl Default for Rcode {
    fn default() -> Self {
        Rcode::NoError
    }
}

/// Resource record class. Only `Internet` and `Any` are meaningful on
/// `.local` (spec.md §3); the wire-format high bit (QU/cache-flush) is
/// tracked alongside the class, not folded into it, so equality checks
/// can mask it per spec.md §3/§8 ("Class masking").
#[derive(Copy, Clone, Debug, Display, EnumString, FromPrimitive, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum Class {
    #[strum(serialize = "IN")]
    Internet = 1,

    #[strum(serialize = "*")]
    Any = 255,
}

impl Default for Class {
    fn default() -> Self {
        Class::Internet
    }
}

/// Resource record type. Open registry: unrecognized codes round-trip as
/// `Type::Unknown` (spec.md §3) instead of failing to parse.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Type {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    HINFO,
    MX,
    TXT,
    AAAA,
    SRV,
    NSEC,
    ANY,
    Unknown(u16),
}

impl Type {
    pub fn from_u16(v: u16) -> Type {
        match v {
            1 => Type::A,
            2 => Type::NS,
            5 => Type::CNAME,
            6 => Type::SOA,
            12 => Type::PTR,
            13 => Type::HINFO,
            15 => Type::MX,
            16 => Type::TXT,
            28 => Type::AAAA,
            33 => Type::SRV,
            47 => Type::NSEC,
            255 => Type::ANY,
            other => Type::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Type::A => 1,
            Type::NS => 2,
            Type::CNAME => 5,
            Type::SOA => 6,
            Type::PTR => 12,
            Type::HINFO => 13,
            Type::MX => 15,
            Type::TXT => 16,
            Type::AAAA => 28,
            Type::SRV => 33,
            Type::NSEC => 47,
            Type::ANY => 255,
            Type::Unknown(v) => v,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Unknown(v) => write!(f, "TYPE{}", v),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A question, as carried in `Message::questions` and as the argument to
/// `send_query`.
#[derive(Clone, Debug, PartialEq)]
pub struct Question {
    pub name: crate::name::Name,
    pub r#type: Type,
    pub class: Class,
    /// QU bit: unicast response requested (spec.md §3).
    pub unicast_response: bool,
}

impl Question {
    pub fn new(name: crate::name::Name, r#type: Type, class: Class) -> Question {
        Question {
            name,
            r#type,
            class,
            unicast_response: false,
        }
    }
}

/// A resource record: `(name, type, class, ttl, rdata)` (spec.md §3).
#[derive(Clone, Debug, PartialEq)]
pub struct RR {
    pub name: crate::name::Name,
    pub class: Class,
    /// Cache-flush bit on an answer (spec.md §3); meaningless on a
    /// question.
    pub cache_flush: bool,
    pub ttl: Duration,
    pub resource: Resource,
}

impl RR {
    pub fn r#type(&self) -> Type {
        self.resource.r#type()
    }

    /// True if this RR is a goodbye (TTL 0, spec.md §3/§8).
    pub fn is_goodbye(&self) -> bool {
        self.ttl.is_zero()
    }
}

/// DNS header flags (RFC 1035 §4.1.1), excluding QDCOUNT/ANCOUNT/etc,
/// which are derived from the section lengths when encoding.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: u16,
    pub qr: QR,
    pub opcode: Opcode,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: bool,
    pub rcode: Rcode,

    pub questions: Vec<Question>,
    pub answers: Vec<RR>,
    pub authorities: Vec<RR>,
    pub additionals: Vec<RR>,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            id: 0,
            qr: QR::Query,
            opcode: Opcode::Query,
            aa: false,
            tc: false,
            rd: false,
            ra: false,
            z: false,
            rcode: Rcode::NoError,

            questions: Vec::new(),
            answers: Vec::new(),
            authorities: Vec::new(),
            additionals: Vec::new(),
        }
    }
}

impl Message {
    pub fn new_query() -> Message {
        Message {
            qr: QR::Query,
            ..Message::default()
        }
    }

    /// Builds the canonical shape of an mDNS answer: `AA=1`, `ID=0`, no
    /// questions (spec.md §4.5 "send_answer").
    ///
    /// Per spec.md §9's second open question, `AA` is always set
    /// regardless of caller authority, matching the upstream behaviour
    /// this stack must stay bit-compatible with.
    pub fn new_answer() -> Message {
        Message {
            qr: QR::Response,
            aa: true,
            id: 0,
            ..Message::default()
        }
    }

    pub fn is_query(&self) -> bool {
        self.qr == QR::Query
    }

    pub fn is_response(&self) -> bool {
        self.qr == QR::Response
    }
}
