//! Message-level encode/decode and truncation (spec.md §3, §4.1).
//!
//! Grounded on the teacher's `MessageParser`/`Message::to_vec` split in
//! `dns.rs`: a parser struct walks the header counts and the four
//! sections in order, and a mirrored writer emits them back. Unlike the
//! teacher, which only implemented encoding for an empty answer/
//! authority/additional set ("TODO Implement answers, etc types" /
//! `assert!(self.answers.is_empty())`), this version encodes every
//! section, since an mDNS answer is mostly RRs.

use crate::errors::Error;
use crate::io::{Reader, Writer};
use crate::types::{Class, Message, Opcode, QR, Question, Rcode, RR};
use std::time::Duration;

const FLAG_QR: u8 = 0b1000_0000;
const FLAG_AA: u8 = 0b0000_0100;
const FLAG_TC: u8 = 0b0000_0010;
const FLAG_RD: u8 = 0b0000_0001;
const FLAG_RA: u8 = 0b1000_0000;
const FLAG_Z: u8 = 0b0100_0000;

impl Message {
    /// Decodes a full DNS message, per spec.md §4.1's reader contract:
    /// malformed input (premature EOF, oversize label, pointer cycle,
    /// RDATA length mismatch, unterminated name) is reported as
    /// `Error::MalformedMessage`.
    pub fn from_slice(buf: &[u8]) -> Result<Message, Error> {
        let malformed = |e: std::io::Error| Error::MalformedMessage(e.to_string());

        let mut r = Reader::new(buf);

        let id = r.read_u16().map_err(malformed)?;
        let b0 = r.read_u8().map_err(malformed)?;
        let qr = QR::from_bool(b0 & FLAG_QR != 0);
        let opcode_raw = (b0 >> 3) & 0x0f;
        let opcode = num_traits::FromPrimitive::from_u8(opcode_raw)
            .ok_or_else(|| Error::MalformedMessage(format!("invalid opcode {}", opcode_raw)))?;
        let aa = b0 & FLAG_AA != 0;
        let tc = b0 & FLAG_TC != 0;
        let rd = b0 & FLAG_RD != 0;

        let b1 = r.read_u8().map_err(malformed)?;
        let ra = b1 & FLAG_RA != 0;
        let z = b1 & FLAG_Z != 0;
        let rcode_raw = b1 & 0x0f;
        let rcode = num_traits::FromPrimitive::from_u8(rcode_raw)
            .ok_or_else(|| Error::MalformedMessage(format!("invalid rcode {}", rcode_raw)))?;

        let qd_count = r.read_u16().map_err(malformed)?;
        let an_count = r.read_u16().map_err(malformed)?;
        let ns_count = r.read_u16().map_err(malformed)?;
        let ar_count = r.read_u16().map_err(malformed)?;

        let mut questions = Vec::with_capacity(qd_count as usize);
        for _ in 0..qd_count {
            let name = r.read_name().map_err(malformed)?;
            let r#type = r.read_type().map_err(malformed)?;
            let (class, unicast_response) = r.read_class().map_err(malformed)?;
            questions.push(Question {
                name,
                r#type,
                class,
                unicast_response,
            });
        }

        let mut answers = Vec::with_capacity(an_count as usize);
        read_rrs(&mut r, an_count, &mut answers)?;
        let mut authorities = Vec::with_capacity(ns_count as usize);
        read_rrs(&mut r, ns_count, &mut authorities)?;
        let mut additionals = Vec::with_capacity(ar_count as usize);
        read_rrs(&mut r, ar_count, &mut additionals)?;

        Ok(Message {
            id,
            qr,
            opcode,
            aa,
            tc,
            rd,
            ra,
            z,
            rcode,
            questions,
            answers,
            authorities,
            additionals,
        })
    }

    /// Encodes this message. Fails only on encode-time invariant
    /// violations (an over-length label); size-limit enforcement against
    /// `max_packet` is the caller's job (`MulticastService::send_query`/
    /// `send_answer`, spec.md §4.5), not the codec's.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let malformed = |e: std::io::Error| Error::MalformedMessage(e.to_string());
        let mut w = Writer::new();

        w.write_u16(self.id);

        let mut b0 = 0u8;
        if self.qr.to_bool() {
            b0 |= FLAG_QR;
        }
        b0 |= ((self.opcode as u8) << 3) & 0b0111_1000;
        if self.aa {
            b0 |= FLAG_AA;
        }
        if self.tc {
            b0 |= FLAG_TC;
        }
        if self.rd {
            b0 |= FLAG_RD;
        }
        w.write_u8(b0);

        let mut b1 = 0u8;
        if self.ra {
            b1 |= FLAG_RA;
        }
        if self.z {
            b1 |= FLAG_Z;
        }
        b1 |= (self.rcode as u8) & 0x0f;
        w.write_u8(b1);

        w.write_u16(self.questions.len() as u16);
        w.write_u16(self.answers.len() as u16);
        w.write_u16(self.authorities.len() as u16);
        w.write_u16(self.additionals.len() as u16);

        for q in &self.questions {
            w.write_name(&q.name).map_err(malformed)?;
            w.write_u16(q.r#type.to_u16());
            let class = q.class as u16 | if q.unicast_response { 0x8000 } else { 0 };
            w.write_u16(class);
        }

        for rr in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additionals)
        {
            write_rr(&mut w, rr)?;
        }

        Ok(w.into_vec())
    }

    /// Implements spec.md §4.1's truncate operation: repeatedly drop
    /// trailing records (additionals, then authorities, then answers)
    /// until the encoded message fits within `max_packet`, setting `TC`
    /// only if answers themselves had to be dropped.
    pub fn truncate(&mut self, max_packet: usize) -> Result<Vec<u8>, Error> {
        loop {
            let encoded = self.to_vec()?;
            if encoded.len() <= max_packet {
                return Ok(encoded);
            }

            if self.additionals.pop().is_some() {
                continue;
            }
            if self.authorities.pop().is_some() {
                continue;
            }
            if self.answers.pop().is_some() {
                self.tc = true;
                continue;
            }

            // Nothing left to drop; return whatever a bare header +
            // questions encodes to, oversize or not.
            return self.to_vec();
        }
    }
}

fn read_rrs(r: &mut Reader, count: u16, out: &mut Vec<RR>) -> Result<(), Error> {
    let malformed = |e: std::io::Error| Error::MalformedMessage(e.to_string());

    for _ in 0..count {
        let name = r.read_name().map_err(malformed)?;
        let r#type = r.read_type().map_err(malformed)?;
        let (class, cache_flush) = r.read_class().map_err(malformed)?;
        let ttl_secs = r.read_u32().map_err(malformed)?;
        let rdlength = r.read_u16().map_err(malformed)? as usize;

        let resource = crate::resource::Resource::read_data(r#type, class, r, rdlength)?;

        out.push(RR {
            name,
            class,
            cache_flush,
            ttl: Duration::from_secs(ttl_secs as u64),
            resource,
        });
    }

    Ok(())
}

fn write_rr(w: &mut Writer, rr: &RR) -> Result<(), Error> {
    let malformed = |e: std::io::Error| Error::MalformedMessage(e.to_string());

    w.write_name(&rr.name).map_err(malformed)?;
    w.write_u16(rr.resource.r#type().to_u16());
    let class = rr.class as u16 | if rr.cache_flush { 0x8000 } else { 0 };
    w.write_u16(class);
    w.write_u32(rr.ttl.as_secs() as u32);

    let marker = w.begin_length_prefixed();
    rr.resource.write_data(w)?;
    w.end_length_prefixed(marker);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;
    use crate::resource::Resource;
    use crate::types::Type;
    use std::net::Ipv4Addr;

    fn sample_message() -> Message {
        let mut m = Message::new_query();
        m.id = 0x1234;
        m.questions.push(Question::new(
            Name::parse("appletv.local"),
            Type::A,
            Class::Internet,
        ));
        m
    }

    #[test]
    fn round_trips_a_query() {
        let m = sample_message();
        let buf = m.to_vec().unwrap();
        let decoded = Message::from_slice(&buf).unwrap();
        assert_eq!(decoded.id, m.id);
        assert_eq!(decoded.questions.len(), 1);
        assert_eq!(decoded.questions[0].name, Name::parse("appletv.local"));
        assert_eq!(decoded.questions[0].r#type, Type::A);
    }

    #[test]
    fn decodes_known_query_bytes() {
        // From spec.md §8 scenario 1.
        let mut buf = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        buf.extend_from_slice(&[7, b'a', b'p', b'p', b'l', b'e', b't', b'v']);
        buf.extend_from_slice(&[5, b'l', b'o', b'c', b'a', b'l']);
        buf.push(0);
        buf.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);

        let m = Message::from_slice(&buf).unwrap();
        assert_eq!(m.id, 0);
        assert_eq!(m.questions.len(), 1);
        assert_eq!(m.questions[0].name, Name::parse("appletv.local"));
        assert_eq!(m.questions[0].r#type, Type::A);
        assert_eq!(m.questions[0].class, Class::Internet);
        assert!(m.answers.is_empty());
        assert!(m.authorities.is_empty());
        assert!(m.additionals.is_empty());
    }

    #[test]
    fn class_high_bit_is_masked_into_a_flag() {
        let mut m = sample_message();
        m.questions[0].unicast_response = true;
        let buf = m.to_vec().unwrap();
        let decoded = Message::from_slice(&buf).unwrap();
        assert_eq!(decoded.questions[0].class, Class::Internet);
        assert!(decoded.questions[0].unicast_response);
    }

    #[test]
    fn answer_round_trips_with_cache_flush_bit() {
        let mut m = Message::new_answer();
        m.answers.push(RR {
            name: Name::parse("appletv.local"),
            class: Class::Internet,
            cache_flush: true,
            ttl: Duration::from_secs(120),
            resource: Resource::A(Ipv4Addr::new(153, 109, 7, 90)),
        });

        let buf = m.to_vec().unwrap();
        let decoded = Message::from_slice(&buf).unwrap();
        assert!(decoded.aa);
        assert_eq!(decoded.id, 0);
        assert!(decoded.answers[0].cache_flush);
        assert_eq!(decoded.answers[0].resource, Resource::A(Ipv4Addr::new(153, 109, 7, 90)));
    }

    #[test]
    fn decodes_response_with_aaaa_and_nsec_additionals() {
        // Mirrors spec.md §8 scenario 2's appletv.local response shape
        // (A answer plus AAAA/NSEC additionals), built through the codec
        // rather than a literal capture since only the decoded shape is
        // specified, not the exact bytes on the wire.
        use crate::resource::Nsec;

        let mut m = Message::new_answer();
        m.answers.push(RR {
            name: Name::parse("appletv.local"),
            class: Class::Internet,
            cache_flush: true,
            ttl: Duration::from_secs(30720),
            resource: Resource::A(Ipv4Addr::new(153, 109, 7, 90)),
        });
        m.additionals.push(RR {
            name: Name::parse("appletv.local"),
            class: Class::Internet,
            cache_flush: true,
            ttl: Duration::from_secs(30720),
            resource: Resource::AAAA("fe80::223:32ff:feb1:2152".parse().unwrap()),
        });
        m.additionals.push(RR {
            name: Name::parse("appletv.local"),
            class: Class::Internet,
            cache_flush: true,
            ttl: Duration::from_secs(30720),
            resource: Resource::NSEC(Nsec {
                next_domain: Name::parse("appletv.local"),
                type_bitmap: vec![0x00, 0x04, 0x40, 0x00, 0x00, 0x08],
            }),
        });

        let buf = m.to_vec().unwrap();
        let decoded = Message::from_slice(&buf).unwrap();

        assert_eq!(
            decoded.answers[0].resource,
            Resource::A(Ipv4Addr::new(153, 109, 7, 90))
        );
        assert_eq!(decoded.answers[0].ttl, Duration::from_secs(30720));
        assert!(decoded.answers[0].cache_flush);
        assert!(decoded.additionals.iter().any(|rr| rr.resource
            == Resource::AAAA("fe80::223:32ff:feb1:2152".parse().unwrap())));
        assert!(decoded
            .additionals
            .iter()
            .any(|rr| matches!(rr.resource, Resource::NSEC(_))));
    }

    #[test]
    fn truncate_sets_tc_only_when_answers_dropped() {
        let mut m = Message::new_answer();
        for i in 0..50u8 {
            m.additionals.push(RR {
                name: Name::parse(&format!("host{}.local", i)),
                class: Class::Internet,
                cache_flush: false,
                ttl: Duration::from_secs(120),
                resource: Resource::A(Ipv4Addr::new(10, 0, 0, i)),
            });
        }
        let big = m.to_vec().unwrap().len();

        let encoded = m.truncate(big / 2).unwrap();
        assert!(encoded.len() <= big);
        assert!(m.additionals.len() < 50);
        // Only additionals were dropped, so TC should not be set.
        assert!(!m.tc);
    }
}
