//! Resolves questions against a `Catalog` (spec.md §4.6).
//!
//! Pure function over `&Catalog`, no socket access — mirrors the
//! teacher's separation of wire parsing (`dns.rs`) from RR types
//! (`types.rs`): here `NameServer` depends only on `Catalog` and `types`,
//! never on `transport`/`service`.

use crate::catalog::Catalog;
use crate::name::Name;
use crate::resource::Resource;
use crate::types::{Message, Question, Rcode, Type, RR};

/// Resolves questions against an owned catalog (spec.md §4.7 "owns a
/// `NameServer` (C6) with an empty catalog").
#[derive(Default)]
pub struct NameServer {
    pub catalog: Catalog,
}

impl NameServer {
    pub fn new() -> NameServer {
        NameServer::default()
    }

    /// Builds the response to `request`, per spec.md §4.6:
    /// - `ANY` pulls every RRset under the name; a typed query pulls only
    ///   the matching type, following one level of CNAME if there's no
    ///   direct hit.
    /// - If `answer_all_questions`, additional records are appended for
    ///   every SRV target (A/AAAA) and PTR target (SRV/TXT), deduplicated.
    /// - `AA=1`, `QR=1`; `status=NoError` if any answer was found, else
    ///   `NXDomain` (mDNS callers are expected to suppress this on the
    ///   wire per spec.md §4.6).
    pub fn resolve(&self, request: &Message, answer_all_questions: bool) -> Message {
        let mut response = Message {
            id: request.id,
            ..Message::new_answer()
        };
        response.aa = true;

        for question in &request.questions {
            response.answers.extend(self.answer_question(question));
        }

        if answer_all_questions {
            let additionals = self.additional_records(&response.answers);
            for rr in additionals {
                if !response.answers.contains(&rr) && !response.additionals.contains(&rr) {
                    response.additionals.push(rr);
                }
            }
        }

        response.rcode = if response.answers.is_empty() {
            Rcode::NXDomain
        } else {
            Rcode::NoError
        };

        response
    }

    fn answer_question(&self, question: &Question) -> Vec<RR> {
        let mut out = Vec::new();
        self.collect_for_name(&question.name, question.r#type, &mut out, true);
        out
    }

    fn collect_for_name(&self, name: &Name, r#type: Type, out: &mut Vec<RR>, follow_cname: bool) {
        let rrsets = self.catalog.iter(name);
        let mut found_direct = false;

        for rrset in &rrsets {
            let matches = r#type == Type::ANY
                || rrset.records.first().map(|r| r.r#type()) == Some(r#type);
            if matches {
                out.extend(rrset.records.iter().cloned());
                found_direct = true;
            }
        }

        if !found_direct && r#type != Type::ANY && follow_cname {
            for rrset in &rrsets {
                for rr in &rrset.records {
                    if let Resource::CNAME(target) = &rr.resource {
                        out.push(rr.clone());
                        self.collect_for_name(target, r#type, out, false);
                    }
                }
            }
        }
    }

    /// Appends SRV-target A/AAAA and PTR-target SRV/TXT as additionals
    /// (spec.md §4.6 point 3).
    fn additional_records(&self, answers: &[RR]) -> Vec<RR> {
        let mut out = Vec::new();

        for rr in answers {
            match &rr.resource {
                Resource::SRV(srv) => {
                    self.collect_for_name(&srv.target, Type::A, &mut out, false);
                    self.collect_for_name(&srv.target, Type::AAAA, &mut out, false);
                }
                Resource::PTR(target) => {
                    self.collect_for_name(target, Type::SRV, &mut out, false);
                    self.collect_for_name(target, Type::TXT, &mut out, false);
                }
                _ => {}
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Class, Question};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn a_record(name: &str) -> RR {
        RR {
            name: Name::parse(name),
            class: Class::Internet,
            cache_flush: true,
            ttl: Duration::from_secs(120),
            resource: Resource::A(Ipv4Addr::new(10, 0, 0, 5)),
        }
    }

    #[test]
    fn any_query_returns_all_rrsets() {
        let ns = NameServer::new();
        ns.catalog.add(a_record("host.local"), true);

        let mut req = Message::new_query();
        req.questions
            .push(Question::new(Name::parse("host.local"), Type::ANY, Class::Internet));

        let resp = ns.resolve(&req, false);
        assert_eq!(resp.answers.len(), 1);
        assert_eq!(resp.rcode, Rcode::NoError);
    }

    #[test]
    fn missing_name_is_nxdomain() {
        let ns = NameServer::new();
        let mut req = Message::new_query();
        req.questions
            .push(Question::new(Name::parse("ghost.local"), Type::A, Class::Internet));

        let resp = ns.resolve(&req, false);
        assert!(resp.answers.is_empty());
        assert_eq!(resp.rcode, Rcode::NXDomain);
    }

    #[test]
    fn cname_is_followed_when_no_direct_hit() {
        let ns = NameServer::new();
        ns.catalog.add(
            RR {
                name: Name::parse("alias.local"),
                class: Class::Internet,
                cache_flush: true,
                ttl: Duration::from_secs(120),
                resource: Resource::CNAME(Name::parse("host.local")),
            },
            true,
        );
        ns.catalog.add(a_record("host.local"), true);

        let mut req = Message::new_query();
        req.questions
            .push(Question::new(Name::parse("alias.local"), Type::A, Class::Internet));

        let resp = ns.resolve(&req, false);
        assert_eq!(resp.answers.len(), 2);
    }
}
