//! `dig`-style `Display` impls for messages and questions (teacher:
//! `display.rs`). `Resource`'s `Display` lives in `resource.rs` alongside
//! its codec, since every variant it prints is defined there.
//!
//! Unlike the teacher, there is no EDNS pseudosection or query-timing
//! `Stats` to print: this crate's `Message` carries neither (spec.md §3
//! defines no OPT record and no client-side timing), so `fmt_header`
//! reports only the header line, flags, and section counts.

use crate::types::{Message, Question, RR};
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_header(f)?;

        writeln!(f, ";; QUESTION SECTION:")?;
        for question in &self.questions {
            question.fmt(f)?;
        }
        writeln!(f)?;

        if !self.answers.is_empty() {
            writeln!(f, "; ANSWER SECTION:")?;
            for rr in &self.answers {
                rr.fmt(f)?;
            }
            writeln!(f)?;
        }

        if !self.authorities.is_empty() {
            writeln!(f, "; AUTHORITY SECTION:")?;
            for rr in &self.authorities {
                rr.fmt(f)?;
            }
            writeln!(f)?;
        }

        if !self.additionals.is_empty() {
            writeln!(f, "; ADDITIONAL SECTION:")?;
            for rr in &self.additionals {
                rr.fmt(f)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl Message {
    fn fmt_header(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            ";; ->>HEADER<<- opcode: {opcode}, status: {rcode}, id: {id}",
            opcode = self.opcode,
            rcode = self.rcode,
            id = self.id,
        )?;

        let mut flags = String::new();
        if self.qr.to_bool() {
            flags.push_str(" qr");
        }
        if self.aa {
            flags.push_str(" aa");
        }
        if self.tc {
            flags.push_str(" tc");
        }
        if self.rd {
            flags.push_str(" rd");
        }
        if self.ra {
            flags.push_str(" ra");
        }

        writeln!(
            f,
            ";; flags:{flags}; QUERY: {qd}, ANSWER: {an}, AUTHORITY: {ns}, ADDITIONAL: {ar}",
            flags = flags,
            qd = self.questions.len(),
            an = self.answers.len(),
            ns = self.authorities.len(),
            ar = self.additionals.len(),
        )?;

        writeln!(f)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let unicast = if self.unicast_response { " QU" } else { "" };
        writeln!(
            f,
            "; {name:<18}      {class:4} {type:6}{unicast}",
            name = self.name,
            class = self.class,
            r#type = self.r#type,
        )
    }
}

impl fmt::Display for RR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let flush = if self.cache_flush { " (flush)" } else { "" };
        writeln!(
            f,
            "{name:<20} {ttl:>4} {class:4} {type:6} {resource}{flush}",
            name = self.name,
            ttl = self.ttl.as_secs(),
            class = self.class,
            r#type = self.r#type(),
            resource = self.resource,
        )
    }
}
