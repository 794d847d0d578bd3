use crate::shared::dns;
use crate::sinkhole::template::{RecordTemplate, ZoneTemplates};
use crate::sinkhole::upstream::{UpstreamErr, UpstreamResolver};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::{thread, time};

/// An in-memory upstream resolver for tests: canned responses per node,
/// optional hard failures and an optional artificial delay. Records the
/// questions it receives so tests can assert how often recursion ran.
pub(crate) struct StubUpstream {
    responses: HashMap<String, dns::Message>,
    fail: bool,
    delay: Option<time::Duration>,
    pub queries: Mutex<Vec<dns::Question>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        StubUpstream {
            responses: HashMap::new(),
            fail: false,
            delay: None,
            queries: Mutex::new(vec![]),
        }
    }

    pub fn failing() -> Self {
        StubUpstream {
            fail: true,
            ..StubUpstream::new()
        }
    }

    pub fn respond(mut self, node: &str, message: dns::Message) -> Self {
        self.responses.insert(node.to_string(), message);
        self
    }

    pub fn with_delay(mut self, delay: time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl UpstreamResolver for StubUpstream {
    fn query(&self, question: &dns::Question) -> Result<dns::Message, UpstreamErr> {
        self.queries.lock().unwrap().push(question.clone());
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.fail {
            return Err(UpstreamErr::Timeout);
        }
        match self.responses.get(question.node.as_ref()) {
            Some(message) => Ok(message.clone()),
            None => {
                let mut message = response(vec![], vec![], vec![]);
                message.header.resp_code = dns::RespCode::NxDomain;
                Ok(message)
            }
        }
    }
}

pub(crate) fn name(s: &str) -> dns::Name {
    dns::Name::from_string(s).unwrap()
}

pub(crate) fn question(node: &str, record_type: dns::RecordType) -> dns::Question {
    dns::Question {
        node: name(node),
        record_type,
        class: dns::Class::IN,
    }
}

pub(crate) fn a_record(node: &str, address: &str) -> dns::Record {
    dns::Record::A {
        node: name(node),
        class: dns::Class::IN,
        ttl: 86400,
        address: address.parse().unwrap(),
    }
}

pub(crate) fn ns_record(zone: &str, ns: &str) -> dns::Record {
    dns::Record::NS {
        node: name(zone),
        class: dns::Class::IN,
        ttl: 86400,
        name: name(ns),
    }
}

pub(crate) fn soa_record(zone: &str, mname: &str) -> dns::Record {
    dns::Record::SOA {
        node: name(zone),
        class: dns::Class::IN,
        ttl: 3600,
        ns_name: name(mname),
        mail_name: name(&format!("hostmaster.{}", zone)),
        serial: 1,
        refresh: 10800,
        retry: 3600,
        expire: 604800,
        minimum: 3600,
    }
}

/// An upstream-like response message with the passed sections.
pub(crate) fn response(
    answers: Vec<dns::Record>,
    authorities: Vec<dns::Record>,
    additionals: Vec<dns::Record>,
) -> dns::Message {
    let mut header = dns::Header::default();
    header.query_resp = true;
    header.recursion_available = true;
    header.answers_count = answers.len() as u16;
    header.authorities_count = authorities.len() as u16;
    header.additionals_count = additionals.len() as u16;
    dns::Message {
        header,
        questions: vec![],
        answers,
        authorities,
        additionals,
    }
}

pub(crate) fn zone_templates(lines: &[&str]) -> ZoneTemplates {
    let map: HashMap<_, _> = lines
        .iter()
        .map(|line| RecordTemplate::parse(line).unwrap())
        .map(|template| (template.record_type(), template))
        .collect();
    Arc::new(map)
}
