use crate::shared::dns;
use crate::sinkhole::handlers::PolicyHandler;
use crate::sinkhole::template::RecordTemplate;
use crate::sinkhole::trie::DomainTrie;
use crate::sinkhole::verdict::*;
use std::sync::{Arc, RwLock};

/// The blacklist policy: questions for sinkholed zones are answered with
/// records synthesized from the zone's templates, never reaching the real
/// name system. Beyond the answer itself, the response fabricates an NS
/// authority record and the A glue of the sinkhole nameserver, so clients
/// chasing the delegation land back here. Questions for other zones are
/// ignored.
pub struct BlacklistHandler {
    trie: Arc<RwLock<DomainTrie>>,
}

impl BlacklistHandler {
    pub fn new(trie: Arc<RwLock<DomainTrie>>) -> Self {
        BlacklistHandler { trie }
    }
}

impl PolicyHandler for BlacklistHandler {
    fn name(&self) -> &'static str {
        "blacklist"
    }

    fn handle(&self, question: &dns::Question) -> Verdict {
        let trie = self.trie.read().unwrap();
        let zone_key = match trie.find_ancestor(&question.node) {
            None => return Verdict::Ignore,
            Some(v) => v,
        };
        let templates = match trie.lookup_data(&zone_key) {
            None => {
                log::error!("Blacklist key '{}' carries no record templates.", zone_key);
                return Verdict::Failure(dns::RespCode::ServFail);
            }
            Some(v) => v,
        };

        // The zone is sinkholed but has no record of the requested type:
        // answer nx_domain, as a real zone would.
        let answer_template = match templates.get(&question.record_type) {
            None => return Verdict::Answer(Sections::empty(dns::RespCode::NxDomain)),
            Some(v) => v,
        };
        let answer = answer_template.materialize(&question.node);

        let ns_template = match templates.get(&dns::RecordType::NS) {
            None => {
                log::error!("Blacklist zone '{}' is missing the NS template.", zone_key);
                return Verdict::Failure(dns::RespCode::ServFail);
            }
            Some(v) => v,
        };

        // The authority owner is the matched zone with the wildcard label
        // stripped, so no literal asterisk reaches the wire.
        let zone_node = match dns::Name::from_string(zone_key.strip_prefix("*.").unwrap_or(&zone_key)) {
            Err(err) => {
                log::error!("Invalid blacklist key '{}': {:?}", zone_key, err);
                return Verdict::Failure(dns::RespCode::ServFail);
            }
            Ok(v) => v,
        };
        let authority = ns_template.materialize(&zone_node);
        let additionals = sinkhole_glue(&trie, ns_template);

        Verdict::Answer(Sections {
            resp_code: dns::RespCode::NoError,
            answers: vec![answer],
            authorities: vec![authority],
            additionals,
            flags: RespFlags::default(),
        })
    }
}

// The glue pointing clients back at us. The sinkhole nameserver lives
// inside a sinkholed zone itself (enforced at configuration load), so its
// address template is found running the nameserver name through the same
// trie that matched the question.
fn sinkhole_glue(trie: &DomainTrie, ns_template: &RecordTemplate) -> Vec<dns::Record> {
    let ns_target = match ns_template.ns_target() {
        None => return vec![],
        Some(v) => v,
    };
    let ns_zone_key = match trie.find_ancestor(ns_target) {
        None => {
            log::warn!("Sinkhole nameserver '{}' not covered by any blacklisted zone.", ns_target);
            return vec![];
        }
        Some(v) => v,
    };
    let a_template = trie
        .lookup_data(&ns_zone_key)
        .and_then(|templates| templates.get(&dns::RecordType::A).cloned());
    match a_template {
        None => {
            log::warn!(
                "Zone '{}' of sinkhole nameserver '{}' has no A template.",
                ns_zone_key,
                ns_target
            );
            vec![]
        }
        Some(template) => vec![template.materialize(ns_target)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinkhole::testing::*;

    // The reference blacklist: 'dyndns.org' sinkholed, with the sinkhole
    // nameserver zone carrying its own A template.
    fn blacklist() -> BlacklistHandler {
        let mut trie = DomainTrie::new();
        trie.add_with(
            "dyndns.org",
            Some(zone_templates(&[
                "* 86400 IN A 10.1.2.3",
                "* 86400 IN NS ns.sinkhole.example.com",
                "* 3600 IN SOA ns.sinkhole.example.com hostmaster.example.com 1 10800 3600 604800 3600",
            ])),
        )
        .unwrap();
        trie.add_with(
            "ns.sinkhole.example.com",
            Some(zone_templates(&[
                "* 86400 IN A 10.1.2.3",
                "* 86400 IN NS ns.sinkhole.example.com",
            ])),
        )
        .unwrap();
        BlacklistHandler::new(Arc::new(RwLock::new(trie)))
    }

    fn answer_of(verdict: Verdict) -> Sections {
        match verdict {
            Verdict::Answer(s) => s,
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn unlisted_zone_is_ignored() {
        let handler = blacklist();
        let verdict = handler.handle(&question("mtfnpy.org", dns::RecordType::A));
        assert!(matches!(verdict, Verdict::Ignore));
    }

    #[test]
    fn subdomain_answer_is_synthesized_with_glue() {
        let handler = blacklist();
        let sections = answer_of(handler.handle(&question("mtfnpy.dyndns.org", dns::RecordType::A)));

        assert_eq!(sections.resp_code, dns::RespCode::NoError);
        assert_eq!(sections.answers, vec![a_record("mtfnpy.dyndns.org", "10.1.2.3")]);
        assert_eq!(
            sections.authorities,
            vec![ns_record("dyndns.org", "ns.sinkhole.example.com")]
        );
        assert_eq!(
            sections.additionals,
            vec![a_record("ns.sinkhole.example.com", "10.1.2.3")]
        );
    }

    #[test]
    fn zone_apex_answer_owner_is_the_zone() {
        let handler = blacklist();
        let sections = answer_of(handler.handle(&question("dyndns.org", dns::RecordType::A)));
        assert_eq!(sections.answers, vec![a_record("dyndns.org", "10.1.2.3")]);
        assert_eq!(
            sections.authorities,
            vec![ns_record("dyndns.org", "ns.sinkhole.example.com")]
        );
    }

    #[test]
    fn ns_question_is_answered_from_the_ns_template() {
        let handler = blacklist();
        let sections = answer_of(handler.handle(&question("dyndns.org", dns::RecordType::NS)));
        assert_eq!(
            sections.answers,
            vec![ns_record("dyndns.org", "ns.sinkhole.example.com")]
        );
        assert_eq!(
            sections.authorities,
            vec![ns_record("dyndns.org", "ns.sinkhole.example.com")]
        );
        assert_eq!(
            sections.additionals,
            vec![a_record("ns.sinkhole.example.com", "10.1.2.3")]
        );
    }

    #[test]
    fn soa_question_is_answered_from_the_soa_template() {
        let handler = blacklist();
        let sections = answer_of(handler.handle(&question("host.dyndns.org", dns::RecordType::SOA)));
        assert_eq!(sections.answers.len(), 1);
        assert_eq!(sections.answers[0].record_type(), dns::RecordType::SOA);
        assert_eq!(sections.answers[0].node(), &name("host.dyndns.org"));
    }

    #[test]
    fn missing_record_type_yields_nx_domain() {
        let handler = blacklist();
        let sections = answer_of(handler.handle(&question("host.dyndns.org", dns::RecordType::MX)));
        assert_eq!(sections.resp_code, dns::RespCode::NxDomain);
        assert!(sections.answers.is_empty());
        assert!(sections.authorities.is_empty());
    }

    #[test]
    fn missing_ns_template_is_a_server_failure() {
        let mut trie = DomainTrie::new();
        trie.add_with("broken.org", Some(zone_templates(&["* 60 IN A 10.0.0.1"]))).unwrap();
        let handler = BlacklistHandler::new(Arc::new(RwLock::new(trie)));

        let verdict = handler.handle(&question("host.broken.org", dns::RecordType::A));
        assert!(matches!(verdict, Verdict::Failure(dns::RespCode::ServFail)));
    }

    #[test]
    fn uncovered_sinkhole_nameserver_omits_glue() {
        let mut trie = DomainTrie::new();
        trie.add_with(
            "lonely.org",
            Some(zone_templates(&["* 60 IN A 10.0.0.1", "* 60 IN NS ns.elsewhere.net"])),
        )
        .unwrap();
        let handler = BlacklistHandler::new(Arc::new(RwLock::new(trie)));

        let sections = answer_of(handler.handle(&question("host.lonely.org", dns::RecordType::A)));
        assert_eq!(sections.answers.len(), 1);
        assert_eq!(sections.authorities.len(), 1);
        assert!(sections.additionals.is_empty());
    }
}
