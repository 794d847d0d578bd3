use crate::shared::dns;
use crate::sinkhole::handlers::PolicyHandler;
use crate::sinkhole::trie::DomainTrie;
use crate::sinkhole::upstream::UpstreamResolver;
use crate::sinkhole::verdict::*;
use std::sync::{Arc, RwLock};

/// The whitelist policy: questions for zones listed here are resolved
/// through the real upstream recursion, but only the answer section is
/// relayed. The authority and additional sections are dropped on purpose
/// so clients cannot learn the real nameservers of a whitelisted zone and
/// bypass the server. Questions for other zones are ignored.
pub struct WhitelistHandler {
    trie: Arc<RwLock<DomainTrie>>,
    upstream: Arc<dyn UpstreamResolver>,
}

impl WhitelistHandler {
    pub fn new(trie: Arc<RwLock<DomainTrie>>, upstream: Arc<dyn UpstreamResolver>) -> Self {
        WhitelistHandler { trie, upstream }
    }
}

impl PolicyHandler for WhitelistHandler {
    fn name(&self) -> &'static str {
        "whitelist"
    }

    fn handle(&self, question: &dns::Question) -> Verdict {
        let matched = self.trie.read().unwrap().find_ancestor(&question.node);
        let matched = match matched {
            None => return Verdict::Ignore,
            Some(v) => v,
        };

        log::debug!("Whitelist key '{}' matches '{}'.", matched, question.node);
        match self.upstream.query(question) {
            Err(err) => {
                // A whitelisted domain failing upstream is our failure
                // to report, not a question to pass along the chain.
                log::warn!("Upstream failed for whitelisted '{}': {:?}", question.node, err);
                Verdict::Failure(dns::RespCode::ServFail)
            }
            Ok(resp) => Verdict::Answer(Sections {
                resp_code: resp.header.resp_code,
                answers: resp.answers,
                authorities: vec![],
                additionals: vec![],
                flags: RespFlags {
                    recursion_available: true,
                    ..RespFlags::default()
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinkhole::testing::*;

    fn whitelist(zones: &[&str], upstream: StubUpstream) -> WhitelistHandler {
        let mut trie = DomainTrie::new();
        for zone in zones {
            trie.add(zone).unwrap();
        }
        WhitelistHandler::new(Arc::new(RwLock::new(trie)), Arc::new(upstream))
    }

    #[test]
    fn unlisted_zone_is_ignored() {
        let upstream = StubUpstream::new();
        let handler = whitelist(&["microsoft.com"], upstream);
        let verdict = handler.handle(&question("example.org", dns::RecordType::A));
        assert!(matches!(verdict, Verdict::Ignore));
    }

    #[test]
    fn listed_zone_is_resolved_without_glue() {
        let answer = a_record("www.microsoft.com", "1.2.3.4");
        let resp = response(
            vec![answer.clone()],
            vec![ns_record("microsoft.com", "ns1.msft.net")],
            vec![a_record("ns1.msft.net", "5.6.7.8")],
        );
        let upstream = StubUpstream::new().respond("www.microsoft.com.", resp);
        let handler = whitelist(&["microsoft.com"], upstream);

        let verdict = handler.handle(&question("www.microsoft.com", dns::RecordType::A));
        let sections = match verdict {
            Verdict::Answer(s) => s,
            other => panic!("unexpected verdict: {:?}", other),
        };
        assert_eq!(sections.resp_code, dns::RespCode::NoError);
        assert_eq!(sections.answers, vec![answer]);
        assert!(sections.authorities.is_empty());
        assert!(sections.additionals.is_empty());
        assert!(sections.flags.recursion_available);
    }

    #[test]
    fn upstream_rcode_is_relayed() {
        let mut resp = response(vec![], vec![], vec![]);
        resp.header.resp_code = dns::RespCode::NxDomain;
        let upstream = StubUpstream::new().respond("gone.microsoft.com.", resp);
        let handler = whitelist(&["microsoft.com"], upstream);

        let verdict = handler.handle(&question("gone.microsoft.com", dns::RecordType::A));
        match verdict {
            Verdict::Answer(s) => assert_eq!(s.resp_code, dns::RespCode::NxDomain),
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn upstream_failure_is_serv_fail_not_ignore() {
        let handler = whitelist(&["microsoft.com"], StubUpstream::failing());
        let verdict = handler.handle(&question("www.microsoft.com", dns::RecordType::A));
        assert!(matches!(verdict, Verdict::Failure(dns::RespCode::ServFail)));
    }
}
