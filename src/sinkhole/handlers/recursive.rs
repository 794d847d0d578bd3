use crate::shared::dns;
use crate::sinkhole::handlers::PolicyHandler;
use crate::sinkhole::upstream::UpstreamResolver;
use crate::sinkhole::verdict::*;
use std::sync::Arc;

/// The fallback policy: every question is forwarded to the upstream
/// recursion and the full four-section response is relayed. This handler
/// never ignores a question, so it terminates the chain wherever it is
/// placed.
pub struct RecursiveHandler {
    upstream: Arc<dyn UpstreamResolver>,
}

impl RecursiveHandler {
    pub fn new(upstream: Arc<dyn UpstreamResolver>) -> Self {
        RecursiveHandler { upstream }
    }
}

impl PolicyHandler for RecursiveHandler {
    fn name(&self) -> &'static str {
        "recursive"
    }

    fn handle(&self, question: &dns::Question) -> Verdict {
        match self.upstream.query(question) {
            Err(err) => {
                log::warn!("Upstream recursion failed for '{}': {:?}", question.node, err);
                Verdict::Failure(dns::RespCode::ServFail)
            }
            Ok(resp) => Verdict::Answer(Sections {
                resp_code: resp.header.resp_code,
                answers: resp.answers,
                authorities: resp.authorities,
                additionals: resp.additionals,
                flags: RespFlags {
                    auth_answer: resp.header.auth_answer,
                    recursion_available: resp.header.recursion_available,
                    authentic_data: resp.header.authentic_data,
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinkhole::testing::*;

    #[test]
    fn full_response_is_relayed() {
        let resp = response(
            vec![a_record("mtfnpy.org", "93.184.216.34")],
            vec![ns_record("mtfnpy.org", "ns1.provider.net")],
            vec![a_record("ns1.provider.net", "198.51.100.7")],
        );
        let upstream = StubUpstream::new().respond("mtfnpy.org.", resp);
        let handler = RecursiveHandler::new(Arc::new(upstream));

        let verdict = handler.handle(&question("mtfnpy.org", dns::RecordType::A));
        let sections = match verdict {
            Verdict::Answer(s) => s,
            other => panic!("unexpected verdict: {:?}", other),
        };
        assert_eq!(sections.answers.len(), 1);
        assert_eq!(sections.authorities.len(), 1);
        assert_eq!(sections.additionals.len(), 1);
    }

    #[test]
    fn upstream_failure_is_serv_fail() {
        let handler = RecursiveHandler::new(Arc::new(StubUpstream::failing()));
        let verdict = handler.handle(&question("mtfnpy.org", dns::RecordType::A));
        assert!(matches!(verdict, Verdict::Failure(dns::RespCode::ServFail)));
    }
}
