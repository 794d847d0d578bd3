use crate::shared::dns;
use crate::sinkhole::censor::Censor;
use crate::sinkhole::handlers::HandlerChain;
use crate::sinkhole::verdict::*;
use std::time;

/// Orchestrates one question end-to-end: run the handler chain, censor
/// the resulting authority records, restart the chain once if the
/// censoring learned a new policy entry, and hand back the final record
/// sections. The pipeline always produces sections suitable for a
/// well-formed response, whatever failed along the way.
pub struct QueryPipeline {
    chain: HandlerChain,
    censor: Censor,
    deadline: time::Duration,
}

impl QueryPipeline {
    pub fn new(chain: HandlerChain, censor: Censor, deadline: time::Duration) -> Self {
        QueryPipeline {
            chain,
            censor,
            deadline,
        }
    }

    /// Resolve a question into the record sections of its response.
    pub fn resolve(&self, question: &dns::Question) -> Sections {
        let started = time::Instant::now();
        let mut restarted = false;
        loop {
            let mut sections = match self.chain.handle(question) {
                Verdict::Answer(sections) => sections,
                Verdict::Failure(resp_code) => Sections::empty(resp_code),
                Verdict::Ignore => {
                    // The chain resolves all-ignore into nx_domain itself, the
                    // internal ignore verdict must never get this far.
                    log::error!("Ignore verdict escaped the chain for '{}'.", question.node);
                    return Sections::empty(dns::RespCode::ServFail);
                }
            };

            let reprocess = self.censor.inspect(&mut sections.authorities, &mut sections.additionals);
            if started.elapsed() > self.deadline {
                log::error!("Deadline exceeded resolving '{}'.", question.node);
                return Sections::empty(dns::RespCode::ServFail);
            }

            // Learning is idempotent, so a second pass could never change the
            // outcome: one restart is both sufficient and a termination bound.
            if reprocess && !restarted {
                log::info!("Policy extended while resolving '{}', re-evaluating.", question.node);
                restarted = true;
                continue;
            }
            return sections;
        }
    }
}
