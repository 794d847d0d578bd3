use crate::shared::dns;
use crate::sinkhole::handlers::PolicyHandler;
use crate::sinkhole::verdict::*;

/// The ordered chain of policy handlers. Handlers are consulted in the
/// configured order and the first verdict that is not an ignore wins.
/// The default configuration runs whitelist, blacklist, recursive:
/// whitelist first so a carve-out inside a blacklisted parent is
/// honored, recursion last so it only sees unclaimed questions.
pub struct HandlerChain {
    handlers: Vec<Box<dyn PolicyHandler>>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<Box<dyn PolicyHandler>>) -> Self {
        HandlerChain { handlers }
    }

    /// Run the question down the chain. If every handler ignores it the
    /// name does not exist as far as clients are concerned, and a
    /// synthetic nx_domain answer with empty sections is returned.
    pub fn handle(&self, question: &dns::Question) -> Verdict {
        for handler in &self.handlers {
            match handler.handle(question) {
                Verdict::Ignore => continue,
                verdict => {
                    log::debug!("Handler '{}' answered for '{}'.", handler.name(), question.node);
                    return verdict;
                }
            }
        }
        Verdict::Answer(Sections::empty(dns::RespCode::NxDomain))
    }
}
