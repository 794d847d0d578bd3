mod blacklist;
mod chain;
mod recursive;
mod whitelist;

pub use blacklist::*;
pub use chain::*;
pub use recursive::*;
pub use whitelist::*;

use crate::shared::dns;
use crate::sinkhole::verdict::*;

/// A policy handler inspects a question and produces a [Verdict]. The
/// state backing the decision differs per policy (a domain trie, an
/// upstream resolver, both or none), the contract does not. Handlers
/// are invoked concurrently by the server threads and must be
/// shareable across them.
pub trait PolicyHandler: Send + Sync + 'static {
    /// Short policy name, used in logs.
    fn name(&self) -> &'static str;

    /// Decide the fate of a question.
    fn handle(&self, question: &dns::Question) -> Verdict;
}
