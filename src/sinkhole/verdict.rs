use crate::shared::dns;

/// Header flags a verdict wants reflected in the final response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RespFlags {
    pub auth_answer: bool,
    pub recursion_available: bool,
    pub authentic_data: bool,
}

/// The record sections and response code carried by an answering verdict.
/// Between the chain returning and the pipeline replying these sections
/// are owned exclusively by the pipeline, which lets the censoring step
/// rewrite them in place.
#[derive(Debug, Clone)]
pub struct Sections {
    pub resp_code: dns::RespCode,
    pub answers: Vec<dns::Record>,
    pub authorities: Vec<dns::Record>,
    pub additionals: Vec<dns::Record>,
    pub flags: RespFlags,
}

impl Sections {
    /// Sections with no records and the given response code.
    pub fn empty(resp_code: dns::RespCode) -> Self {
        Sections {
            resp_code,
            answers: vec![],
            authorities: vec![],
            additionals: vec![],
            flags: RespFlags::default(),
        }
    }
}

/// What a policy handler decided about a question. `Ignore` means "not
/// my jurisdiction, ask the next handler" and is strictly internal: it
/// is a variant of this type and not a response code, so it cannot be
/// encoded into a wire message by construction.
#[derive(Debug)]
pub enum Verdict {
    Answer(Sections),
    Failure(dns::RespCode),
    Ignore,
}
