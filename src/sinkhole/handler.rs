use crate::shared::dns;
use crate::shared::net::*;
use crate::sinkhole::pipeline::QueryPipeline;
use crate::sinkhole::verdict::Sections;

/// The sinkhole handler able to serve dns requests via its [`DnsHandler`]
/// implementation. Wraps the [QueryPipeline] with the decoding, validation
/// and response composition chores.
pub struct SinkholeHandler(pub QueryPipeline);

impl DnsHandler for SinkholeHandler {
    fn handle_request<R: DnsRead, W: DnsWrite>(&self, req: R, resp: W) {
        handle_request(req, resp, &self.0);
    }
}

fn handle_request<R: DnsRead, W: DnsWrite>(req: R, resp: W, pipeline: &QueryPipeline) {
    let dns_request = match req.read() {
        DnsReadResult::FullMessage(req) => req,
        DnsReadResult::HeaderOnly(header, err) => {
            handle_decode_err(resp, header, err);
            return;
        }
        DnsReadResult::ParseErr(msg_err, hdr_err) => {
            log::warn!("Decoding request: {:?}, decoding header: {:?}", msg_err, hdr_err);
            return;
        }
        DnsReadResult::IoErr(err) => {
            log::warn!("IO error: {:?}", err);
            return;
        }
    };

    let question = match validate_dns_request(&dns_request) {
        Ok(question) => question,
        Err(err) => {
            log::warn!("[{}] Request malformed: {}.", dns_request.id(), err);
            handle_err(resp, &dns_request, dns::RespCode::FormErr);
            return;
        }
    };

    let dns::Question { node, record_type, .. } = question;
    log::info!("[{}] Start handling request: {}, type {:?}.", dns_request.id(), node, record_type);
    log::debug!("[{}] Complete request: {:?}", dns_request.id(), dns_request);

    // Names are folded to lowercase when decoded, which gives the
    // pipeline the canonical form it expects.
    let sections = pipeline.resolve(question);
    reply(resp, compose_response(&dns_request, sections));
}

// Build the final response: flags and code from the resolved sections,
// id and question echoed from the request.
fn compose_response(dns_req: &dns::Message, sections: Sections) -> dns::Message {
    let mut resp_header = resp_header_from_req_header(&dns_req.header, sections.resp_code);
    resp_header.auth_answer = sections.flags.auth_answer;
    resp_header.recursion_available = sections.flags.recursion_available;
    resp_header.authentic_data = sections.flags.authentic_data;
    resp_header.answers_count = sections.answers.len() as u16;
    resp_header.authorities_count = sections.authorities.len() as u16;
    resp_header.additionals_count = sections.additionals.len() as u16;
    dns::Message {
        header: resp_header,
        questions: dns_req.questions.clone(),
        answers: sections.answers,
        authorities: sections.authorities,
        additionals: sections.additionals,
    }
}

/// Handle decoding errors, either malformed messages or unsupported
/// features. If we cannot decode the header we cannot compose a valid
/// response header, so those requests are simply dropped.
fn handle_decode_err<W: DnsWrite>(resp: W, req_header: dns::Header, msg_err: dns::MessageErr) {
    let parsing_err = msg_err.inner_err();
    let resp_code = match parsing_err {
        dns::ParsingErr::UnsupportedOpCode(_) => dns::RespCode::NotImp,
        dns::ParsingErr::UnsupportedClass(_) => dns::RespCode::NotImp,
        _ => dns::RespCode::FormErr,
    };
    let resp_header = resp_header_from_req_header(&req_header, resp_code);
    let dns_response = dns::Message {
        header: resp_header,
        questions: vec![],
        answers: vec![],
        authorities: vec![],
        additionals: vec![],
    };

    reply(resp, dns_response);
}

/// Generic error handler used to reply to a client with a specific error
/// code. Questions are included in the response.
fn handle_err<W: DnsWrite>(resp: W, dns_req: &dns::Message, resp_code: dns::RespCode) {
    let mut resp_header = resp_header_from_req_header(&dns_req.header, resp_code);
    resp_header.answers_count = 0;
    resp_header.authorities_count = 0;
    resp_header.additionals_count = 0;
    let dns_response = dns::Message {
        header: resp_header,
        questions: dns_req.questions.clone(),
        answers: vec![],
        authorities: vec![],
        additionals: vec![],
    };

    reply(resp, dns_response);
}

/// Reply to the client and log the outcome.
fn reply<W: DnsWrite>(resp: W, dns_response: dns::Message) {
    let response_id = dns_response.id();
    let response_code = dns_response.header.resp_code;
    log::debug!("[{}] Complete response: {:?}", response_id, dns_response);
    match resp.reply(dns_response) {
        Ok(_) => log::info!("[{}] Request served [{:?}].", response_id, response_code),
        Err(err) => log::error!("[{}] Error replying: {}", response_id, err),
    };
}

// Creates a proper header from the request header, suitable to be used
// in the corresponding response. The passed code is used in the resp
// header, policy flags are applied by the caller.
fn resp_header_from_req_header(req_header: &dns::Header, resp_code: dns::RespCode) -> dns::Header {
    dns::Header {
        query_resp: true,
        auth_answer: false,
        truncated: false,
        recursion_available: false,
        authentic_data: false,
        resp_code,
        ..req_header.clone()
    }
}

// Validate a client dns request against some minimal requirements.
fn validate_dns_request(dns_req: &dns::Message) -> Result<&dns::Question, String> {
    if !dns_req.header.is_request() {
        return Err("resp flag set in query".to_string());
    }
    if dns_req.header.answers_count != 0 {
        return Err(format!("invalid # of answers: {:?}", dns_req.header.answers_count));
    }
    if dns_req.header.authorities_count != 0 {
        return Err(format!(
            "invalid # of authorities: {:?}",
            dns_req.header.authorities_count
        ));
    }
    if dns_req.header.additionals_count != 0 {
        return Err(format!(
            "invalid # of additionals: {:?}",
            dns_req.header.additionals_count
        ));
    }

    match dns_req.questions.as_slice() {
        [question] => Ok(question),
        _ => Err(format!("invalid # of questions: {:?}", dns_req.header.questions_count)),
    }
}
