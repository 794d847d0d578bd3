use crate::shared::dns;
use std::net::IpAddr;
use std::{io, net, time};

/// The contract with the upstream recursion: a true recursive resolver
/// answering single questions within a deadline. Implemented over UDP by
/// [UdpUpstream], and by in-memory stubs in tests.
pub trait UpstreamResolver: Send + Sync + 'static {
    fn query(&self, question: &dns::Question) -> Result<dns::Message, UpstreamErr>;
}

/// Errors talking to the upstream resolver. Timeouts are split from
/// other transport errors since they are the expected failure mode.
#[derive(Debug)]
pub enum UpstreamErr {
    Timeout,
    Transport(io::Error),
    MalformedResp(String),
}

impl From<io::Error> for UpstreamErr {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => UpstreamErr::Timeout,
            _ => UpstreamErr::Transport(err),
        }
    }
}

/// Parameters for the [`UdpUpstream`] resolver.
#[derive(Debug, Clone)]
pub struct UpstreamParams {
    pub address: IpAddr,
    pub port: u16,
    pub retries: usize,
    pub timeout: time::Duration,
}

/// Upstream recursion over plain UDP. Each query gets a fresh socket and
/// a random id; responses with a different id are rejected. Failed sends
/// are retried up to the configured maximum.
pub struct UdpUpstream {
    params: UpstreamParams,
}

impl UdpUpstream {
    pub fn new(params: UpstreamParams) -> Self {
        assert!(params.retries > 0);
        UdpUpstream { params }
    }
}

impl UpstreamResolver for UdpUpstream {
    fn query(&self, question: &dns::Question) -> Result<dns::Message, UpstreamErr> {
        let mut err = None;
        for _ in 0..self.params.retries {
            match send_query(&self.params, question) {
                Ok(resp) => return Ok(resp),
                Err(er) => err = Some(er),
            };
        }
        Err(err.unwrap())
    }
}

fn send_query(params: &UpstreamParams, question: &dns::Question) -> Result<dns::Message, UpstreamErr> {
    let request = build_dns_request(question);
    // Messages formed internally must be valid, so it's
    // fine to unwrap after encoding.
    let request_bytes = request.encode_to_bytes().unwrap();

    let socket = net::UdpSocket::bind("0.0.0.0:0")?;
    socket.set_write_timeout(Some(params.timeout))?;
    socket.set_read_timeout(Some(params.timeout))?;
    socket.send_to(&request_bytes, (params.address, params.port))?;

    let mut buffer = [0_u8; dns::MAX_UDP_LEN_BYTES];
    let (n_recv, _) = socket.recv_from(&mut buffer)?;

    let response = match dns::Message::decode_from_bytes(&buffer[..n_recv]) {
        Err(err) => return Err(UpstreamErr::MalformedResp(format!("decoding error: {:?}", err))),
        Ok(v) => v,
    };
    if response.id() != request.id() {
        return Err(UpstreamErr::MalformedResp(format!(
            "expected header id: {}, got: {}",
            request.id(),
            response.id()
        )));
    }

    Ok(response)
}

// The request sent upstream: a standard query with the recursion
// desired flag raised.
fn build_dns_request(question: &dns::Question) -> dns::Message {
    let mut header = dns::Header::default();
    header.recursion_desired = true;
    header.questions_count = 1;
    dns::Message {
        header,
        questions: vec![question.clone()],
        answers: vec![],
        authorities: vec![],
        additionals: vec![],
    }
}
