use crate::shared::dns;
use std::io;

/// Results of reading and parsing a dns request with a [DnsRead] implementor.
/// When the message body cannot be decoded but the header can, the header is
/// reported alone so the server can still form an error response.
pub enum DnsReadResult {
    FullMessage(dns::Message),
    HeaderOnly(dns::Header, dns::MessageErr),
    ParseErr(dns::MessageErr, dns::ParsingErr),
    IoErr(io::Error),
}

/// A type implementing [DnsRead] is able to read and parse a dns request
/// from an underlying source, usually an OS socket. **The trait decouples
/// the request handling from the server communication mechanism**. The
/// method takes self by value on purpose: a request is read at most once.
pub trait DnsRead {
    fn read(self) -> DnsReadResult;
}

/// A type implementing [DnsWrite] is able to write a dns response to an
/// underlying destination, usually an OS socket. **The trait decouples
/// the request handling from the server communication mechanism**. The
/// method takes self by value on purpose: a response is sent at most once.
pub trait DnsWrite {
    fn reply(self, response: dns::Message) -> io::Result<()>;
}

/// A type implementing [DnsHandler] serves dns requests, reading them
/// from a [DnsRead] implementor and replying via a [DnsWrite] one.
pub trait DnsHandler: Send + Sync + 'static {
    fn handle_request<R, W>(&self, req: R, resp: W)
    where
        R: DnsRead,
        W: DnsWrite;
}
