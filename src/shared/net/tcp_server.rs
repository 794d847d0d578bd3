use crate::shared::net::traits::*;
use crate::shared::{dns, thread_pool};
use std::io::{Read, Write};
use std::sync::{atomic, Arc};
use std::{io, net, time};

/// The request coming from TCP clients. Implements [DnsRead] reading the
/// two-bytes length prefix first, then decoding that many message bytes.
pub struct TcpRequest(net::TcpStream);

impl DnsRead for TcpRequest {
    fn read(mut self) -> DnsReadResult {
        let mut len_buf: [u8; 2] = [0; 2];
        if let Err(err) = self.0.read_exact(&mut len_buf) {
            return DnsReadResult::IoErr(err);
        };
        let req_len = u16::from_be_bytes(len_buf);
        let mut buf = vec![0_u8; req_len as usize];
        if let Err(err) = self.0.read_exact(&mut buf) {
            return DnsReadResult::IoErr(err);
        };

        let req = dns::Message::decode_from_bytes(&buf);
        let err = match req {
            Ok(req) => return DnsReadResult::FullMessage(req),
            Err(err) => err,
        };
        match dns::Header::decode_from_bytes(&buf) {
            Ok(v) => DnsReadResult::HeaderOnly(v, err),
            Err(err_h) => DnsReadResult::ParseErr(err, err_h),
        }
    }
}

/// A wrapper around an established TCP connection. Implements [DnsWrite]
/// writing the length of the message before the message itself. No
/// truncation is needed over TCP.
pub struct TcpResponse(net::TcpStream);

impl DnsWrite for TcpResponse {
    fn reply(mut self, response: dns::Message) -> io::Result<()> {
        // Messages formed internally must be valid, so unwrapping
        // after encoding is fine.
        let resp_bytes = response.encode_to_bytes().unwrap();
        let len_buf = (resp_bytes.len() as u16).to_be_bytes();
        self.0.write_all(&len_buf)?;
        self.0.write_all(&resp_bytes)
    }
}

/// Parameters to be used when starting
/// the TCP server with [run_tcp_server].
#[derive(Clone)]
pub struct TcpParams {
    pub address: String,
    pub port: u16,
    pub write_timeout: time::Duration,
    pub read_timeout: time::Duration,
    pub threads: usize,
}

/// Runs a TCP server generic over a request handler ([DnsHandler]). The
/// function spawns a thread pool and loops accepting connections: each one
/// becomes a task for the pool, which serves it with the dns handler. The
/// `stop` flag can be raised (along with a wake-up connection) to shut down.
pub fn run_tcp_server<H>(handler: Arc<H>, params: TcpParams, stop: &atomic::AtomicBool)
where
    H: DnsHandler,
{
    let pool = thread_pool::ThreadPool::new(params.threads, "tcp");
    let listen_address: (&str, u16) = (&params.address, params.port);
    let listener = match net::TcpListener::bind(listen_address) {
        Ok(v) => {
            log::info!("Starting TCP server, address: '{}:{}'.", &params.address, params.port);
            v
        }
        Err(err) => {
            log::error!("Cannot setup socket: {}", err);
            return;
        }
    };

    loop {
        let (mut tcp_stream, _) = match listener.accept() {
            Ok(v) => v,
            Err(err) => {
                log::error!("Accepting tcp connection: {}", err);
                continue;
            }
        };

        if stop.load(atomic::Ordering::SeqCst) {
            drop(pool);
            return;
        }

        // Serve the request on the pool: set the connection timeouts,
        // compose the request and response endpoints and let the
        // handler drive them.
        let handler = Arc::clone(&handler);
        pool.execute(move || {
            let timeouts = (params.read_timeout, params.write_timeout);
            if let Err(err) = setup_connection(&mut tcp_stream, timeouts) {
                log::error!("Setting the conn: {}", err);
                return;
            };

            let request = TcpRequest(tcp_stream.try_clone().unwrap());
            let response = TcpResponse(tcp_stream);
            handler.handle_request(request, response);
        })
    }
}

fn setup_connection(
    tcp_stream: &mut net::TcpStream,
    (r_timeout, w_timeout): (time::Duration, time::Duration),
) -> io::Result<()> {
    tcp_stream.set_read_timeout(Some(r_timeout))?;
    tcp_stream.set_write_timeout(Some(w_timeout))?;
    Ok(())
}
