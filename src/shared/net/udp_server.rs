use crate::shared::net::traits::*;
use crate::shared::{dns, thread_pool};
use std::sync::{atomic, Arc};
use std::{io, net, time};

/// The request coming from UDP clients. Implements [DnsRead] decoding
/// the message directly from the received datagram bytes.
pub struct UdpRequest<'a>(&'a [u8]);

impl<'a> DnsRead for UdpRequest<'a> {
    fn read(self) -> DnsReadResult {
        let req = dns::Message::decode_from_bytes(self.0);
        let err = match req {
            Ok(req) => return DnsReadResult::FullMessage(req),
            Err(err) => err,
        };
        match dns::Header::decode_from_bytes(self.0) {
            Ok(v) => DnsReadResult::HeaderOnly(v, err),
            Err(err_h) => DnsReadResult::ParseErr(err, err_h),
        }
    }
}

/// A wrapper around the socket and the client address used to respond to
/// an UDP request. Implements [DnsWrite]. Responses over the classic 512
/// bytes limit are truncated with the TC bit set.
pub struct UdpResponse {
    socket: net::UdpSocket,
    addr: net::SocketAddr,
}

impl DnsWrite for UdpResponse {
    fn reply(self, response: dns::Message) -> io::Result<()> {
        // Messages formed internally must be valid, so unwrapping
        // after encoding is fine.
        let resp_bytes = response.encode_to_bytes_trunc().unwrap();
        let mut written = 0;
        while written < resp_bytes.len() {
            let n = self.socket.send_to(&resp_bytes[written..], self.addr)?;
            written += n;
        }
        Ok(())
    }
}

/// Parameters to be used when starting
/// the UDP server with [run_udp_server].
#[derive(Clone)]
pub struct UdpParams {
    pub address: String,
    pub port: u16,
    pub write_timeout: time::Duration,
    pub threads: usize,
}

/// Runs an UDP server generic over a request handler ([DnsHandler]). The
/// function spawns a thread pool and loops over inbound datagrams: each one
/// becomes a task for the pool, which serves it with the dns handler. The
/// `stop` flag can be raised (along with a wake-up datagram) to shut down.
pub fn run_udp_server<H>(handler: Arc<H>, params: UdpParams, stop: &atomic::AtomicBool)
where
    H: DnsHandler,
{
    let pool = thread_pool::ThreadPool::new(params.threads, "udp");
    let socket = match bind_udp_socket(&params) {
        Ok(v) => {
            log::info!("Starting UDP server, address: '{}:{}'.", &params.address, params.port);
            v
        }
        Err(err) => {
            log::error!("Cannot setup socket: {}", err);
            return;
        }
    };

    loop {
        let mut buffer = [0; dns::MAX_UDP_LEN_BYTES];
        let (n_read, src_addr) = match socket.recv_from(&mut buffer) {
            Ok(read_data) => read_data,
            Err(err) => {
                log::warn!("Cannot recv_from socket: {}", err);
                continue;
            }
        };

        if stop.load(atomic::Ordering::SeqCst) {
            drop(pool);
            return;
        }

        let socket_clone = match socket.try_clone() {
            Ok(socket) => socket,
            Err(err) => {
                log::warn!("Cannot clone socket: {}", err);
                continue;
            }
        };

        // Serve the request on the pool: compose the request and response
        // endpoints and let the handler drive them.
        let handler = Arc::clone(&handler);
        pool.execute(move || {
            let request = UdpRequest(&buffer[0..n_read]);
            let response = UdpResponse {
                socket: socket_clone,
                addr: src_addr,
            };
            handler.handle_request(request, response);
        });
    }
}

fn bind_udp_socket(params: &UdpParams) -> Result<net::UdpSocket, io::Error> {
    let listen_address: (&str, u16) = (&params.address, params.port);
    let socket = net::UdpSocket::bind(listen_address)?;
    socket.set_write_timeout(Some(params.write_timeout))?;
    Ok(socket)
}
