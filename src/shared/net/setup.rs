use crate::shared::net::tcp_server::*;
use crate::shared::net::traits::*;
use crate::shared::net::udp_server::*;
use std::io::Write;
use std::sync::{atomic, mpsc, Arc};
use std::{net, thread, time};

/// Setup and start the UDP and TCP dns servers. Every server runs in its
/// own thread; when one of them errors or exits the current thread is
/// notified and the other server is teared down too.
pub fn start_servers<H: DnsHandler>(handler: Arc<H>, udp_params: UdpParams, tcp_params: TcpParams) {
    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(atomic::AtomicBool::new(false));

    // Spawn the udp server in a new thread.
    let udp_params_clone = udp_params.clone();
    let handler_clone = Arc::clone(&handler);
    let stop_clone = Arc::clone(&stop);
    let tx_clone = tx.clone();
    thread::spawn(move || {
        run_udp_server(handler_clone, udp_params_clone, &stop_clone);
        log::warn!("UDP server shut down.");
        tx_clone.send(()).unwrap();
    });

    // Spawn the tcp server in a new thread.
    let tcp_params_clone = tcp_params.clone();
    let handler_clone = Arc::clone(&handler);
    let stop_clone = Arc::clone(&stop);
    let tx_clone = tx.clone();
    thread::spawn(move || {
        run_tcp_server(handler_clone, tcp_params_clone, &stop_clone);
        log::warn!("TCP server shut down.");
        tx_clone.send(()).unwrap();
    });

    // Wait for errors or teardowns. The second recv has a timeout
    // to avoid hanging if the other server cannot be woken up.
    rx.recv().unwrap();
    stop.store(true, atomic::Ordering::SeqCst);
    wake_up_servers(&udp_params, &tcp_params);
    rx.recv_timeout(time::Duration::from_secs(4)).unwrap();
}

// The blocking UDP 'recv' and TCP 'accept' calls cannot observe the stop
// flag on their own. Sending one dummy datagram and opening one dummy
// connection unblocks them so they can check the flag and exit properly.
#[allow(unused_must_use)]
fn wake_up_servers(udp_params: &UdpParams, tcp_params: &TcpParams) {
    let udp_server_addr: (&str, u16) = (&udp_params.address, udp_params.port);
    match net::UdpSocket::bind("0.0.0.0:0") {
        Ok(udp_sock) => udp_sock.send_to(&[0], udp_server_addr),
        Err(_) => return,
    };
    let tcp_server_addr: (&str, u16) = (&tcp_params.address, tcp_params.port);
    match net::TcpStream::connect(tcp_server_addr) {
        Ok(mut tcp_sock) => tcp_sock.write_all(&[0]),
        Err(_) => return,
    };
}
