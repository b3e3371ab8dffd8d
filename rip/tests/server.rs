use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rip::concepts::packet::{RipEntry, RipMessage, AF_IPV4};
use rip::feedback::TransportError;
use rip::framework::{ProtocolParams, Transport, RIP_MULTICAST_GROUP};
use rip::router::Router;
use rip::server::Server;

/// Feeds a fixed sequence of datagrams, records every send, and raises the
/// shutdown flag once the script runs dry.
struct ScriptedTransport {
    incoming: VecDeque<(Ipv4Addr, u16, Vec<u8>)>,
    sent: Rc<RefCell<Vec<(Ipv4Addr, u16, Vec<u8>)>>>,
    shutdown: Arc<AtomicBool>,
}

impl Transport for ScriptedTransport {
    fn send(
        &mut self,
        dst_addr: Ipv4Addr,
        dst_port: u16,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        self.sent
            .borrow_mut()
            .push((dst_addr, dst_port, payload.to_vec()));
        Ok(())
    }

    fn recv(
        &mut self,
        _timeout: Duration,
        buf: &mut [u8],
    ) -> Result<Option<(Ipv4Addr, u16, usize)>, TransportError> {
        match self.incoming.pop_front() {
            Some((src_addr, src_port, bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(Some((src_addr, src_port, bytes.len())))
            }
            None => {
                // script exhausted: one final tick, then the loop exits
                self.shutdown.store(true, Ordering::Relaxed);
                Ok(None)
            }
        }
    }
}

struct FailingTransport;

impl Transport for FailingTransport {
    fn send(&mut self, _: Ipv4Addr, _: u16, _: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn recv(
        &mut self,
        _timeout: Duration,
        _buf: &mut [u8],
    ) -> Result<Option<(Ipv4Addr, u16, usize)>, TransportError> {
        Err(TransportError(io::Error::new(
            io::ErrorKind::Other,
            "wire cut",
        )))
    }
}

#[test]
fn run_solicits_dispatches_and_stops_on_shutdown() {
    let neighbour: Ipv4Addr = "192.168.1.1".parse().unwrap();
    let advert = RipMessage::response(vec![RipEntry {
        address_family: AF_IPV4,
        route_tag: 0,
        ip_addr: "10.0.0.0".parse().unwrap(),
        subnet_mask: "255.0.0.0".parse().unwrap(),
        next_hop: Ipv4Addr::UNSPECIFIED,
        metric: 1,
    }]);

    let sent = Rc::new(RefCell::new(Vec::new()));
    let shutdown = Arc::new(AtomicBool::new(false));
    let transport = ScriptedTransport {
        incoming: VecDeque::from([
            (neighbour, 520, advert.encode().unwrap()),
            // garbage in the middle must not derail the loop
            (neighbour, 520, vec![2, 2, 0]),
        ]),
        sent: sent.clone(),
        shutdown: shutdown.clone(),
    };

    let mut server = Server::with_shutdown(
        Router::new(ProtocolParams::default()),
        transport,
        shutdown,
    );
    server.run().unwrap();

    // the advertised route was learned through the loop
    let route = server
        .router
        .table
        .lookup("10.0.0.0".parse().unwrap(), "255.0.0.0".parse().unwrap())
        .unwrap();
    assert_eq!(route.metric, 2);
    assert_eq!(route.next_hop, neighbour);

    // the first send was the startup whole-table solicitation
    let sent = sent.borrow();
    assert_eq!(sent[0].0, RIP_MULTICAST_GROUP);
    assert_eq!(sent[0].1, 520);
    assert_eq!(
        RipMessage::decode(&sent[0].2).unwrap(),
        RipMessage::request_full_table()
    );
}

#[test]
fn run_reports_receive_failures() {
    let mut server = Server::new(Router::new(ProtocolParams::default()), FailingTransport);
    assert!(server.run().is_err());
}
