use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::feedback::TransportError;
use crate::framework::Transport;
use crate::router::Router;

/// Receive buffer size. A full 25-entry message is 504 bytes; sizing the
/// buffer to a link MTU lets oversized frames drain and fail in decode
/// instead of being silently cut short.
const RECV_BUF_SIZE: usize = 1500;

/// Single-threaded protocol loop: owns the engine and the transport, and is
/// the only mutator of either. One event — a datagram or an elapsed receive
/// window — is handled per iteration.
pub struct Server<T: Transport> {
    pub router: Router,
    transport: T,
    shutdown: Arc<AtomicBool>,
}

impl<T: Transport> Server<T> {
    pub fn new(router: Router, transport: T) -> Self {
        Self::with_shutdown(router, transport, Arc::new(AtomicBool::new(false)))
    }

    /// `shutdown` is polled once per iteration; a signal handler raising it
    /// ends `run` after the current event.
    pub fn with_shutdown(router: Router, transport: T, shutdown: Arc<AtomicBool>) -> Self {
        Server {
            router,
            transport,
            shutdown,
        }
    }

    /// Runs the protocol until shutdown is requested or the transport fails
    /// on receive. Send failures are logged and the loop keeps going.
    pub fn run(&mut self) -> Result<(), TransportError> {
        self.router.solicit_routes();
        self.flush_outbound();

        let mut buf = [0u8; RECV_BUF_SIZE];
        while !self.shutdown.load(Ordering::Relaxed) {
            let window = self.router.next_deadline();
            match self.transport.recv(window, &mut buf)? {
                Some((src_addr, src_port, len)) => {
                    if let Err(err) = self.router.handle_datagram(src_addr, src_port, &buf[..len])
                    {
                        warn!("dropping datagram from {src_addr}:{src_port}: {err}");
                    }
                }
                None => self.router.tick(),
            }
            self.flush_outbound();
            debug!("{}", self.router.table);
        }
        info!("shutdown requested, {} routes held", self.router.table.len());
        Ok(())
    }

    fn flush_outbound(&mut self) {
        for out in self.router.outbound.drain(..) {
            match out.message.encode() {
                Ok(bytes) => {
                    if let Err(err) = self.transport.send(out.dst_addr, out.dst_port, &bytes) {
                        error!("send to {}:{} failed: {err}", out.dst_addr, out.dst_port);
                    }
                }
                Err(err) => error!("dropping unencodable message for {}: {err}", out.dst_addr),
            }
        }
    }
}
