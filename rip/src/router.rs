use std::net::Ipv4Addr;
use std::time::Duration;

use log::{debug, error, info, warn};
use rand::Rng;

use crate::concepts::packet::{
    OutboundMessage, RipCommand, RipEntry, RipMessage, RIP_MAX_ENTRIES,
};
use crate::concepts::route::{Route, RouteTable};
use crate::feedback::FormatError;
use crate::framework::ProtocolParams;
use crate::timer::Timer;
use crate::util::add_hop;

/// The protocol's infinity: a metric of 16 marks a subnet unreachable.
pub const INFINITY: u32 = 16;

/// The distance-vector engine.
///
/// The router owns the route table and the update schedule but performs no
/// I/O: event handlers mutate the table and append the sends they want to
/// `outbound`, which the server loop drains into the transport after each
/// event.
pub struct Router {
    pub table: RouteTable,
    /// schedules the periodic full-table announcement
    pub update_timer: Timer,
    /// raised when a metric change must be announced ahead of schedule
    pub triggered_update: bool,
    /// sends the server loop still has to perform
    pub outbound: Vec<OutboundMessage>,
    params: ProtocolParams,
}

impl Router {
    pub fn new(params: ProtocolParams) -> Self {
        Self::with_table(params, RouteTable::new())
    }

    /// A router starting out with a pre-seeded (static) route table.
    pub fn with_table(params: ProtocolParams, table: RouteTable) -> Self {
        let update_timer = Timer::after(params.update_interval);
        Router {
            table,
            update_timer,
            triggered_update: false,
            outbound: Vec::new(),
            params,
        }
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    /// How long the server loop may block before something needs attention:
    /// the nearest route timer or the update schedule, whichever is sooner.
    pub fn next_deadline(&self) -> Duration {
        let mut deadline = self.table.min_remaining(self.params.route_timeout);
        if let Some(left) = self.update_timer.remaining() {
            deadline = deadline.min(left);
        }
        deadline
    }

    /// Multicasts a whole-table REQUEST to solicit neighbour state. Sent
    /// once before entering the loop.
    pub fn solicit_routes(&mut self) {
        info!("soliciting routes from {}", self.params.multicast_group);
        self.push_multicast(RipMessage::request_full_table());
    }

    /// One inbound datagram. A malformed datagram is reported and dropped;
    /// the table is left untouched.
    pub fn handle_datagram(
        &mut self,
        src_addr: Ipv4Addr,
        src_port: u16,
        payload: &[u8],
    ) -> Result<(), FormatError> {
        let message = RipMessage::decode(payload)?;
        debug!("{} bytes from {src_addr}:{src_port}: {message}", payload.len());
        match message.command {
            RipCommand::Request => self.handle_request(src_addr, src_port, message),
            RipCommand::Response => self.handle_response(src_addr, message),
        }
        self.announce_if_triggered();
        Ok(())
    }

    /// The receive window elapsed with no datagram: age the table and run
    /// the announcement schedule.
    pub fn tick(&mut self) {
        if self.table.age_and_collect(self.params.garbage_timeout) {
            // a route died of old age; announce the poison right away
            self.triggered_update = true;
        }
        if self.update_timer.expired() {
            if !self.table.is_empty() {
                info!("periodic update, {} routes", self.table.len());
                self.announce_table(self.params.multicast_group, self.params.port);
                // the full table just went out, a triggered resend would
                // only duplicate it
                self.triggered_update = false;
            }
            let next = self.jittered_interval();
            self.update_timer.reset(next);
            debug!("next periodic update in {next:?}");
        }
        self.announce_if_triggered();
    }

    /// REQUEST path: answer from the table, never mutate it.
    fn handle_request(&mut self, src_addr: Ipv4Addr, src_port: u16, mut message: RipMessage) {
        if message.is_full_table_request() {
            debug!("whole-table request from {src_addr}:{src_port}");
            self.announce_table(src_addr, src_port);
            return;
        }
        // per-entry lookup, answered in place with the same-length message
        for entry in &mut message.entries {
            entry.metric = self
                .table
                .lookup(entry.ip_addr, entry.subnet_mask)
                .map_or(INFINITY, |route| route.metric);
        }
        message.command = RipCommand::Response;
        self.push(src_addr, src_port, message);
    }

    fn handle_response(&mut self, src_addr: Ipv4Addr, message: RipMessage) {
        for entry in &message.entries {
            self.apply_entry(src_addr, entry);
        }
    }

    /// One advertised entry, applied independently of its siblings.
    fn apply_entry(&mut self, src_addr: Ipv4Addr, entry: &RipEntry) {
        let new_metric = add_hop(entry.metric);
        let mut timeout = if new_metric == INFINITY {
            self.params.garbage_timeout
        } else {
            self.params.route_timeout
        };
        // a zeroed next-hop field means "route through me"
        let next_hop = if entry.next_hop.is_unspecified() {
            src_addr
        } else {
            entry.next_hop
        };

        let Some(index) = self.table.find(entry.ip_addr, entry.subnet_mask) else {
            let route = Route::new(entry.ip_addr, entry.subnet_mask, next_hop, new_metric, timeout);
            if let Err(err) = self.table.add(route) {
                error!(
                    "cannot learn route to {}/{}: {err}",
                    entry.ip_addr, entry.subnet_mask
                );
            }
            return;
        };
        let Some(current) = self.table.get_mut(index) else {
            return;
        };

        if current.next_hop == src_addr {
            // authoritative refresh from the parent; always wins
            if current.metric == INFINITY && new_metric == INFINITY {
                // still poisoned: let the garbage timer keep running out
                if let Some(left) = current.timer.remaining() {
                    timeout = left;
                }
            }
            if current.metric != new_metric {
                info!(
                    "route to {}/{} changed metric {} -> {new_metric}",
                    entry.ip_addr, entry.subnet_mask, current.metric
                );
                self.triggered_update = true;
            }
            *current = Route::new(entry.ip_addr, entry.subnet_mask, next_hop, new_metric, timeout);
        } else if new_metric < current.metric {
            // strictly better path through a different neighbour
            info!(
                "better route to {}/{} via {next_hop}, metric {new_metric} beats {}",
                entry.ip_addr, entry.subnet_mask, current.metric
            );
            *current = Route::new(entry.ip_addr, entry.subnet_mask, next_hop, new_metric, timeout);
            self.triggered_update = true;
        }
        // equal or worse offers from non-parents neither replace nor refresh
    }

    /// Sends the whole table as a RESPONSE, truncated to the 25-entry frame
    /// limit.
    fn announce_table(&mut self, dst_addr: Ipv4Addr, dst_port: u16) {
        let mut entries: Vec<RipEntry> = self.table.iter().map(RipEntry::advertising).collect();
        if entries.len() > RIP_MAX_ENTRIES {
            warn!(
                "table holds {} routes, announcing only the first {RIP_MAX_ENTRIES}",
                entries.len()
            );
            entries.truncate(RIP_MAX_ENTRIES);
        }
        self.push(dst_addr, dst_port, RipMessage::response(entries));
    }

    fn announce_if_triggered(&mut self) {
        if self.triggered_update {
            self.triggered_update = false;
            info!("triggered update, {} routes", self.table.len());
            self.announce_table(self.params.multicast_group, self.params.port);
        }
    }

    fn jittered_interval(&self) -> Duration {
        let max_ms = self.params.update_jitter.as_millis() as u64;
        let jitter = if max_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..max_ms)
        };
        self.params.update_interval + Duration::from_millis(jitter)
    }

    fn push(&mut self, dst_addr: Ipv4Addr, dst_port: u16, message: RipMessage) {
        self.outbound.push(OutboundMessage {
            dst_addr,
            dst_port,
            message,
        });
    }

    fn push_multicast(&mut self, message: RipMessage) {
        self.push(self.params.multicast_group, self.params.port, message);
    }
}
