use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::time::Duration;

use log::{debug, info};

use crate::feedback::{CapacityExceeded, RouteFileError};
use crate::router::INFINITY;
use crate::timer::Timer;

pub const ROUTE_TABLE_SIZE: usize = 256;

/// A learned or static path to a subnet.
#[derive(Clone, Debug)]
pub struct Route {
    pub subnet_addr: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    /// the neighbour this subnet is currently reached through
    pub next_hop: Ipv4Addr,
    /// hop count in [1, 16]; 16 marks the route unreachable
    pub metric: u32,
    /// counts down the full route timeout while alive, the garbage
    /// interval once poisoned
    pub timer: Timer,
}

impl Route {
    pub fn new(
        subnet_addr: Ipv4Addr,
        subnet_mask: Ipv4Addr,
        next_hop: Ipv4Addr,
        metric: u32,
        timeout: Duration,
    ) -> Self {
        Route {
            subnet_addr,
            subnet_mask,
            next_hop,
            metric,
            timer: Timer::after(timeout),
        }
    }
}

/// Fixed-capacity table of route slots.
///
/// Slot order carries no meaning; indices are only valid until the next
/// removal and are never persisted. The table does not enforce the
/// one-route-per-(subnet, mask) invariant itself — the engine looks up
/// before inserting.
#[derive(Debug)]
pub struct RouteTable {
    slots: Vec<Option<Route>>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable {
            slots: vec![None; ROUTE_TABLE_SIZE],
        }
    }

    /// Inserts into the first unoccupied slot and returns its index.
    pub fn add(&mut self, route: Route) -> Result<usize, CapacityExceeded> {
        match self.slots.iter_mut().enumerate().find(|(_, s)| s.is_none()) {
            Some((index, slot)) => {
                *slot = Some(route);
                Ok(index)
            }
            None => Err(CapacityExceeded(ROUTE_TABLE_SIZE)),
        }
    }

    /// Detaches and returns the route at `index`; `None` for an out-of-range
    /// or unoccupied slot.
    pub fn remove(&mut self, index: usize) -> Option<Route> {
        self.slots.get_mut(index)?.take()
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.slots.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Route> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// Index of the unique route to `(subnet, mask)`, by linear scan.
    pub fn find(&self, subnet: Ipv4Addr, mask: Ipv4Addr) -> Option<usize> {
        self.slots.iter().position(|slot| {
            matches!(slot, Some(route) if route.subnet_addr == subnet && route.subnet_mask == mask)
        })
    }

    pub fn lookup(&self, subnet: Ipv4Addr, mask: Ipv4Addr) -> Option<&Route> {
        self.find(subnet, mask).and_then(|index| self.get(index))
    }

    /// Occupied-slot count. Gaps left by removal do not end the scan.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Smallest remaining timer across all occupied slots, capped at `cap`.
    pub fn min_remaining(&self, cap: Duration) -> Duration {
        let mut min = cap;
        for route in self.iter() {
            if let Some(left) = route.timer.remaining() {
                min = min.min(left);
            }
        }
        min
    }

    /// Two-phase expiry sweep. Routes whose timer ran out are poisoned
    /// (metric forced to infinity, timer re-armed to the garbage interval);
    /// routes that expire while already poisoned are deleted. Returns
    /// whether any route was poisoned this pass.
    pub fn age_and_collect(&mut self, garbage_timeout: Duration) -> bool {
        let mut poisoned = false;
        for slot in &mut self.slots {
            let Some(route) = slot else { continue };
            if !route.timer.expired() {
                continue;
            }
            if route.metric == INFINITY {
                debug!(
                    "garbage-collecting route to {}/{}",
                    route.subnet_addr, route.subnet_mask
                );
                *slot = None;
            } else {
                info!(
                    "route to {}/{} timed out, poisoning",
                    route.subnet_addr, route.subnet_mask
                );
                route.metric = INFINITY;
                route.timer.reset(garbage_timeout);
                poisoned = true;
            }
        }
        poisoned
    }

    /// Loads a static route file: one `<subnet> <mask> <next-hop> <metric>`
    /// per line, blank lines and `#` comments ignored. Any malformed line
    /// aborts the whole load. Loaded routes are armed with `timeout`.
    pub fn parse(text: &str, timeout: Duration) -> Result<RouteTable, RouteFileError> {
        let mut table = RouteTable::new();
        for (n, raw) in text.lines().enumerate() {
            let line = n + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(RouteFileError::BadLine {
                    line,
                    got: raw.to_string(),
                });
            }
            let subnet = parse_addr(fields[0], "subnet", line)?;
            let mask = parse_addr(fields[1], "mask", line)?;
            let next_hop = parse_addr(fields[2], "next-hop", line)?;
            let metric = fields[3].parse::<u32>().map_err(|_| RouteFileError::BadField {
                line,
                field: "metric",
                value: fields[3].to_string(),
            })?;
            table
                .add(Route::new(subnet, mask, next_hop, metric, timeout))
                .map_err(|source| RouteFileError::Table { line, source })?;
        }
        Ok(table)
    }

    /// Renders the table back into the static route file format.
    pub fn to_config(&self) -> String {
        let mut out = String::from("# <subnet> <mask> <next-hop> <metric>\n");
        for route in self.iter() {
            out.push_str(&format!(
                "{} {} {} {}\n",
                route.subnet_addr, route.subnet_mask, route.next_hop, route.metric
            ));
        }
        out
    }
}

fn parse_addr(value: &str, field: &'static str, line: usize) -> Result<Ipv4Addr, RouteFileError> {
    value.parse().map_err(|_| RouteFileError::BadField {
        line,
        field,
        value: value.to_string(),
    })
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let left = match self.timer.remaining() {
            Some(left) => format!("{}ms", left.as_millis()),
            None => "-".to_string(),
        };
        write!(
            f,
            "{:<15} {:<15} {:<15} {:<6} {}",
            self.subnet_addr.to_string(),
            self.subnet_mask.to_string(),
            self.next_hop.to_string(),
            self.metric,
            left
        )
    }
}

impl Display for RouteTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<15} {:<15} {:<15} {:<6} {}",
            "subnet", "mask", "next hop", "metric", "timer"
        )?;
        for route in self.iter() {
            write!(f, "\n{route}")?;
        }
        Ok(())
    }
}
