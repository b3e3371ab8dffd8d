use std::net::Ipv4Addr;
use std::time::Duration;

use rip::concepts::packet::RIP_PORT;
use rip::concepts::route::Route;
use rip::framework::{ProtocolParams, RIP_MULTICAST_GROUP};
use rip::router::Router;

/// In-memory network of engines joined by point-to-point links. Multicast
/// reaches every link peer; unicast is delivered by address. Nothing is
/// lost, delayed or reordered — delivery happens when `deliver` runs.
pub struct VirtualNet {
    pub nodes: Vec<Node>,
    links: Vec<(usize, usize)>,
}

pub struct Node {
    pub addr: Ipv4Addr,
    pub router: Router,
}

impl VirtualNet {
    /// Params that make every tick announce the full table while keeping
    /// routes from aging mid-test.
    pub fn eager_params() -> ProtocolParams {
        ProtocolParams {
            update_interval: Duration::ZERO,
            update_jitter: Duration::ZERO,
            ..ProtocolParams::default()
        }
    }

    pub fn create(addrs: &[&str], links: &[(usize, usize)]) -> VirtualNet {
        Self::create_with(Self::eager_params(), addrs, links)
    }

    pub fn create_with(
        params: ProtocolParams,
        addrs: &[&str],
        links: &[(usize, usize)],
    ) -> VirtualNet {
        let nodes = addrs
            .iter()
            .map(|addr| Node {
                addr: addr.parse().unwrap(),
                router: Router::new(params.clone()),
            })
            .collect();
        VirtualNet {
            nodes,
            links: links.to_vec(),
        }
    }

    /// Gives `node` a static route to `subnet` through itself.
    pub fn seed_route(&mut self, node: usize, subnet: &str, mask: &str, metric: u32) {
        let timeout = self.nodes[node].router.params().route_timeout;
        let addr = self.nodes[node].addr;
        self.nodes[node]
            .router
            .table
            .add(Route::new(
                subnet.parse().unwrap(),
                mask.parse().unwrap(),
                addr,
                metric,
                timeout,
            ))
            .unwrap();
    }

    /// One protocol round: every node ticks, then queued messages are
    /// delivered. Triggered updates raised during delivery go out on the
    /// next round, so information travels one hop per round.
    pub fn tick(&mut self) {
        for node in &mut self.nodes {
            node.router.tick();
        }
        self.deliver();
    }

    pub fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Drains every outbound queue and hands the datagrams to their
    /// destinations over the wire format.
    pub fn deliver(&mut self) {
        let mut pending = Vec::new();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            let addr = node.addr;
            for out in node.router.outbound.drain(..) {
                pending.push((i, addr, out));
            }
        }
        for (src, src_addr, out) in pending {
            let bytes = out.message.encode().unwrap();
            if out.dst_addr == RIP_MULTICAST_GROUP {
                let peers: Vec<usize> = self
                    .links
                    .iter()
                    .filter_map(|&(a, b)| {
                        if a == src {
                            Some(b)
                        } else if b == src {
                            Some(a)
                        } else {
                            None
                        }
                    })
                    .collect();
                for peer in peers {
                    self.nodes[peer]
                        .router
                        .handle_datagram(src_addr, RIP_PORT, &bytes)
                        .unwrap();
                }
            } else if let Some(peer) = self.nodes.iter().position(|n| n.addr == out.dst_addr) {
                self.nodes[peer]
                    .router
                    .handle_datagram(src_addr, RIP_PORT, &bytes)
                    .unwrap();
            }
        }
    }

    pub fn router(&mut self, node: usize) -> &mut Router {
        &mut self.nodes[node].router
    }

    pub fn addr(&self, node: usize) -> Ipv4Addr {
        self.nodes[node].addr
    }

    pub fn has_route(&self, node: usize, subnet: &str, mask: &str) -> bool {
        self.nodes[node]
            .router
            .table
            .lookup(subnet.parse().unwrap(), mask.parse().unwrap())
            .is_some()
    }

    pub fn metric_to(&self, node: usize, subnet: &str, mask: &str) -> u32 {
        self.route_of(node, subnet, mask).metric
    }

    pub fn next_hop_to(&self, node: usize, subnet: &str, mask: &str) -> Ipv4Addr {
        self.route_of(node, subnet, mask).next_hop
    }

    fn route_of(&self, node: usize, subnet: &str, mask: &str) -> &Route {
        self.nodes[node]
            .router
            .table
            .lookup(subnet.parse().unwrap(), mask.parse().unwrap())
            .unwrap_or_else(|| panic!("node {node} has no route to {subnet}"))
    }
}
