use std::cmp::min;

use crate::router::INFINITY;

/// Adds one hop to a received metric, saturating at the protocol's
/// infinity.
///
/// # Examples
///
/// ```
/// assert_eq!(rip::util::add_hop(1), 2);
/// assert_eq!(rip::util::add_hop(15), 16);
///
/// // infinity stays infinity, and garbage saturates instead of wrapping
/// assert_eq!(rip::util::add_hop(16), 16);
/// assert_eq!(rip::util::add_hop(u32::MAX), 16);
/// ```
pub fn add_hop(metric: u32) -> u32 {
    min(INFINITY, metric.saturating_add(1))
}
