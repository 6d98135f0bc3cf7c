use ipnetwork::IpNetwork;
use itertools::Itertools;

use crate::utils::{is_default_route, parse_cidr};

/// Find the routable prefix in a single rule line
///
/// Every whitespace separated token is tried as a CIDR and the last one
/// that parses (skipping the default route) wins. For rules carrying both
/// a source and destination this picks the destination, e.g.
/// `-A NF-INTERCEPT -s 0.0.0.0/0 -d 10.0.0.0/24 ...` -> 10.0.0.0/24
pub fn parse_rule(rule: &str) -> Option<IpNetwork> {
    rule.split_whitespace()
        .filter_map(parse_cidr)
        .filter(|network| !is_default_route(network))
        .last()
}

/// Collect the prefixes from a listing, de-duplicated in first-seen order
pub fn parse_rules<I, S>(rules: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    rules
        .into_iter()
        .filter_map(|rule| parse_rule(rule.as_ref()))
        .map(|network| network.to_string())
        .unique()
        .collect()
}
