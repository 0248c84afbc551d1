//! NSG composition.
//!
//! Resolves a region's policy table into ordered NSG rules, declares the NSG and
//! associates it with every workload subnet.

use super::SubnetLookup;
use crate::config;
use crate::error::{Result, TopologyError};
use crate::graph::GraphBuilder;
use crate::models::{
    Access, Ipv4, NodeHandle, PolicyEntry, Protocol, RegionSpec, ResourceKind, ResourceNode,
    SecurityRule,
};
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Accepts `*`, a single port or an inclusive `low-high` range.
static PORT_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_port_regex() -> &'static Regex {
    PORT_REGEX.get_or_init(|| {
        Regex::new(r"^(\*|(\d{1,5})(?:-(\d{1,5}))?)$").expect("Invalid Regex")
    })
}

/// Parse a port token into an inclusive range.
fn parse_port_range(rule: &str, port: &str) -> Result<(u32, u32)> {
    let invalid = || TopologyError::InvalidPortRange {
        rule: rule.to_string(),
        port: port.to_string(),
    };
    let caps = get_port_regex().captures(port.trim()).ok_or_else(invalid)?;
    if caps.get(2).is_none() {
        return Ok((0, 65535));
    }
    let low: u32 = caps[2].parse().map_err(|_| invalid())?;
    let high: u32 = match caps.get(3) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => low,
    };
    if high > 65535 || low > high {
        return Err(invalid());
    }
    Ok((low, high))
}

/// The region's NSG and its subnet associations.
#[derive(Debug, Clone)]
pub struct Nsg {
    pub handle: NodeHandle,
    pub name: String,
    pub rules: Vec<SecurityRule>,
    pub associations: Vec<NodeHandle>,
}

/// Resolve a policy table into rules, in table order.
///
/// Priorities are `200 + 10 * index` unless an entry pins one. Fails with
/// `RuleConflict` on a repeated priority, on an entry naming no sources or no
/// destinations, or on a deny shadowed by an allow that is evaluated first and
/// covers the same traffic. An entry without ports is an `InvalidPortRange`.
pub fn compose_rules(
    nsg: &str,
    policy: &[PolicyEntry],
    lookup: &SubnetLookup,
) -> Result<Vec<SecurityRule>> {
    let mut rules = Vec::with_capacity(policy.len());
    let mut priorities: HashMap<u32, &str> = HashMap::new();

    for (index, entry) in policy.iter().enumerate() {
        let priority = entry
            .priority
            .unwrap_or(config::BASE_RULE_PRIORITY + config::RULE_PRIORITY_STEP * index as u32);
        if !(config::MIN_RULE_PRIORITY..=config::MAX_RULE_PRIORITY).contains(&priority) {
            return Err(TopologyError::PriorityOutOfRange {
                rule: entry.name.clone(),
                priority,
            });
        }
        if let Some(other) = priorities.insert(priority, &entry.name) {
            return Err(TopologyError::RuleConflict {
                nsg: nsg.to_string(),
                reason: format!("'{other}' and '{}' share priority {priority}", entry.name),
            });
        }
        let sides = [("sources", &entry.sources), ("destinations", &entry.destinations)];
        for (side, segments) in sides {
            if segments.is_empty() {
                return Err(TopologyError::RuleConflict {
                    nsg: nsg.to_string(),
                    reason: format!("'{}' has no {side}", entry.name),
                });
            }
        }
        if entry.ports.is_empty() {
            return Err(TopologyError::InvalidPortRange {
                rule: entry.name.clone(),
                port: String::new(),
            });
        }
        for port in &entry.ports {
            parse_port_range(&entry.name, port)?;
        }

        rules.push(SecurityRule {
            name: entry.name.clone(),
            priority,
            direction: entry.direction,
            access: entry.access,
            protocol: entry.protocol,
            source_port_range: "*".to_string(),
            destination_port_ranges: entry.ports.clone(),
            source_address_prefixes: resolve(&entry.sources, lookup)?,
            destination_address_prefixes: resolve(&entry.destinations, lookup)?,
            description: entry.description.clone(),
        });
    }

    check_shadowed_denies(nsg, &rules)?;
    Ok(rules)
}

fn resolve(segments: &[String], lookup: &SubnetLookup) -> Result<Vec<Ipv4>> {
    segments
        .iter()
        .map(|name| lookup.get(name).map(|e| e.cidr))
        .collect()
}

fn covers_prefixes(wide: &[Ipv4], narrow: &[Ipv4]) -> bool {
    narrow.iter().all(|n| wide.iter().any(|w| w.contains(n)))
}

fn covers_ports(rule: &SecurityRule, wide: &[String], narrow: &[String]) -> Result<bool> {
    let wide = wide
        .iter()
        .map(|p| parse_port_range(&rule.name, p))
        .collect::<Result<Vec<_>>>()?;
    for port in narrow {
        let (low, high) = parse_port_range(&rule.name, port)?;
        if !wide.iter().any(|(wl, wh)| *wl <= low && high <= *wh) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A deny must be evaluated before any allow that would otherwise match all of its
/// traffic, or it never takes effect.
fn check_shadowed_denies(nsg: &str, rules: &[SecurityRule]) -> Result<()> {
    for deny in rules.iter().filter(|r| r.access == Access::Deny) {
        for allow in rules.iter().filter(|r| {
            r.access == Access::Allow && r.direction == deny.direction && r.priority < deny.priority
        }) {
            if (allow.protocol == deny.protocol || allow.protocol == Protocol::Any)
                && covers_prefixes(&allow.source_address_prefixes, &deny.source_address_prefixes)
                && covers_prefixes(
                    &allow.destination_address_prefixes,
                    &deny.destination_address_prefixes,
                )
                && covers_ports(
                    allow,
                    &allow.destination_port_ranges,
                    &deny.destination_port_ranges,
                )?
            {
                return Err(TopologyError::RuleConflict {
                    nsg: nsg.to_string(),
                    reason: format!(
                        "deny '{}' ({}) is shadowed by allow '{}' ({})",
                        deny.name, deny.priority, allow.name, allow.priority
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Declare the region's NSG and one association per workload subnet.
///
/// Firewall, gateway and app-gateway subnets are isolated by routing and get no
/// association.
pub fn build_security_policy(
    region: &RegionSpec,
    lookup: &SubnetLookup,
    graph: &mut GraphBuilder,
) -> Result<Nsg> {
    let name = region.nsg_name();
    let rules = compose_rules(&name, &region.policy, lookup)?;

    let node = ResourceNode::new(ResourceKind::NSG, &name)
        .attr("location", region.location.as_str())
        .attr("resource_group", region.resource_group())
        .attr("security_rules", json!(rules))
        .protect(region.protect_network);
    let handle = graph.declare_after(node, &[lookup.vnet()])?;

    let mut associations = Vec::new();
    for (subnet_name, subnet) in lookup.workload() {
        let association = ResourceNode::new(
            ResourceKind::NSGAssociation,
            format!("{name}-{subnet_name}"),
        )
        .attr("subnet", subnet_name)
        .attr("network_security_group", name.as_str())
        .protect(region.protect_network);
        associations.push(graph.declare_after(association, &[handle, subnet.handle])?);
    }

    log::info!(
        "Region {}: {name} with {} rules, {} subnet associations",
        region.id,
        rules.len(),
        associations.len()
    );
    Ok(Nsg {
        handle,
        name,
        rules,
        associations,
    })
}
