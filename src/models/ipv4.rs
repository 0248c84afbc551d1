//! IPv4 address and CIDR notation utilities.
//!
//! Provides [`Ipv4`] struct for representing IPv4 network blocks, along with the
//! arithmetic the address planner needs: alignment, containment and overlap.

use crate::error::{Result, TopologyError};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use azure_topology_planner::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> Result<u32> {
    if len > MAX_LENGTH {
        Err(TopologyError::InvalidCidr(format!(
            "network length /{len} is too long"
        )))
    } else {
        Ok(mask_bits(len))
    }
}

fn mask_bits(len: u8) -> u32 {
    let right_len = MAX_LENGTH - len.min(MAX_LENGTH);
    let all_bits = u32::MAX as u64;
    ((all_bits >> right_len) << right_len) as u32
}

/// Number of addresses in a block of the given prefix length.
pub fn block_size(len: u8) -> Result<u64> {
    if len > MAX_LENGTH {
        return Err(TopologyError::InvalidCidr(format!(
            "network length /{len} is too long"
        )));
    }
    Ok(1u64 << (MAX_LENGTH - len))
}

/// Calculate the number of usable host addresses in an Azure subnet.
///
/// Azure reserves 5 IP addresses per subnet (network, broadcast, gateway, and 2 DNS).
pub fn num_az_hosts(len: u8) -> Result<u64> {
    if len >= MAX_LENGTH - 2 {
        // /29 = 8 IPs, 3 usable; anything smaller leaves nothing
        Err(TopologyError::InvalidCidr(format!(
            "network length /{len} is too long for an Azure subnet"
        )))
    } else {
        Ok((1u64 << (MAX_LENGTH - len)) - 5)
    }
}

/// IPv4 network block in CIDR notation.
#[derive(Eq, Ord, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    /// The IPv4 address.
    pub addr: Ipv4Addr,
    /// The subnet mask length (0-32).
    pub mask: u8,
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4::new(&s).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g., "10.0.0.0/24").
    pub fn new(addr_cidr: &str) -> Result<Ipv4> {
        let addr_cidr = addr_cidr.trim();
        let (addr, mask) = addr_cidr
            .split_once('/')
            .ok_or_else(|| TopologyError::InvalidCidr(format!("missing '/' in '{addr_cidr}'")))?;
        let addr = Ipv4Addr::from_str(addr)
            .map_err(|_| TopologyError::InvalidCidr(format!("invalid address '{addr}'")))?;
        let mask = u8::from_str(mask)
            .map_err(|_| TopologyError::InvalidCidr(format!("invalid subnet mask '{mask}'")))?;
        if mask > MAX_LENGTH {
            return Err(TopologyError::InvalidCidr(format!(
                "network length /{mask} is too long"
            )));
        }
        Ok(Ipv4 { addr, mask })
    }

    /// Create a block from its first address, rejecting host bits.
    pub fn from_network(addr: Ipv4Addr, mask: u8) -> Result<Ipv4> {
        let ipv4 = Ipv4 { addr, mask };
        ipv4.require_aligned()?;
        Ok(ipv4)
    }

    /// True when the address is the block's network address.
    pub fn is_aligned(&self) -> bool {
        self.addr == self.lo()
    }

    pub fn require_aligned(&self) -> Result<()> {
        get_cidr_mask(self.mask)?;
        if self.is_aligned() {
            Ok(())
        } else {
            Err(TopologyError::InvalidCidr(format!(
                "{self} has host bits set, expected {}/{}",
                self.lo(),
                self.mask
            )))
        }
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> u64 {
        1u64 << (MAX_LENGTH - self.mask.min(MAX_LENGTH))
    }

    /// Get the highest (broadcast) address in the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) | !mask_bits(self.mask))
    }

    /// Get the lowest (network) address in the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & mask_bits(self.mask))
    }

    /// The address `offset` positions into the block, if it stays inside.
    pub fn host(&self, offset: u32) -> Option<Ipv4Addr> {
        if (offset as u64) < self.size() {
            Some(Ipv4Addr::from(u32::from(self.lo()) + offset))
        } else {
            None
        }
    }

    /// True when `other` lies entirely inside this block.
    pub fn contains(&self, other: &Ipv4) -> bool {
        self.mask <= other.mask && self.lo() <= other.lo() && other.hi() <= self.hi()
    }

    /// True when the two blocks share at least one address.
    pub fn overlaps(&self, other: &Ipv4) -> bool {
        self.lo() <= other.hi() && other.lo() <= self.hi()
    }
}

impl FromStr for Ipv4 {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Ipv4> {
        Ipv4::new(s)
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl PartialEq for Ipv4 {
    fn eq(&self, other: &Ipv4) -> bool {
        self.addr == other.addr && self.mask == other.mask
    }
}

impl PartialOrd for Ipv4 {
    fn partial_cmp(&self, other: &Ipv4) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
