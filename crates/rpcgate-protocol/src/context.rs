//! Caller identity: the network address a request arrived from.
//!
//! The transport layer derives a [`CallerAddress`] from the peer address of
//! each HTTP call and hands it to the dispatcher, which exposes it to method
//! handlers through their call context.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Raw fixed-length binary form of a client IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallerAddress {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl CallerAddress {
    /// Packed address bytes: 4 for IPv4, 16 for IPv6.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::V4(octets) => octets,
            Self::V6(octets) => octets,
        }
    }

    pub fn ip(&self) -> IpAddr {
        match *self {
            Self::V4(octets) => IpAddr::V4(Ipv4Addr::from(octets)),
            Self::V6(octets) => IpAddr::V6(Ipv6Addr::from(octets)),
        }
    }

    /// Parse a textual address such as `"10.0.0.1"` or `"::1"`.
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<IpAddr>().ok().map(Self::from)
    }
}

impl From<IpAddr> for CallerAddress {
    fn from(ip: IpAddr) -> Self {
        // IPv4-mapped IPv6 peers (dual-stack listeners) are reported as IPv4.
        match ip.to_canonical() {
            IpAddr::V4(v4) => Self::V4(v4.octets()),
            IpAddr::V6(v6) => Self::V6(v6.octets()),
        }
    }
}

impl std::fmt::Display for CallerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ip())
    }
}
