use crate::attributes::RouteAttributes;
use crate::error::{AppError, AppErrorKind};
use ipnetwork::IpNetwork;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Numeric form of a network address, used to walk the trie bit by bit.
pub enum BitIp {
    Ipv4(u32),
    Ipv6(u128),
}

impl BitIp {
    pub fn r_shift(&self, n: u8) -> Self {
        match self {
            BitIp::Ipv4(ip) => BitIp::Ipv4(*ip >> n),
            BitIp::Ipv6(ip) => BitIp::Ipv6(*ip >> n),
        }
    }

    pub fn b_and(self, rhs: u8) -> u8 {
        match self {
            BitIp::Ipv4(ip) => (ip & rhs as u32) as u8,
            BitIp::Ipv6(ip) => (ip & rhs as u128) as u8,
        }
    }

    fn widen(&self) -> u128 {
        match self {
            BitIp::Ipv4(ip) => *ip as u128,
            BitIp::Ipv6(ip) => *ip,
        }
    }

    /// Zeroes every bit beyond the first `prefix_len` bits.
    fn masked(&self, prefix_len: u8) -> Self {
        match self {
            BitIp::Ipv4(ip) => {
                BitIp::Ipv4(ip & u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0))
            }
            BitIp::Ipv6(ip) => {
                BitIp::Ipv6(ip & u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0))
            }
        }
    }

    fn to_addr(&self) -> IpAddr {
        match self {
            BitIp::Ipv4(ip) => IpAddr::V4(Ipv4Addr::from_bits(*ip)),
            BitIp::Ipv6(ip) => IpAddr::V6(Ipv6Addr::from_bits(*ip)),
        }
    }
}

/// The address family of a prefix, fixed for the lifetime of a trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Provides the maximum allowable prefix length for the family.
    ///
    /// # Returns
    /// - `32` for IPv4.
    /// - `128` for IPv6.
    pub fn max_prefix(&self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }

    /// The zero-length prefix covering the whole address space (`0.0.0.0/0` or `::/0`).
    pub fn root(&self) -> Prefix {
        let addr = match self {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        Prefix {
            addr,
            prefix_len: 0,
            attributes: None,
        }
    }

    fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

impl Display for AddressFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// A normalized IP prefix (host bits zeroed), optionally carrying BGP route attributes.
///
/// Equality, ordering and hashing only look at the address and the mask length.
/// Use [`Prefix::is_identical`] to compare the attributes as well.
#[derive(Debug, Clone)]
pub struct Prefix {
    addr: IpAddr,
    prefix_len: u8,
    attributes: Option<RouteAttributes>,
}

impl Prefix {
    /// Creates a plain prefix from a parsed network, zeroing the host bits.
    pub fn new(network: IpNetwork) -> Self {
        Self::from(network)
    }

    /// Creates a plain prefix from an address and a mask length, zeroing every bit beyond the mask.
    ///
    /// # Errors
    /// Returns a `ParseError` if the mask length is out of range for the address family.
    pub fn from_parts(addr: IpAddr, prefix_len: u8) -> Result<Self, AppError> {
        Ok(Self::from(IpNetwork::new(addr, prefix_len)?))
    }

    /// Creates a plain prefix from raw address bytes (4 for IPv4, 16 for IPv6).
    ///
    /// # Errors
    /// Returns a `ParseError` for an empty or wrongly sized buffer, or an out of range mask length.
    pub fn from_bytes(bytes: &[u8], prefix_len: u8) -> Result<Self, AppError> {
        let addr = if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
            IpAddr::V4(Ipv4Addr::from(octets))
        } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
            IpAddr::V6(Ipv6Addr::from(octets))
        } else {
            return Err(AppError::new(
                AppErrorKind::ParseError,
                format!(
                    "address buffer must be 4 or 16 bytes long, got {}",
                    bytes.len()
                )
                .as_str(),
            ));
        };
        Self::from_parts(addr, prefix_len)
    }

    /// Creates a plain prefix from address bits, most significant first.
    ///
    /// Up to 32 bits make an IPv4 address, up to 128 an IPv6 address; missing
    /// trailing bits are zero.
    ///
    /// # Errors
    /// Returns a `ParseError` for an empty or oversized buffer, or a mask
    /// longer than the bits given.
    pub fn from_bits(bits: &[bool], prefix_len: u8) -> Result<Self, AppError> {
        let family = match bits.len() {
            0 => {
                return Err(AppError::new(
                    AppErrorKind::ParseError,
                    "bit buffer cannot be empty",
                ));
            }
            1..=32 => AddressFamily::Ipv4,
            33..=128 => AddressFamily::Ipv6,
            len => {
                return Err(AppError::new(
                    AppErrorKind::ParseError,
                    format!("bit buffer must hold at most 128 bits, got {len}").as_str(),
                ));
            }
        };
        if usize::from(prefix_len) > bits.len() {
            return Err(AppError::new(
                AppErrorKind::ParseError,
                format!(
                    "mask length {prefix_len} exceeds the {} bits given",
                    bits.len()
                )
                .as_str(),
            ));
        }

        let width = usize::from(family.max_prefix());
        let value = bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .fold(0u128, |acc, (i, _)| acc | (1u128 << (width - 1 - i)));
        let addr = match family {
            AddressFamily::Ipv4 => BitIp::Ipv4(value as u32),
            AddressFamily::Ipv6 => BitIp::Ipv6(value),
        }
        .to_addr();
        Self::from_parts(addr, prefix_len)
    }

    /// Returns the same prefix carrying the given route attributes.
    #[must_use]
    pub fn with_attributes(self, attributes: RouteAttributes) -> Self {
        Self {
            attributes: Some(attributes),
            ..self
        }
    }

    /// Returns the same prefix without any route attributes.
    #[must_use]
    pub fn without_attributes(&self) -> Self {
        Self {
            attributes: None,
            ..*self
        }
    }

    /// The network address, host bits zeroed.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// The prefix as an `IpNetwork`, without attributes.
    pub fn network(&self) -> IpNetwork {
        // the mask length was validated on construction
        IpNetwork::new(self.addr, self.prefix_len).unwrap_or_else(|_| IpNetwork::from(self.addr))
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn attributes(&self) -> Option<&RouteAttributes> {
        self.attributes.as_ref()
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.addr)
    }

    /// Retrieves the numeric representation (as `BitIp`) of the network address.
    pub fn network_addr(&self) -> BitIp {
        match self.addr {
            IpAddr::V4(addr) => BitIp::Ipv4(addr.to_bits()),
            IpAddr::V6(addr) => BitIp::Ipv6(addr.to_bits()),
        }
    }

    /// Returns the address bit at `depth`, counted from the most significant bit.
    pub(crate) fn bit(&self, depth: u8) -> usize {
        let n = self.family().max_prefix() - 1 - depth;
        self.network_addr().r_shift(n).b_and(1) as usize
    }

    /// Returns the plain covering prefix with the mask shortened to `prefix_len`.
    pub(crate) fn truncate(&self, prefix_len: u8) -> Self {
        let prefix_len = prefix_len.min(self.prefix_len);
        Self {
            addr: self.network_addr().masked(prefix_len).to_addr(),
            prefix_len,
            attributes: None,
        }
    }

    /// Checks whether `other` lies inside this prefix (a prefix contains itself).
    pub fn contains(&self, other: &Prefix) -> bool {
        self.family() == other.family()
            && self.prefix_len <= other.prefix_len
            && other.truncate(self.prefix_len) == *self
    }

    /// Exact-value equality: same network, same mask and the same route attributes.
    pub fn is_identical(&self, other: &Prefix) -> bool {
        self == other && self.attributes == other.attributes
    }

    fn sort_key(&self) -> (AddressFamily, u128, u8) {
        (self.family(), self.network_addr().widen(), self.prefix_len)
    }
}

impl From<IpNetwork> for Prefix {
    /// Converts a network into a plain prefix, dropping any host bits.
    fn from(value: IpNetwork) -> Self {
        Self {
            addr: value.network(),
            prefix_len: value.prefix(),
            attributes: None,
        }
    }
}

impl PartialEq for Prefix {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr && self.prefix_len == other.prefix_len
    }
}

impl Eq for Prefix {}

impl Hash for Prefix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
        self.prefix_len.hash(state);
    }
}

impl PartialOrd for Prefix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prefix {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Prefix {
    type Err = AppError;

    /// Parses CIDR notation (`10.0.0.0/24`, `2001:db8::/32`). A bare address is a host prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::new(
                AppErrorKind::ParseError,
                "prefix cannot be empty",
            ));
        }
        let (addr, mask) = match s.split_once('/') {
            Some((addr, mask)) => (addr, Some(mask)),
            None => (s, None),
        };
        let addr = addr.parse::<IpAddr>().map_err(|_| {
            AppError::new(
                AppErrorKind::ParseError,
                format!("invalid address: {s}").as_str(),
            )
        })?;
        // dotted netmasks are not accepted, only a mask length
        let prefix_len = match mask {
            None => AddressFamily::of(&addr).max_prefix(),
            Some("") => {
                return Err(AppError::new(
                    AppErrorKind::ParseError,
                    format!("missing mask length: {s}").as_str(),
                ));
            }
            Some(mask) => mask.parse::<u8>().map_err(|_| {
                AppError::new(
                    AppErrorKind::ParseError,
                    format!("invalid mask length: {s}").as_str(),
                )
            })?,
        };
        Ok(Self::from(IpNetwork::new(addr, prefix_len)?))
    }
}
