//! 도메인 타입 -- 구독 필터에 쓰이는 네트워크 표현
//!
//! [`IpNetwork`]는 `주소/프리픽스` 형식의 CIDR 네트워크입니다.
//! 파싱 시 호스트 비트를 마스킹하므로 `192.168.1.77/24`는
//! `192.168.1.0/24`와 같은 네트워크가 됩니다.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::NetworkParseError;

/// CIDR 네트워크
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    /// 네트워크 주소 (호스트 비트가 0으로 마스킹됨)
    network: IpAddr,
    /// 프리픽스 길이
    prefix_len: u8,
}

impl IpNetwork {
    /// 주소와 프리픽스 길이로 네트워크를 생성합니다.
    ///
    /// IPv4-mapped IPv6 주소는 IPv4로 정규화되며, 프리픽스도 그에 맞게 조정됩니다.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, NetworkParseError> {
        let (addr, prefix_len) = match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) if prefix_len >= 96 => (IpAddr::V4(v4), prefix_len - 96),
                _ => (addr, prefix_len),
            },
            IpAddr::V4(_) => (addr, prefix_len),
        };

        let network = match addr {
            IpAddr::V4(v4) => {
                if prefix_len > 32 {
                    return Err(NetworkParseError {
                        input: format!("{addr}/{prefix_len}"),
                        reason: "IPv4 prefix length must be 0-32".to_owned(),
                    });
                }
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(prefix_len)))
            }
            IpAddr::V6(v6) => {
                if prefix_len > 128 {
                    return Err(NetworkParseError {
                        input: format!("{addr}/{prefix_len}"),
                        reason: "IPv6 prefix length must be 0-128".to_owned(),
                    });
                }
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(prefix_len)))
            }
        };

        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// 네트워크 주소를 반환합니다.
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// 프리픽스 길이를 반환합니다.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// 주소가 이 네트워크에 속하는지 확인합니다.
    ///
    /// 주소는 비교 전에 정규화되므로 `::ffff:192.168.1.5`는
    /// `192.168.1.0/24`에 속합니다. 주소 체계가 다르면 `false`입니다.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                u32::from(ip) & v4_mask(self.prefix_len) == u32::from(net)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                u128::from(ip) & v6_mask(self.prefix_len) == u128::from(net)
            }
            _ => false,
        }
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n)),
    }
}

fn v6_mask(prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        n => u128::MAX << (128 - u32::from(n)),
    }
}

impl FromStr for IpNetwork {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| NetworkParseError {
            input: s.to_owned(),
            reason: reason.to_owned(),
        };

        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("missing '/prefix' suffix"))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|_| invalid("address is not a valid IP"))?;
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("prefix length must be a decimal number"));
        }
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| invalid("prefix length out of range"))?;

        Self::new(addr, prefix_len).map_err(|e| invalid(&e.reason))
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl Serialize for IpNetwork {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpNetwork {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_masks_host_bits() {
        let net: IpNetwork = "192.168.1.77/24".parse().unwrap();
        assert_eq!(net.network(), ip("192.168.1.0"));
        assert_eq!(net.prefix_len(), 24);
        assert_eq!(net.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn contains_ipv4() {
        let net: IpNetwork = "192.168.1.0/24".parse().unwrap();
        assert!(net.contains(ip("192.168.1.99")));
        assert!(net.contains(ip("192.168.1.255")));
        assert!(!net.contains(ip("192.168.2.1")));
        assert!(!net.contains(ip("10.0.0.5")));
    }

    #[test]
    fn contains_ipv4_mapped_host() {
        let net: IpNetwork = "172.16.0.0/16".parse().unwrap();
        assert!(net.contains(ip("::ffff:172.16.3.4")));
    }

    #[test]
    fn zero_prefix_matches_everything_in_family() {
        let v4: IpNetwork = "0.0.0.0/0".parse().unwrap();
        assert!(v4.contains(ip("8.8.8.8")));
        assert!(!v4.contains(ip("2001:db8::1")));

        let v6: IpNetwork = "::/0".parse().unwrap();
        assert!(v6.contains(ip("2001:db8::1")));
    }

    #[test]
    fn host_prefix_matches_single_address() {
        let net: IpNetwork = "10.1.2.3/32".parse().unwrap();
        assert!(net.contains(ip("10.1.2.3")));
        assert!(!net.contains(ip("10.1.2.4")));
    }

    #[test]
    fn contains_ipv6() {
        let net: IpNetwork = "2001:db8::/32".parse().unwrap();
        assert!(net.contains(ip("2001:db8:1::5")));
        assert!(!net.contains(ip("2001:db9::5")));
    }

    #[test]
    fn mapped_network_is_canonicalized() {
        let net: IpNetwork = "::ffff:192.168.0.0/112".parse().unwrap();
        assert_eq!(net.to_string(), "192.168.0.0/16");
        assert!(net.contains(ip("192.168.44.1")));
    }

    #[test]
    fn rejects_malformed_networks() {
        for bad in [
            "192.168.1.0",
            "192.168.1.0/",
            "192.168.1.0/33",
            "192.168.1/24",
            "not-a-net/8",
            "10.0.0.0/-1",
            "10.0.0.0/+8",
            "2001:db8::/129",
            "",
        ] {
            assert!(bad.parse::<IpNetwork>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn parse_error_names_input() {
        let err = "10.0.0.0/40".parse::<IpNetwork>().unwrap_err();
        assert_eq!(err.input, "10.0.0.0/40");
        assert!(err.to_string().contains("10.0.0.0/40"));
    }

    #[test]
    fn serde_uses_cidr_string() {
        let net: IpNetwork = "10.0.0.0/8".parse().unwrap();
        let json = serde_json::to_string(&net).unwrap();
        assert_eq!(json, "\"10.0.0.0/8\"");
        let back: IpNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(back, net);
    }
}
