//! SSRF defense-in-depth layers 1-3 (spec §4.5): scheme allow-list,
//! hostname deny-list, IP-address deny-list.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::Ipv4Network;
use url::Url;

use crate::error::InfraError;

const BLOCKED_HOSTNAME_LABELS: &[&str] = &["localhost", "loopback", "broadcasthost", "local", "internal", "intranet", "private", "corp", "home", "lan"];

const BLOCKED_TLDS: &[&str] = &[".local", ".localhost", ".internal", ".intranet", ".corp", ".home", ".lan"];

/// Layer 1: scheme allow-list (spec §4.5.1, default `https` only).
pub fn check_scheme(url: &Url, allowed_schemes: &[String]) -> Result<(), InfraError> {
    if allowed_schemes.iter().any(|s| s.eq_ignore_ascii_case(url.scheme())) {
        Ok(())
    } else {
        Err(InfraError::SchemeBlocked(url.scheme().to_owned()))
    }
}

/// Layer 2: hostname deny-list (spec §4.5.2).
///
/// Blocks exact reserved labels, reserved TLD suffixes, and bare
/// single-label hostnames that are not themselves IP literals.
pub fn check_hostname(url: &Url) -> Result<(), InfraError> {
    let host = url.host_str().ok_or_else(|| InfraError::HostnameBlocked(String::new()))?;
    let lower = host.to_ascii_lowercase();

    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    if BLOCKED_HOSTNAME_LABELS.contains(&lower.as_str()) {
        return Err(InfraError::HostnameBlocked(host.to_owned()));
    }

    if BLOCKED_TLDS.iter().any(|tld| lower.ends_with(tld)) {
        return Err(InfraError::HostnameBlocked(host.to_owned()));
    }

    if !lower.contains('.') {
        return Err(InfraError::HostnameBlocked(host.to_owned()));
    }

    Ok(())
}

/// Layer 3: IP-address deny-list (spec §4.5.3), applied to every resolved
/// address for a hostname (or to the literal, if the URL already
/// contains one).
pub fn check_ip(addr: IpAddr) -> Result<(), InfraError> {
    if is_blocked_ip(addr) {
        Err(InfraError::IpBlocked(addr))
    } else {
        Ok(())
    }
}

fn is_blocked_ip(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(addr: Ipv4Addr) -> bool {
    if addr.is_loopback() {
        return true;
    }
    const BLOCKED_NETS: &[(Ipv4Addr, u8)] = &[
        (Ipv4Addr::new(10, 0, 0, 0), 8),
        (Ipv4Addr::new(172, 16, 0, 0), 12),
        (Ipv4Addr::new(192, 168, 0, 0), 16),
        (Ipv4Addr::new(169, 254, 0, 0), 16),
        (Ipv4Addr::new(224, 0, 0, 0), 4),
    ];
    BLOCKED_NETS.iter().any(|(base, prefix)| {
        Ipv4Network::new(*base, *prefix).map(|net| net.contains(addr)).unwrap_or(false)
    })
}

fn is_blocked_ipv6(addr: Ipv6Addr) -> bool {
    if addr == Ipv6Addr::LOCALHOST {
        return true;
    }
    let segments = addr.segments();
    let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
    let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
    let is_multicast = (segments[0] & 0xff00) == 0xff00;
    is_link_local || is_unique_local || is_multicast
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_cloud_metadata_address() {
        assert!(check_ip("169.254.169.254".parse().unwrap()).is_err());
    }

    #[test]
    fn blocks_private_ranges() {
        assert!(check_ip("10.0.0.5".parse().unwrap()).is_err());
        assert!(check_ip("172.16.3.3".parse().unwrap()).is_err());
        assert!(check_ip("192.168.1.1".parse().unwrap()).is_err());
    }

    #[test]
    fn allows_public_address() {
        assert!(check_ip("93.184.216.34".parse().unwrap()).is_ok());
    }

    #[test]
    fn blocks_reserved_tld() {
        let url = Url::parse("https://service.internal/").unwrap();
        assert!(check_hostname(&url).is_err());
    }

    #[test]
    fn blocks_single_label_hostname() {
        let url = Url::parse("https://internalhost/").unwrap();
        assert!(check_hostname(&url).is_err());
    }

    #[test]
    fn allows_ordinary_hostname() {
        let url = Url::parse("https://issuer.example.com/").unwrap();
        assert!(check_hostname(&url).is_ok());
    }
}
