//! Host discovery for advertised URLs

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Address of the interface that routes to the outside world
///
/// Connecting a UDP socket sends no packets; it only asks the OS which
/// local address it would use. Returns `None` without a route.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).ok()?;
    socket.connect(SocketAddr::from(([8, 8, 8, 8], 80))).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Format a host for use in a URL authority
pub fn url_host(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    }
}

/// Host to advertise: explicit setting, then detected address, then localhost
pub fn advertised_host(configured: Option<&str>) -> String {
    match configured {
        Some(host) => host.to_owned(),
        None => local_ip().map(url_host).unwrap_or_else(|| "localhost".into()),
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;

    #[test]
    fn test_url_host() {
        assert_eq!(url_host(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))), "192.168.1.20");
        assert_eq!(url_host(IpAddr::V6(Ipv6Addr::LOCALHOST)), "[::1]");
    }

    #[test]
    fn test_configured_host_wins() {
        assert_eq!(advertised_host(Some("relay.example")), "relay.example");
    }

    #[test]
    fn test_detected_host_never_empty() {
        assert!(!advertised_host(None).is_empty());
    }
}
