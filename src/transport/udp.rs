//! UDP endpoint resolution.
//!
//! Endpoints are `host:port`, optionally prefixed with a source
//! interface as `interface;group:port` for multicast. When binding,
//! `*` stands for the wildcard address and port. IPv4 only.
//!
//! The resolved endpoint splits into a *bind* address and a
//! *destination* address: a multicast group is always the destination
//! with the interface (or ANY) bound; a unicast target is bound
//! directly when binding and sent to from ANY when connecting.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};

use crate::error::{Result, ZmtpError};

/// A resolved UDP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpAddress {
    source: String,
    bind_addr: SocketAddrV4,
    dest_addr: SocketAddrV4,
    interface: Ipv4Addr,
    is_multicast: bool,
}

impl UdpAddress {
    /// Resolve `name`, either for binding (`bind` true) or connecting.
    ///
    /// Wildcards are only meaningful when binding; a connecting
    /// endpoint must name a concrete host and port. DNS is consulted
    /// only on the connect path, so bind endpoints stay literal.
    pub fn resolve(name: &str, bind: bool) -> Result<Self> {
        // Everything before the last ';' is a source interface.
        let (interface, target) = match name.rfind(';') {
            Some(at) => (Some(&name[..at]), &name[at + 1..]),
            None => (None, name),
        };

        let interface_ip = match interface {
            Some(spec) => {
                let ip = parse_interface(spec)?;
                if ip.is_multicast() {
                    // A multicast address cannot be a source.
                    return Err(invalid(name));
                }
                Some(ip)
            }
            None => None,
        };

        let (host, port) = split_host_port(target).ok_or_else(|| invalid(name))?;

        let port = match port {
            "*" if bind => 0,
            _ => port.parse::<u16>().map_err(|_| invalid(name))?,
        };

        let target_ip = resolve_host(host, port, bind).ok_or_else(|| invalid(name))?;
        let is_multicast = target_ip.is_multicast();

        let (bind_ip, dest_ip) = match interface_ip {
            Some(interface_ip) => {
                // An explicit interface only makes sense for a
                // multicast destination.
                if !is_multicast {
                    return Err(invalid(name));
                }
                (interface_ip, target_ip)
            }
            None => {
                if is_multicast {
                    (Ipv4Addr::UNSPECIFIED, target_ip)
                } else if bind {
                    (target_ip, target_ip)
                } else {
                    (Ipv4Addr::UNSPECIFIED, target_ip)
                }
            }
        };

        Ok(Self {
            source: target.to_string(),
            bind_addr: SocketAddrV4::new(bind_ip, port),
            dest_addr: SocketAddrV4::new(dest_ip, port),
            interface: interface_ip.unwrap_or(Ipv4Addr::UNSPECIFIED),
            is_multicast,
        })
    }

    /// Address to bind the local socket to.
    #[inline]
    pub fn bind_addr(&self) -> SocketAddrV4 {
        self.bind_addr
    }

    /// Address datagrams are sent to.
    #[inline]
    pub fn dest_addr(&self) -> SocketAddrV4 {
        self.dest_addr
    }

    /// Multicast group, when the destination is one.
    pub fn multicast_ip(&self) -> Option<Ipv4Addr> {
        self.is_multicast.then_some(*self.dest_addr.ip())
    }

    /// Source interface for multicast membership.
    #[inline]
    pub fn interface_ip(&self) -> Ipv4Addr {
        self.interface
    }

    /// Whether the destination is a multicast group.
    #[inline]
    pub fn is_multicast(&self) -> bool {
        self.is_multicast
    }
}

impl fmt::Display for UdpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(name: &str) -> ZmtpError {
    ZmtpError::InvalidEndpoint(name.to_string())
}

/// Split `host:port` on the last colon.
fn split_host_port(target: &str) -> Option<(&str, &str)> {
    let at = target.rfind(':')?;
    let (host, port) = (&target[..at], &target[at + 1..]);
    if host.is_empty() || port.is_empty() {
        return None;
    }
    Some((host, port))
}

/// Interface specifiers are literal addresses or `*`; no DNS.
fn parse_interface(spec: &str) -> Result<Ipv4Addr> {
    if spec == "*" {
        return Ok(Ipv4Addr::UNSPECIFIED);
    }
    spec.parse::<Ipv4Addr>()
        .map_err(|_| ZmtpError::InvalidEndpoint(spec.to_string()))
}

fn resolve_host(host: &str, port: u16, bind: bool) -> Option<Ipv4Addr> {
    if host == "*" {
        return bind.then_some(Ipv4Addr::UNSPECIFIED);
    }
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Some(ip);
    }
    if bind {
        // Bind endpoints are restricted to literals.
        return None;
    }
    (host, port)
        .to_socket_addrs()
        .ok()?
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
}
