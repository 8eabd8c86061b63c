//! Transport address plumbing.

mod udp;

pub use udp::UdpAddress;
