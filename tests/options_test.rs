//! Socket option round-trips through the native encoding.

use syncnet::socket::options::{self, SocketOption};
use syncnet::socket::{AddressFamily, Protocol, Socket, SocketType};
use syncnet::NetError;

fn tcp_v4() -> Socket {
    Socket::open(AddressFamily::Ipv4, SocketType::Stream, Protocol::Tcp).unwrap()
}

#[test]
fn test_boolean_options_roundtrip() {
    let socket = tcp_v4();
    for option in options::boolean_tcp_options() {
        for value in [true, false, true] {
            socket.set_option(&option, value).unwrap();
            assert_eq!(
                socket.get_option(&option).unwrap(),
                value,
                "{} did not round-trip {}",
                option.name(),
                value
            );
        }
    }
}

#[test]
fn test_broadcast_on_datagram_socket() {
    let socket = Socket::open(AddressFamily::Ipv4, SocketType::Datagram, Protocol::Udp).unwrap();
    socket.set_option(&options::BROADCAST, true).unwrap();
    assert!(socket.get_option(&options::BROADCAST).unwrap());
    socket.set_option(&options::BROADCAST, false).unwrap();
    assert!(!socket.get_option(&options::BROADCAST).unwrap());
}

#[test]
fn test_ipv6_only_roundtrip() {
    let socket = match Socket::open(AddressFamily::Ipv6, SocketType::Stream, Protocol::Tcp) {
        Ok(socket) => socket,
        Err(NetError::AddressFamilyNotSupported { .. }) => {
            eprintln!("IPv6 not supported here, skipping");
            return;
        }
        Err(e) => panic!("open failed: {:?}", e),
    };
    for value in [true, false] {
        socket.set_option(&options::IPV6_ONLY, value).unwrap();
        assert_eq!(socket.get_option(&options::IPV6_ONLY).unwrap(), value);
    }
}

#[test]
fn test_buffer_sizes_roundtrip_allowing_kernel_doubling() {
    let socket = tcp_v4();
    for option in [options::RECEIVE_BUFFER_SIZE, options::SEND_BUFFER_SIZE] {
        let requested = 65_536u64;
        socket.set_option(&option, requested).unwrap();
        let reported = socket.get_option(&option).unwrap();
        assert!(
            reported == requested || reported == requested * 2,
            "{}: set {}, got {}",
            option.name(),
            requested,
            reported
        );
    }
}

#[test]
fn test_ttl_roundtrip() {
    let socket = tcp_v4();
    socket.set_option(&options::IP_TTL, 42).unwrap();
    assert_eq!(socket.get_option(&options::IP_TTL).unwrap(), 42);
}

#[test]
fn test_ipv6_hop_limit_roundtrip() {
    let socket = match Socket::open(AddressFamily::Ipv6, SocketType::Stream, Protocol::Tcp) {
        Ok(socket) => socket,
        Err(NetError::AddressFamilyNotSupported { .. }) => {
            eprintln!("IPv6 not supported here, skipping");
            return;
        }
        Err(e) => panic!("open failed: {:?}", e),
    };
    for hops in [42u64, 1, 255] {
        socket.set_option(&options::IPV6_UNICAST_HOPS, hops).unwrap();
        assert_eq!(socket.get_option(&options::IPV6_UNICAST_HOPS).unwrap(), hops);
    }
}

#[test]
fn test_option_on_closed_socket() {
    let socket = tcp_v4();
    socket.close().unwrap();
    assert!(matches!(
        socket.get_option(&options::TCP_NO_DELAY),
        Err(NetError::SocketClosed)
    ));
    assert!(matches!(
        socket.set_option(&options::KEEP_ALIVE, true),
        Err(NetError::SocketClosed)
    ));
}

#[test]
fn test_unsupported_level_is_os_error() {
    // TCP options do not apply to a UDP socket.
    let socket = Socket::open(AddressFamily::Ipv4, SocketType::Datagram, Protocol::Udp).unwrap();
    let err = socket.set_option(&options::TCP_NO_DELAY, true).unwrap_err();
    assert!(err.os_code().is_some(), "got {:?}", err);
}
