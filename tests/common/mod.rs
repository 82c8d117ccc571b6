//! Helpers shared by the integration tests.

#![allow(dead_code)]

use boring::asn1::Asn1Time;
use boring::bn::BigNum;
use boring::ec::{EcGroup, EcKey};
use boring::hash::MessageDigest;
use boring::nid::Nid;
use boring::pkey::PKey;
use boring::x509::extension::{BasicConstraints, SubjectAlternativeName};
use boring::x509::{X509NameBuilder, X509};
use syncnet::socket::tls::{TlsContext, TlsEngine, TlsOptions, TlsRole};
use syncnet::socket::{AddressFamily, ConnectionInfo, Protocol, Socket, SocketType};

/// A PEM certificate and its PKCS#8 private key.
pub struct TestIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

/// Self-signed P-256 certificate valid for `localhost` and `127.0.0.1`.
pub fn self_signed(common_name: &str) -> TestIdentity {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(2).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(san).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    TestIdentity {
        cert_pem: builder.build().to_pem().unwrap(),
        key_pem: key.private_key_to_pem_pkcs8().unwrap(),
    }
}

pub fn server_context(identity: &TestIdentity, alpn: &[&str]) -> TlsContext {
    let mut builder = TlsOptions::builder()
        .identity(identity.cert_pem.clone(), identity.key_pem.clone());
    if !alpn.is_empty() {
        builder = builder.alpn_protocols(alpn);
    }
    TlsContext::new(TlsRole::Server, &builder.build()).unwrap()
}

/// Client that trusts exactly `identity` and nothing from the system.
pub fn trusting_client_context(identity: &TestIdentity, alpn: &[&str]) -> TlsContext {
    let mut builder = TlsOptions::builder()
        .use_system_roots(false)
        .add_trusted_certificate(identity.cert_pem.clone());
    if !alpn.is_empty() {
        builder = builder.alpn_protocols(alpn);
    }
    TlsContext::new(TlsRole::Client, &builder.build()).unwrap()
}

/// Moves every queued ciphertext byte from `from` into `to`.
pub fn transfer(from: &mut TlsEngine, to: &mut TlsEngine) -> usize {
    let mut buf = [0u8; 4096];
    let mut total = 0;
    loop {
        let n = from.outgoing(&mut buf).unwrap();
        if n == 0 {
            return total;
        }
        to.incoming(&buf[..n]).unwrap();
        total += n;
    }
}

pub const MAX_PUMP_ITERATIONS: usize = 16;

/// Runs both handshakes to completion, returning the iteration count.
pub fn pump_handshake(client: &mut TlsEngine, server: &mut TlsEngine) -> usize {
    for i in 1..=MAX_PUMP_ITERATIONS {
        let client_done = client.handshake().unwrap();
        transfer(client, server);
        let server_done = server.handshake().unwrap();
        transfer(server, client);
        if client_done && server_done && client.outgoing_pending() == 0 {
            return i;
        }
    }
    panic!("handshake did not complete in {} iterations", MAX_PUMP_ITERATIONS);
}

/// Blocking TCP listener on an ephemeral loopback port.
pub fn loopback_listener() -> (Socket, ConnectionInfo) {
    let listener = Socket::open(AddressFamily::Ipv4, SocketType::Stream, Protocol::Tcp).unwrap();
    listener
        .bind(&ConnectionInfo::localhost(AddressFamily::Ipv4, 0, SocketType::Stream))
        .unwrap();
    listener.listen(16).unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}
