use boring::asn1::Asn1Time;
use boring::bn::BigNum;
use boring::ec::{EcGroup, EcKey};
use boring::hash::MessageDigest;
use boring::nid::Nid;
use boring::pkey::PKey;
use boring::x509::{X509NameBuilder, X509};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use syncnet::socket::tls::{TlsContext, TlsEngine, TlsOptions};

fn contexts() -> (TlsContext, TlsContext) {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "bench.local").unwrap();
    let name = name.build();
    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let server = TlsContext::server(
        &TlsOptions::builder()
            .identity(cert.to_pem().unwrap(), key.private_key_to_pem_pkcs8().unwrap())
            .build(),
    )
    .unwrap();
    let client = TlsContext::client(
        &TlsOptions::builder()
            .verify_peer(false)
            .use_system_roots(false)
            .build(),
    )
    .unwrap();
    (client, server)
}

fn transfer(from: &mut TlsEngine, to: &mut TlsEngine, buf: &mut [u8]) {
    loop {
        let n = from.outgoing(buf).unwrap();
        if n == 0 {
            break;
        }
        to.incoming(&buf[..n]).unwrap();
    }
}

fn handshake(client_ctx: &TlsContext, server_ctx: &TlsContext) -> (TlsEngine, TlsEngine) {
    let mut client = TlsEngine::new(client_ctx, Some("bench.local")).unwrap();
    let mut server = TlsEngine::new(server_ctx, None).unwrap();
    let mut buf = vec![0u8; 16 * 1024];
    loop {
        let c = client.handshake().unwrap();
        transfer(&mut client, &mut server, &mut buf);
        let s = server.handshake().unwrap();
        transfer(&mut server, &mut client, &mut buf);
        if c && s {
            return (client, server);
        }
    }
}

fn benchmark_memory_handshake(c: &mut Criterion) {
    let (client_ctx, server_ctx) = contexts();

    c.bench_function("tls_memory_handshake", |b| {
        b.iter(|| black_box(handshake(&client_ctx, &server_ctx)))
    });
}

fn benchmark_record_roundtrip(c: &mut Criterion) {
    let (client_ctx, server_ctx) = contexts();
    let (mut client, mut server) = handshake(&client_ctx, &server_ctx);
    let payload = vec![0x42u8; 16 * 1024];
    let mut wire = vec![0u8; 32 * 1024];
    let mut plain = vec![0u8; 16 * 1024];

    c.bench_function("tls_record_roundtrip_16k", |b| {
        b.iter(|| {
            client.write(&payload).unwrap();
            transfer(&mut client, &mut server, &mut wire);
            let mut got = 0;
            while got < payload.len() {
                got += server.read(&mut plain).unwrap().count().unwrap();
            }
            black_box(got);
        })
    });
}

criterion_group!(benches, benchmark_memory_handshake, benchmark_record_roundtrip);
criterion_main!(benches);
