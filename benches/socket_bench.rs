use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use syncnet::socket::{AddressFamily, ConnectionInfo, Socket, SocketType};

fn loopback_pair() -> (Socket, Socket) {
    let bind = ConnectionInfo::localhost(AddressFamily::Ipv4, 0, SocketType::Stream);
    let listener = Socket::open_for(&bind).unwrap();
    listener.bind(&bind).unwrap();
    listener.listen(1).unwrap();
    let addr = listener.local_addr().unwrap();

    let client = Socket::open_for(&addr).unwrap();
    client.connect(&addr, None).unwrap();
    let server = listener.accept().unwrap().unwrap();
    (client, server)
}

fn benchmark_send_recv(c: &mut Criterion) {
    let (client, server) = loopback_pair();
    let payload = vec![0x17u8; 4096];
    let mut buf = vec![0u8; 4096];

    let mut group = c.benchmark_group("socket_loopback");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("sendall_recv_4k", |b| {
        b.iter(|| {
            client.sendall(&payload, 0).unwrap();
            let mut got = 0;
            while got < payload.len() {
                got += server.recv(&mut buf[got..], 0).unwrap().count().unwrap();
            }
            black_box(got);
        })
    });
    group.finish();
}

fn benchmark_open_close(c: &mut Criterion) {
    c.bench_function("socket_open_close", |b| {
        b.iter(|| {
            let socket = Socket::open(
                AddressFamily::Ipv4,
                SocketType::Stream,
                syncnet::socket::Protocol::Tcp,
            )
            .unwrap();
            socket.close().unwrap();
        })
    });
}

criterion_group!(benches, benchmark_send_recv, benchmark_open_close);
criterion_main!(benches);
