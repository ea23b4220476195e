use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use serial_link::trace::format_row;
use serial_link::{MockDevice, Port, TraceLogger, TraceSettings, TraceTag};
use std::hint::black_box;
use std::time::Duration;

fn settings() -> TraceSettings {
    TraceSettings {
        timestamps: false,
        ..TraceSettings::default()
    }
}

pub fn bench_format_row(c: &mut Criterion) {
    let row: Vec<u8> = (0x70..0x80).collect();
    c.bench_function("format_row", |b| {
        b.iter(|| black_box(format_row('+', black_box(&row))))
    });
}

pub fn bench_log_data(c: &mut Criterion) {
    let payload = vec![0x5Au8; 4096];
    let logger = TraceLogger::new(std::io::sink(), &settings());

    let mut group = c.benchmark_group("trace_logger");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("log_data_4k", |b| {
        b.iter(|| logger.log_data(TraceTag::Write, black_box(&payload)))
    });
    group.bench_function("alternating_tags", |b| {
        b.iter(|| {
            for chunk in payload.chunks(100) {
                logger.log_data(TraceTag::Write, chunk);
                logger.log_data(TraceTag::Read, chunk);
            }
        })
    });
    group.finish();
}

pub fn bench_traced_port(c: &mut Criterion) {
    let device = MockDevice::new("BENCH");
    let handle = device.clone();
    let logger = TraceLogger::new(std::io::sink(), &settings());
    let port = Port::with_logger(device, logger);

    let mut buffer = [0u8; 256];
    c.bench_function("port_read_256", |b| {
        b.iter(|| {
            handle.enqueue_read(&[0xA5; 256]);
            black_box(port.read(&mut buffer).unwrap_or(0))
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_format_row, bench_log_data, bench_traced_port
}
criterion_main!(benches);
