// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! End-to-end job scenarios through the public API.

use iaa_rust::{
    Capabilities, CompressParams, CompressionLevel, Crc64Params, DecompressParams, DeflateFormat,
    Device, Dispatcher, EffectivePath, EmulatedQueue, Engine, Error, ExecutionPath,
    ExtractParams, JobState, Operation, OutputWidth, Status,
};
use std::sync::Arc;

fn emulated_engine() -> Engine {
    Engine::new(Arc::new(Dispatcher::from_devices(vec![
        Device::emulated("iax1", Some(0)),
        Device::emulated("iax3", Some(1)),
    ])))
}

fn extract_80_123() -> Operation<'static> {
    Operation::Extract(ExtractParams {
        src1_bit_width: 8,
        num_input_elements: 1000,
        param_low: 80,
        param_high: 123,
        out_bit_width: OutputWidth::Nominal,
    })
}

#[test]
fn extract_scenario_on_every_path() {
    let source: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
    let engines = [
        (Engine::software_only(), ExecutionPath::Software),
        (Engine::software_only(), ExecutionPath::Auto),
        (emulated_engine(), ExecutionPath::Hardware),
        (emulated_engine(), ExecutionPath::Auto),
    ];

    for (engine, path) in engines {
        let mut destination = vec![4u8; 1000];
        let size = engine.job_size(path).unwrap();
        let mut job = engine.init_job(path, size).unwrap();
        job.configure(extract_80_123(), &source, &mut destination)
            .unwrap();
        assert_eq!(job.execute().unwrap(), Status::Ok, "{path}");
        assert_eq!(job.total_out(), 44, "{path}");
        assert_eq!(job.finalize(), Status::Ok);

        for k in 0..44 {
            assert_eq!(destination[k], ((80 + k) % 256) as u8, "{path}");
        }
        assert_eq!(destination[44], 4, "{path}");
    }
}

#[test]
fn crc64_of_four_zero_bytes() {
    let zeros = [0u8; 4];
    let cases = [
        (false, false, 0),
        (true, false, 0),
        (false, true, 0xFFFF_FFFF_DEBB_20E3),
        (true, true, 0xC704_DD7B_FFFF_FFFF),
    ];
    let engine = emulated_engine();

    for path in [ExecutionPath::Software, ExecutionPath::Hardware] {
        for (big_endian, inverse, expected) in cases {
            let mut none = [0u8; 0];
            let mut job = engine.new_job(path).unwrap();
            job.configure(
                Operation::Crc64(Crc64Params {
                    poly: 0x04C1_1DB7_0000_0000,
                    big_endian,
                    inverse,
                }),
                &zeros,
                &mut none,
            )
            .unwrap();
            job.execute().unwrap();
            assert_eq!(job.crc64(), expected, "{path} be={big_endian} inv={inverse}");
            assert_eq!(job.total_out(), 0);
        }
    }
}

#[test]
fn compress_decompress_round_trip() {
    let engine = emulated_engine();
    for len in [0usize, 1, 17, 256, 4095, 65_536, 100_000] {
        let data: Vec<u8> = (0..len).map(|i| ((i * i) % 251) as u8).collect();
        for format in [DeflateFormat::Raw, DeflateFormat::Zlib] {
            let mut packed = vec![0u8; len + len / 10 + 128];
            let mut restored = vec![0u8; len + 1];

            let mut compress = engine.new_job(ExecutionPath::Auto).unwrap();
            compress
                .configure(
                    Operation::Compress(CompressParams {
                        level: CompressionLevel::High,
                        format,
                    }),
                    &data,
                    &mut packed,
                )
                .unwrap();
            compress.execute().unwrap();
            let packed_len = compress.total_out();
            let crc = compress.crc();
            compress.finalize();

            let mut decompress = engine.new_job(ExecutionPath::Auto).unwrap();
            decompress
                .configure(
                    Operation::Decompress(DecompressParams { format }),
                    &packed[..packed_len],
                    &mut restored,
                )
                .unwrap();
            decompress.execute().unwrap();
            assert_eq!(decompress.executed_path(), Some(EffectivePath::Hardware));
            assert_eq!(decompress.total_out(), len);
            assert_eq!(decompress.crc(), crc);
            decompress.finalize();

            assert_eq!(&restored[..len], &data[..], "len {len} {format:?}");
        }
    }
}

#[test]
fn wait_reports_a_failed_run_as_an_error() {
    let source: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
    let mut destination = vec![0u8; 10];
    let mut job = Engine::software_only()
        .new_job(ExecutionPath::Software)
        .unwrap();
    job.configure(extract_80_123(), &source, &mut destination)
        .unwrap();

    assert!(job.submit().is_err());
    let err = job.wait().unwrap_err();
    assert!(matches!(err, Error::InsufficientOutputBuffer { written: 10 }));
    assert_eq!(job.total_out(), 10);
    assert_eq!(job.finalize(), Status::InsufficientOutputBuffer);
}

#[test]
fn device_counting_with_unknown_nodes() {
    let dispatcher = Dispatcher::from_devices(vec![
        Device::emulated("iax0", Some(0)),
        Device::emulated("iax1", Some(0)),
        Device::emulated("iax2", Some(1)),
        Device::emulated("iax3", None),
    ]);
    assert_eq!(dispatcher.count_on_node(0), 3);
    assert_eq!(dispatcher.count_on_node(1), 2);
    assert_eq!(dispatcher.device_count(), 4);
}

#[test]
fn zero_devices_never_unavailable_on_auto() {
    let engine = Engine::software_only();
    assert!(!engine.dispatcher().is_hardware_available());

    let input = vec![9u8; 1000];
    let mut output = vec![0u8; 1000];
    let mut job = engine.new_job(ExecutionPath::Auto).unwrap();
    job.configure(extract_80_123(), &input, &mut output).unwrap();
    for _ in 0..3 {
        assert_eq!(job.execute().unwrap(), Status::Ok);
        assert_eq!(job.executed_path(), Some(EffectivePath::Software));
    }
}

#[test]
fn hardware_path_requires_a_device() {
    let engine = Engine::software_only();
    let err = engine.new_job(ExecutionPath::Hardware).unwrap_err();
    assert_eq!(err.status(), Status::UnsupportedPath);
    assert!(matches!(
        "fpga_path".parse::<ExecutionPath>(),
        Err(Error::InvalidPath(_))
    ));
}

#[test]
fn devices_without_capability_are_not_used() {
    let queue: Arc<EmulatedQueue> = Arc::new(EmulatedQueue::new("iax0/wq0.0"));
    let crc_only = Device::new("iax0", Some(0), Capabilities::CRC64, queue.clone());
    let engine = Engine::new(Arc::new(Dispatcher::from_devices(vec![crc_only])));

    let source: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
    let mut destination = vec![0u8; 1000];
    let mut pinned_out = vec![0u8; 1000];

    let mut auto = engine.new_job(ExecutionPath::Auto).unwrap();
    auto.configure(extract_80_123(), &source, &mut destination)
        .unwrap();
    auto.execute().unwrap();
    assert_eq!(auto.executed_path(), Some(EffectivePath::Software));

    let mut pinned = engine.new_job(ExecutionPath::Hardware).unwrap();
    pinned
        .configure(extract_80_123(), &source, &mut pinned_out)
        .unwrap();
    let err = pinned.submit().unwrap_err();
    assert_eq!(err.status(), Status::DeviceUnavailable);
    assert!(!err.is_retryable());
    assert_eq!(pinned.state(), JobState::Failed);
    assert_eq!(queue.submitted(), 0);
}

#[test]
fn jobs_run_concurrently_on_shared_devices() {
    let engine = emulated_engine();
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                let source: Vec<u8> = (0..1000).map(|i| ((i + t) % 256) as u8).collect();
                let mut destination = vec![0u8; 64];
                for _ in 0..50 {
                    let mut job = engine.new_job(ExecutionPath::Hardware).unwrap();
                    job.configure(extract_80_123(), &source, &mut destination)
                        .unwrap();
                    job.execute().unwrap();
                    assert_eq!(job.total_out(), 44);
                    job.finalize();
                    assert_eq!(destination[0], ((80 + t) % 256) as u8);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[cfg(feature = "async")]
#[tokio::test]
async fn wait_async_completes_deferred_job() {
    let queue = Arc::new(EmulatedQueue::deferred("iax0/wq0.0", 8));
    let device = Device::new("iax0", None, Capabilities::offloadable(), queue.clone());
    let engine = Engine::new(Arc::new(Dispatcher::from_devices(vec![device])));

    let source: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
    let mut destination = vec![0u8; 64];
    let mut job = engine.new_job(ExecutionPath::Hardware).unwrap();
    job.configure(extract_80_123(), &source, &mut destination)
        .unwrap();
    assert_eq!(job.submit().unwrap(), Status::Pending);

    let worker = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(10));
        queue.process_pending()
    });
    assert_eq!(job.wait_async().await.unwrap(), Status::Ok);
    assert_eq!(job.total_out(), 44);
    assert_eq!(worker.join().unwrap(), 1);
}
