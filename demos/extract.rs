// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Extract elements 80..=123 from 1000 bytes on the chosen execution path.
//!
//! Run with: `cargo run --example extract -- [software_path|hardware_path|auto_path]`

use iaa_rust::{
    is_iaa_available, is_iaa_configured, Engine, ExecutionPath, ExtractParams, Operation,
    OutputWidth,
};
use std::process::ExitCode;

const SOURCE_SIZE: u32 = 1000;
const INPUT_VECTOR_WIDTH: u8 = 8;
const LOWER_INDEX: u32 = 80;
const UPPER_INDEX: u32 = 123;

fn main() -> ExitCode {
    let path = match std::env::args().nth(1) {
        None => ExecutionPath::Software,
        Some(arg) => match arg.parse::<ExecutionPath>() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("{e}");
                eprintln!("Usage: extract [software_path|hardware_path|auto_path]");
                return ExitCode::FAILURE;
            }
        },
    };

    println!("Intel IAA Extract Example");
    println!("=========================\n");
    println!("  IAA hardware detected: {}", is_iaa_available());
    println!("  IAA configured: {}", is_iaa_configured());

    let engine = Engine::system();
    for device in engine.dispatcher().iter() {
        println!(
            "  Device: {} (node {:?}, {} enabled WQs)",
            device.name,
            device.numa_node,
            device.enabled_wq_count()
        );
    }
    println!("  Requested path: {path}\n");

    let source: Vec<u8> = (0..SOURCE_SIZE).map(|i| i as u8).collect();
    let mut destination = vec![4u8; SOURCE_SIZE as usize];

    let size = match engine.job_size(path) {
        Ok(size) => size,
        Err(e) => {
            eprintln!("An error occurred while getting the job size: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut job = match engine.init_job(path, size) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("An error occurred while initializing the job: {e}");
            return ExitCode::FAILURE;
        }
    };

    let op = Operation::Extract(ExtractParams {
        src1_bit_width: INPUT_VECTOR_WIDTH,
        num_input_elements: SOURCE_SIZE,
        param_low: LOWER_INDEX,
        param_high: UPPER_INDEX,
        out_bit_width: OutputWidth::Nominal,
    });
    if let Err(e) = job
        .configure(op, &source, &mut destination)
        .and_then(|()| job.execute())
    {
        eprintln!("An error occurred during job execution: {e}");
        return ExitCode::FAILURE;
    }

    let extract_size = job.total_out();
    println!(
        "  Ran on the {} path",
        job.executed_path().map_or("unknown", |p| p.name())
    );
    job.finalize();

    for (i, &value) in destination[..extract_size].iter().enumerate() {
        if value != source[i + LOWER_INDEX as usize] {
            eprintln!("Incorrect value at index {i}");
            return ExitCode::FAILURE;
        }
    }
    println!("Extract was performed successfully ({extract_size} bytes).");
    ExitCode::SUCCESS
}
