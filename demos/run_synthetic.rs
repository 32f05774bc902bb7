//! A small runnable driver over a synthetic graph, for manual inspection of wave scheduling.
//!
//! ```ignore
//! cargo run --example run_synthetic -- -t 2 -c 0.65 -w 4 -m clustered
//! ```
//!
//! Understood flags, mirroring the teacher crate's own `-w/-n/-p/-h` command-line convention:
//!
//! `-t, --target`: target subnetwork size (default 2).
//! `-c, --theta`: cluster packing threshold fraction (default 0.65).
//! `-w, --workers`: worker-pool size (default 4).
//! `-m, --mode`: one of `sequential`, `by-network`, `by-subnetwork`, `clustered` (default `clustered`).

use std::collections::HashMap;

use reachnet_core::config::{Config, Mode};
use reachnet_core::kernel::IdentityKernel;
use reachnet_core::scheduler::Scheduler;
use reachnet_core::segment::{Graph, SegmentId, SegmentRecord};

fn parse_mode(raw: &str) -> Mode {
    match raw {
        "sequential" => Mode::Sequential,
        "by-network" => Mode::ByNetwork,
        "by-subnetwork" => Mode::BySubnetwork,
        "clustered" => Mode::BySubnetworkClustered,
        other => {
            eprintln!("unrecognized mode {other:?}, falling back to clustered");
            Mode::BySubnetworkClustered
        }
    }
}

fn parse_args() -> Config {
    let mut target = 2_i64;
    let mut theta = 0.65_f64;
    let mut workers = 4_usize;
    let mut mode = Mode::BySubnetworkClustered;

    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let value = args.next();
        match (flag.as_str(), value) {
            ("-t" | "--target", Some(v)) => target = v.parse().unwrap_or(target),
            ("-c" | "--theta", Some(v)) => theta = v.parse().unwrap_or(theta),
            ("-w" | "--workers", Some(v)) => workers = v.parse().unwrap_or(workers),
            ("-m" | "--mode", Some(v)) => mode = parse_mode(&v),
            _ => {}
        }
    }
    Config::new(target, theta, workers, mode).normalize()
}

/// Builds a two-tributary synthetic network: two headwaters joining at segment 3, which drains
/// into a further chain down to the outlet at segment 6.
fn synthetic_graph() -> Graph {
    let flat_params = [0.1, 2.0, 3.0, 1.0, 100.0, 0.03, 0.05, 1.5, 0.001];
    let records = vec![
        SegmentRecord::new(SegmentId::new(1), SegmentId::new(3), flat_params),
        SegmentRecord::new(SegmentId::new(2), SegmentId::new(3), flat_params),
        SegmentRecord::new(SegmentId::new(3), SegmentId::new(4), flat_params),
        SegmentRecord::new(SegmentId::new(4), SegmentId::new(5), flat_params),
        SegmentRecord::new(SegmentId::new(5), SegmentId::new(6), flat_params),
        SegmentRecord::new(SegmentId::new(6), SegmentId::new(0), flat_params),
    ];
    Graph::from_records(records).expect("synthetic graph is well-formed")
}

fn main() {
    tracing_subscriber::fmt::init();

    let config = parse_args();
    let graph = synthetic_graph();
    let nts = 12;
    let qlat: HashMap<_, _> = graph.segment_ids().map(|s| (s, vec![5.0_f32; nts])).collect();
    let q0: HashMap<_, _> = graph.segment_ids().map(|s| (s, [0.0_f32; 3])).collect();

    let scheduler = Scheduler::new(&graph, &config, IdentityKernel);
    match scheduler.run(nts, &qlat, &q0) {
        Ok(table) => {
            for segment in table.segment_ids() {
                let series = table.series_of(segment).unwrap();
                println!("segment {segment}: {} timesteps, last row {:?}", series.len(), series.last());
            }
        }
        Err(error) => {
            eprintln!("run failed at stage {:?}: {error}", error.stage());
            std::process::exit(1);
        }
    }
}
