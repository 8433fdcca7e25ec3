//! ccnsim - drives a synthetic workload through the ccnstore content store
//! on a virtual clock and reports cache statistics.

mod workload;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ccnstore::StoreConfig;
use clap::Parser;
use tracing::info;

use crate::workload::{WorkloadReport, WorkloadSpec};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON store configuration (flags below take precedence)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cache capacity (number of objects)
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Number of servers in the service stage
    #[arg(short, long)]
    servers: Option<usize>,

    /// Constant part of the service time, in nanoseconds
    #[arg(long)]
    constant_ns: Option<u64>,

    /// Service time per name byte, in nanoseconds
    #[arg(long)]
    slope_ns: Option<u64>,

    /// Number of distinct objects producers can serve
    #[arg(long, default_value_t = 1000)]
    catalog: usize,

    /// Number of interests consumers issue
    #[arg(short, long, default_value_t = 10000)]
    interests: usize,

    /// Virtual time between consecutive interests, in nanoseconds
    #[arg(long, default_value_t = 2000)]
    interval_ns: u64,

    /// Time for a producer to answer a missed interest, in microseconds
    #[arg(long, default_value_t = 50)]
    fetch_delay_us: u64,

    /// Recommended cache time of produced objects, in microseconds (0 = forever)
    #[arg(long, default_value_t = 0)]
    freshness_us: u64,

    /// Seed for the interest popularity generator
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::from_path(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => StoreConfig::default(),
        };

        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(servers) = self.servers {
            config.servers = servers;
        }
        if let Some(constant) = self.constant_ns {
            config.service_constant_ns = constant;
        }
        if let Some(slope) = self.slope_ns {
            config.service_slope_ns_per_byte = slope;
        }

        config.validate()?;
        Ok(config)
    }

    fn workload(&self) -> WorkloadSpec {
        WorkloadSpec {
            catalog: self.catalog,
            interests: self.interests,
            interval: Duration::from_nanos(self.interval_ns),
            fetch_delay: Duration::from_micros(self.fetch_delay_us),
            freshness: (self.freshness_us > 0).then(|| Duration::from_micros(self.freshness_us)),
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = args.store_config()?;
    let spec = args.workload();

    info!("Starting ccnsim v{}", env!("CARGO_PKG_VERSION"));
    info!("Cache capacity: {}", config.capacity);
    info!("Service stage: {} server(s), {}ns + {}ns/byte", config.servers, config.service_constant_ns, config.service_slope_ns_per_byte);
    info!("Workload: {} interests over {} objects", spec.interests, spec.catalog);

    let report = workload::run(config, &spec)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &WorkloadReport) {
    let stats = &report.stats;
    println!("\n📊 CONTENT STORE REPORT");
    println!("   Virtual time elapsed:  {} ns", report.end_time_ns);
    println!("   Interests issued:      {}", report.interests);
    println!("   Lookups completed:     {}", report.lookups_completed);
    println!("   Mean lookup latency:   {} ns", report.mean_lookup_latency_ns);
    println!("   Hits / misses:         {} / {}", stats.hits, stats.misses);
    println!("   Hit ratio:             {:.3}", stats.hit_ratio);
    println!("   Objects cached:        {} (capacity {})", report.object_count, report.config.capacity);
    println!("   Inserts / duplicates:  {} / {}", stats.inserts, stats.duplicates);
    println!("   Evictions:             {}", stats.evictions);
    println!("   Invalidations:         {}", stats.invalidations);
    if stats.consistency_faults > 0 {
        println!("   ⚠ Consistency faults:  {}", stats.consistency_faults);
    }
}
