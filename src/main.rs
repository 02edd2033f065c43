// Simulator binary - loads a workload, splits it across CPU queues and runs them to completion
//
// Setup errors (bad arguments, unreadable workload) abort before any worker starts. Ctrl+C stops
// the workers at their next tick and still prints the partial report.

use anyhow::{Context, Result};
use clap::Parser;
use multiqueue_sched::config::Cli;
use multiqueue_sched::loader::{load_workload, RECORD_SIZE};
use multiqueue_sched::report::{
    render_aging, render_delegation, render_queue, render_rebalance, render_summary,
};
use multiqueue_sched::simulation::{SimEvent, Simulation};
use multiqueue_sched::logging;
use std::thread;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let assignments = cli.assignments().context("invalid queue configuration")?;
    let config = cli.scheduler_config().context("invalid scheduler configuration")?;
    let records = load_workload(&cli.workload)?;
    let tables = !cli.json && !cli.quiet;

    if !cli.json {
        println!("Workload:\t\t{}", cli.workload.display());
        println!("Record size:\t\t{RECORD_SIZE} bytes");
        println!("Total Processes:\t{}\n", records.len());
    }

    let simulation = Simulation::from_workload(config, records, &assignments);
    if tables {
        let snapshots = simulation.snapshots();
        println!("{}", render_delegation(&snapshots));
        for snapshot in &snapshots {
            println!("{}", render_queue(snapshot));
        }
    }

    let stop = simulation.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("failed to install Ctrl+C handler")?;

    // The stream closes when the simulation drops its last sender.
    let printer = if cli.json {
        None
    } else {
        let events = simulation.events();
        let handle = thread::Builder::new()
            .name("events".into())
            .spawn(move || {
                for event in events.iter() {
                    match event {
                        SimEvent::AgingBoost(boost) => println!("{}", render_aging(&boost)),
                        SimEvent::Rebalanced(report) if tables => {
                            println!("{}", render_rebalance(&report))
                        }
                        _ => {}
                    }
                }
            })
            .context("failed to spawn event printer")?;
        Some(handle)
    };

    let report = simulation.run().context("simulation failed")?;
    if let Some(printer) = printer {
        if printer.join().is_err() {
            tracing::warn!("event printer panicked");
        }
    }

    if cli.json {
        println!("{}", report.to_json().context("failed to encode report")?);
        return Ok(());
    }
    if tables {
        for snapshot in &report.queues {
            println!("{}", render_queue(snapshot));
        }
    }
    print!("{}", render_summary(&report));
    Ok(())
}
