//! Runs one command: sink setup, a bounded worker pool over batch indices,
//! and teardown.

use crate::command::{Command, CommandStatus};
use crate::metrics::RunMetrics;
use crossbeam_channel::bounded;
use datagen_generator::RowGenerator;
use datagen_sinks::{Sink, SinkError, SinkFactory, SinkMode};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Execute one run of `command` and settle its status.
///
/// Never returns an error: every failure ends up in the command's status.
pub fn execute(command: &Command, factory: &dyn SinkFactory) -> RunMetrics {
    let start = Instant::now();
    command.start_run();
    info!(
        "Command {} started: {} threads, {} batches of {} rows",
        command.id(),
        command.threads(),
        command.batches(),
        command.rows_per_batch()
    );

    let sinks = match open_sinks(command, factory) {
        Ok(sinks) => sinks,
        Err(e) => {
            error!("Command {} failed to set up its sinks: {e}", command.id());
            command.finish_run(CommandStatus::Failed, Some(e.to_string()), start.elapsed());
            return RunMetrics {
                total_duration: start.elapsed(),
                ..Default::default()
            };
        }
    };

    let (mut metrics, panicked) = run_batches(command, &sinks);
    close_sinks(command, &sinks);
    metrics.total_duration = start.elapsed();

    let (status, error) = if panicked > 0 {
        (
            CommandStatus::Failed,
            Some(format!("{panicked} worker thread(s) panicked")),
        )
    } else {
        (CommandStatus::Finished, None)
    };
    let status = command.finish_run(status, error, metrics.total_duration);

    info!(
        "Command {} {status}: {} rows in {:?} ({:.0} rows/sec, {} send errors)",
        command.id(),
        metrics.rows_written,
        metrics.total_duration,
        metrics.rows_per_second(),
        metrics.send_errors
    );
    metrics
}

/// Create and initialize every sink. On failure the sinks already
/// initialized are terminated.
fn open_sinks(command: &Command, factory: &dyn SinkFactory) -> Result<Vec<Arc<dyn Sink>>, SinkError> {
    let mut opened: Vec<Arc<dyn Sink>> = Vec::new();
    for spec in command.sinks_with_credentials() {
        let result = factory
            .create(&spec, command.definition())
            .and_then(|sink| sink.init(command.model(), SinkMode::Write).map(|()| sink));
        match result {
            Ok(sink) => {
                debug!("Sink {} initialized for command {}", sink.name(), command.id());
                opened.push(sink);
            }
            Err(e) => {
                close_sinks(command, &opened);
                return Err(e);
            }
        }
    }
    Ok(opened)
}

fn close_sinks(command: &Command, sinks: &[Arc<dyn Sink>]) {
    for sink in sinks {
        if let Err(e) = sink.terminate() {
            warn!("Sink {} failed to terminate for command {}: {e}", sink.name(), command.id());
        }
    }
}

/// Feed batch indices to `min(threads, batches)` workers. Returns the merged
/// metrics and the number of workers that panicked.
fn run_batches(command: &Command, sinks: &[Arc<dyn Sink>]) -> (RunMetrics, usize) {
    let batches = command.batches();
    let mut metrics = RunMetrics::default();
    if batches == 0 {
        command.record_batch(0, 0);
        return (metrics, 0);
    }

    let workers = (command.threads() as u64).min(batches) as usize;
    let generator = RowGenerator::new(Arc::clone(command.model()), command.seed());
    let (tx, rx) = bounded::<u64>(workers * 2);
    let mut panicked = 0;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let rx = rx.clone();
                let generator = &generator;
                scope.spawn(move || {
                    let mut partial = RunMetrics::default();
                    for batch in rx.iter() {
                        if command.is_cancelled() {
                            debug!("Worker {worker} of command {} stopping", command.id());
                            break;
                        }
                        run_batch(command, generator, sinks, batch, &mut partial);
                    }
                    partial
                })
            })
            .collect();
        drop(rx);

        for batch in 0..batches {
            if command.is_cancelled() {
                break;
            }
            // Fails only once every worker has gone.
            if tx.send(batch).is_err() {
                break;
            }
        }
        drop(tx);

        for handle in handles {
            match handle.join() {
                Ok(partial) => metrics.merge(&partial),
                Err(_) => {
                    error!("Worker thread of command {} panicked", command.id());
                    panicked += 1;
                }
            }
        }
    });

    (metrics, panicked)
}

fn run_batch(
    command: &Command,
    generator: &RowGenerator,
    sinks: &[Arc<dyn Sink>],
    batch: u64,
    metrics: &mut RunMetrics,
) {
    let started = Instant::now();
    let rows = generator.generate_batch(batch, command.rows_per_batch());
    let generated = Instant::now();
    metrics.generation_duration += generated - started;

    let mut send_errors = 0;
    for sink in sinks {
        if let Err(e) = sink.send_batch(&rows) {
            warn!(
                "Sink {} rejected batch {batch} of command {}: {e}",
                sink.name(),
                command.id()
            );
            send_errors += 1;
        }
    }
    metrics.write_duration += generated.elapsed();
    metrics.rows_written += rows.len() as u64;
    metrics.batches += 1;
    metrics.send_errors += send_errors;
    command.record_batch(rows.len(), send_errors);
}

/// Time left before a scheduled command is due again, `None` when due.
pub(crate) fn time_until_due(command: &Command) -> Option<Duration> {
    let delay = command.delay()?;
    let last_finished = command.snapshot().last_finished?;
    let elapsed = (chrono::Utc::now() - last_finished).to_std().unwrap_or(Duration::ZERO);
    delay.checked_sub(elapsed).filter(|left| !left.is_zero())
}
