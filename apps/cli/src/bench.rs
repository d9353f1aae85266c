//! `loanpool bench`: hammer a SQLite-backed pool from several threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use loanpool::{Error, PoolStats};
use loanpool_sqlite::SqlitePool;
use serde::Serialize;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS bench (
    worker INTEGER NOT NULL,
    iteration INTEGER NOT NULL
)";

#[derive(Debug, Clone, Args)]
pub struct BenchArgs {
    /// Number of worker threads
    #[arg(long, default_value_t = 8)]
    pub workers: usize,

    /// Acquire/release cycles per worker
    #[arg(long, default_value_t = 100)]
    pub iterations: usize,

    /// Mark every Nth checkout invalid to force a reconnect (0 disables)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub fail_every: u64,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// What a bench run did.
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub workers: usize,
    pub iterations: usize,
    pub elapsed_ms: u64,
    pub succeeded: u64,
    pub exhausted: u64,
    pub create_failed: u64,
    pub rows: i64,
    pub stats: PoolStats,
}

#[derive(Default)]
struct Tally {
    checkouts: AtomicU64,
    succeeded: AtomicU64,
    exhausted: AtomicU64,
    create_failed: AtomicU64,
}

pub fn run(pool: &SqlitePool, args: &BenchArgs) -> Result<BenchReport> {
    pool.get()?
        .execute_batch(SCHEMA)
        .context("failed to create bench table")?;

    let tally = Tally::default();
    let started = Instant::now();

    thread::scope(|scope| -> Result<()> {
        let handles: Vec<_> = (0..args.workers)
            .map(|worker| {
                let tally = &tally;
                scope.spawn(move || worker_loop(pool, args, worker, tally))
            })
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => anyhow::bail!("bench worker panicked"),
            }
        }
        Ok(())
    })?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let rows = pool
        .get()?
        .query_row("SELECT COUNT(*) FROM bench", [], |row| row.get(0))
        .context("failed to count bench rows")?;

    Ok(BenchReport {
        workers: args.workers,
        iterations: args.iterations,
        elapsed_ms,
        succeeded: tally.succeeded.load(Ordering::Relaxed),
        exhausted: tally.exhausted.load(Ordering::Relaxed),
        create_failed: tally.create_failed.load(Ordering::Relaxed),
        rows,
        stats: pool.stats(),
    })
}

fn worker_loop(pool: &SqlitePool, args: &BenchArgs, worker: usize, tally: &Tally) -> Result<()> {
    for iteration in 0..args.iterations {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(Error::Exhausted { .. }) => {
                tally.exhausted.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Err(Error::CreateFailed { .. }) => {
                tally.create_failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        conn.execute(
            "INSERT INTO bench (worker, iteration) VALUES (?1, ?2)",
            (worker as i64, iteration as i64),
        )
        .with_context(|| format!("worker {worker} insert failed"))?;
        let _: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM bench WHERE worker = ?1",
                [worker as i64],
                |row| row.get(0),
            )
            .with_context(|| format!("worker {worker} select failed"))?;

        let n = tally.checkouts.fetch_add(1, Ordering::Relaxed) + 1;
        if args.fail_every > 0 && n % args.fail_every == 0 {
            tracing::debug!(worker, iteration, handle = conn.id(), "marking handle invalid");
            conn.mark_invalid();
        }
        tally.succeeded.fetch_add(1, Ordering::Relaxed);
    }
    Ok(())
}

impl BenchReport {
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        out.push_str(&format!(
            "workers={} iterations={} elapsed={}ms\n",
            self.workers, self.iterations, self.elapsed_ms
        ));
        out.push_str(&format!(
            "succeeded={} exhausted={} create_failed={} rows={}\n",
            self.succeeded, self.exhausted, self.create_failed, self.rows
        ));
        out.push_str(&format!(
            "pool: capacity={} idle={} outstanding={} pending={}\n",
            s.capacity, s.idle, s.outstanding, s.pending
        ));
        out.push_str(&format!(
            "handles: created={} destroyed={} recreated={} create_failures={}\n",
            s.created, s.destroyed, s.recreated, s.create_failures
        ));
        out.push_str(&format!(
            "acquires: total={} releases={} exhausted={}",
            s.total_acquisitions, s.total_releases, s.exhausted
        ));
        out
    }
}
