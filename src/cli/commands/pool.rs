//! Pool commands: ingest, search, select, stats, maintain, run.

use std::path::Path;

use anyhow::Context;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use super::{Session, truncate};
use crate::catalog::FileCurator;
use crate::engine::{Candidate, MaintenanceCommand, MaintenanceEvent, MaintenanceWorker};
use crate::pool::{Category, PooledTrack, TrackSource};

/// Admit curator suggestions from a JSON file
pub fn cmd_ingest(rt: &Runtime, session: &Session, path: &Path, limit: usize) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Suggestions file not found: {}", path.display());
    }

    let curator = FileCurator::new(path);
    let summary = rt.block_on(session.engine.ingest_suggestions(&curator, limit));

    println!(
        "Suggested: {}  Admitted: {}  Rejected: {}",
        summary.suggested, summary.admitted, summary.rejected
    );
    if summary.admitted > 0 {
        session.save()?;
    }
    Ok(())
}

/// Search the catalog, optionally admitting the results
pub fn cmd_search(
    rt: &Runtime,
    session: &Session,
    query: &str,
    limit: usize,
    admit: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let hits = session
            .catalog
            .search(query, limit)
            .await
            .with_context(|| format!("Search failed for {:?}", query))?;

        if hits.is_empty() {
            println!("No results.");
            return Ok(());
        }

        let mut admitted = 0;
        for hit in &hits {
            let mark = if admit {
                match session
                    .engine
                    .admit_candidate(Candidate::from_catalog(hit, TrackSource::UserSearch))
                    .await
                {
                    Some(_) => {
                        admitted += 1;
                        "+"
                    }
                    None => "-",
                }
            } else {
                " "
            };
            println!(
                "{} {:<14} {:<28} {:<40} {:>4}s",
                mark,
                hit.id,
                truncate(&hit.artist, 28),
                truncate(&hit.title, 40),
                hit.duration_secs
            );
        }

        if admit {
            println!("\nAdmitted {} of {}", admitted, hits.len());
            if admitted > 0 {
                session.save()?;
            }
        }
        anyhow::Ok(())
    })
}

/// Show ranked picks from the hot pool
pub fn cmd_select(
    session: &Session,
    category: Option<&str>,
    after: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let picks = match (category, after) {
        (Some(name), _) => {
            let category = Category::parse(name).with_context(|| {
                let known: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
                format!("Unknown category {:?}; expected one of: {}", name, known.join(", "))
            })?;
            session.engine.select_for_category(category, limit)
        }
        (None, Some(id)) => {
            if session.engine.track(id).is_none() {
                anyhow::bail!("Track {} is not pooled", id);
            }
            session.engine.select_discovery(id, limit)
        }
        (None, None) => session.engine.select_hot(limit),
    };

    if picks.is_empty() {
        println!("Nothing to select; the pool is empty.");
        return Ok(());
    }
    print_tracks(&picks);
    Ok(())
}

/// Show pool, prefetch and network statistics
pub fn cmd_stats(session: &Session) -> anyhow::Result<()> {
    let stats = session.engine.stats();

    println!("Track Pool");
    println!("==========");
    println!("Hot:              {}", stats.pool.hot);
    println!("Cold:             {}", stats.pool.cold);
    println!("Mean hot score:   {:.1}", stats.pool.mean_hot_score);
    if !stats.pool.hot_by_category.is_empty() {
        println!("By category:");
        for (category, count) in &stats.pool.hot_by_category {
            println!("  {:<12} {}", category.as_str(), count);
        }
    }
    println!();
    println!("Playback");
    println!("========");
    println!(
        "Prefetched:       {} ({} in flight)",
        stats.prefetch_cached, stats.prefetch_in_flight
    );
    println!(
        "Throughput:       {:.0} kbps over {} samples",
        stats.network.throughput_kbps, stats.network.sample_count
    );
    if let Some(latency) = stats.network.latency_ms {
        println!("Latency:          {:.0} ms", latency);
    }
    println!("Quality tier:     {}", stats.tier);
    println!();
    println!("Permanent failures: {}", stats.permanent_failures);

    if let Some(path) = &session.snapshot {
        println!("\nSnapshot: {}", path.display());
    }
    Ok(())
}

/// Run one maintenance pass
pub fn cmd_maintain(session: &Session) -> anyhow::Result<()> {
    match session.engine.run_maintenance() {
        Some(report) => {
            println!(
                "Rescored {} tracks, aged out {} (hot {}, cold {})",
                report.rescored, report.aged_out, report.hot, report.cold
            );
            session.save()?;
        }
        None => println!("A maintenance pass is already running."),
    }
    Ok(())
}

/// Run the maintenance worker until Ctrl-C
pub fn cmd_run(rt: &Runtime, session: &Session) -> anyhow::Result<()> {
    let config = session.engine.config().maintenance.clone();
    if !config.enabled {
        println!("Maintenance is disabled in the config.");
        return Ok(());
    }

    rt.block_on(async {
        let mut worker =
            MaintenanceWorker::new(session.engine.clone(), &config, session.snapshot.clone());
        let (event_tx, mut event_rx) = mpsc::channel(32);
        worker.set_event_sender(event_tx);
        let commands = worker.command_sender();
        let handle = worker.start();

        println!(
            "Maintenance running every {}s. Press Ctrl-C to stop.",
            config.interval_secs
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    let _ = commands.send(MaintenanceCommand::Stop).await;
                    break;
                }
                event = event_rx.recv() => match event {
                    Some(MaintenanceEvent::PassComplete(report)) => println!(
                        "Pass: rescored {}, aged out {}, hot {}, cold {}",
                        report.rescored, report.aged_out, report.hot, report.cold
                    ),
                    Some(MaintenanceEvent::CheckpointFailed(e)) => eprintln!("Checkpoint failed: {}", e),
                    Some(MaintenanceEvent::Stopped) | None => break,
                    Some(_) => {}
                },
            }
        }

        handle.await.context("Maintenance worker panicked")?;
        anyhow::Ok(())
    })?;

    session.save()
}

fn print_tracks(tracks: &[PooledTrack]) {
    println!(
        "{:>5}  {:<12} {:<24} {:<36} {}",
        "Score", "Category", "Artist", "Title", "Id"
    );
    for t in tracks {
        println!(
            "{:>5.1}  {:<12} {:<24} {:<36} {}",
            t.score,
            t.category.as_str(),
            truncate(&t.artist, 24),
            truncate(&t.title, 36),
            t.track_id
        );
    }
}
