//! Verification commands: verify a single reference, heal the whole pool.

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use super::{Session, truncate};
use crate::health::VerifyRequest;

/// Verify (and repair) a single artist/title
pub fn cmd_verify(
    rt: &Runtime,
    session: &Session,
    artist: &str,
    title: &str,
    media_id: Option<&str>,
    thumbnail: Option<&str>,
) -> anyhow::Result<()> {
    let request = VerifyRequest {
        media_id: media_id.map(str::to_string),
        artist: artist.to_string(),
        title: title.to_string(),
        thumbnail_url: thumbnail.map(str::to_string),
    };

    match rt.block_on(session.engine.verify(request)) {
        Some(verified) => {
            let status = if verified.repaired { "✓ Repaired" } else { "✓ Valid" };
            println!("{}", status);
            println!("  Media id:  {}", verified.media_id);
            println!("  Title:     {}", verified.title);
            println!("  Artist:    {}", verified.artist);
            if let Some(secs) = verified.duration_secs {
                println!("  Duration:  {}:{:02}", secs / 60, secs % 60);
            }
            println!("  Thumbnail: {}", verified.thumbnail_url);
        }
        None => {
            println!("✗ No playable reference for {} - {}", artist, title);
        }
    }

    // Permanent failures found along the way are worth keeping
    session.save()
}

/// Check every pooled track and repair broken references
pub fn cmd_heal(rt: &Runtime, session: &Session) -> anyhow::Result<()> {
    let total = session.engine.all_tracks().len();
    if total == 0 {
        println!("The pool is empty; nothing to heal.");
        return Ok(());
    }
    println!("Checking {} tracks. Press Ctrl-C to stop early.", total);

    let cancel = CancellationToken::new();
    let summary = rt.block_on(async {
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let summary = session.engine.batch_heal(&cancel).await;
        watcher.abort();
        summary
    });

    println!();
    println!("Heal Summary");
    println!("============");
    println!("  ✓ Valid:    {}", summary.skipped_valid);
    println!("  ↻ Healed:   {}", summary.healed);
    println!("  ✗ Failed:   {}", summary.failed.len());
    if cancel.is_cancelled() {
        println!("  (stopped early)");
    }

    if !summary.failed.is_empty() {
        println!();
        println!("Failed tracks:");
        for failure in &summary.failed {
            println!(
                "  {:<24} {:<36} {}",
                truncate(&failure.artist, 24),
                truncate(&failure.title, 36),
                failure.reason
            );
        }
    }

    session.save()
}
