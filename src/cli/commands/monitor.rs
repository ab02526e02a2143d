use super::{open_ledger, open_pool, open_roster};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::engine::AttendanceEngine;
use crate::core::feedback::BellFeedback;
use crate::core::monitor::{ChannelPoller, Clock, Monitor, ScanReport};
use crate::core::scan_source::{InertSource, ScanSource, open_source};
use crate::db::log;
use crate::errors::{AppError, AppResult};
use crate::models::Channel;
use crate::ui::messages::{info, success, warning};
use crate::ui::report::{audit_entry, show_report};
use crate::utils::time::now_in;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Run one polling thread per configured reader and render their reports
/// on this thread until Ctrl-C.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Monitor { channels } = cmd else {
        return Ok(());
    };

    let only: Vec<Channel> = channels
        .iter()
        .map(|c| Channel::parse(c))
        .collect::<AppResult<_>>()?;

    let pool = open_pool(cfg)?;
    let offset = cfg.offset()?;
    let clock: Clock = Arc::new(move || now_in(&offset));

    let (mut monitor, tx, rx) = Monitor::open();
    let mut stdin_owner: Option<Channel> = None;

    for reader in &cfg.readers {
        let channel = Channel::parse(&reader.channel)?;
        if !only.is_empty() && !only.contains(&channel) {
            continue;
        }

        let opened = match (&stdin_owner, reader.source.trim()) {
            (Some(owner), "stdin") => Err(AppError::ScanSourceUnavailable(format!(
                "stdin is already used by channel '{}'",
                owner
            ))),
            _ => open_source(&reader.source),
        };

        let source: Box<dyn ScanSource + Send> = match opened {
            Ok(source) => {
                if reader.source.trim() == "stdin" {
                    stdin_owner = Some(channel.clone());
                }
                source
            }
            Err(e) => {
                let report = ScanReport::SourceUnavailable {
                    channel: channel.clone(),
                    reason: e.to_string(),
                };
                show_report(&report);
                if let Some((op, target, message)) = audit_entry(&report) {
                    log::ktlog_lenient(&pool.conn, op, &target, &message);
                }
                Box::new(InertSource::new(e.to_string()))
            }
        };

        info(format!("[{}] reader: {}", channel, source.describe()));

        let engine = AttendanceEngine::new(
            open_roster(cfg)?,
            open_ledger(cfg)?,
            BellFeedback::new(cfg.sound),
        )
        .with_policy(cfg.direction_policy)
        .with_retry(cfg.retry_policy());

        monitor.spawn(
            ChannelPoller::new(channel, source, engine),
            cfg.poll_interval(),
            Arc::clone(&clock),
            tx.clone(),
        )?;
    }
    drop(tx);

    if monitor.task_count() == 0 {
        warning("No readers configured for the selected channels.");
        return Ok(());
    }

    let stop = monitor.stop_flag();
    ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
        .map_err(|e| AppError::Other(format!("failed to install Ctrl-C handler: {}", e)))?;

    log::ktlog_lenient(
        &pool.conn,
        "monitor",
        "start",
        &format!("{} reader(s) started", monitor.task_count()),
    );
    success(format!(
        "Monitoring {} reader(s). Tap a card, Ctrl-C to stop.",
        monitor.task_count()
    ));

    let mut running = monitor.task_count();
    while running > 0 {
        let Ok(report) = rx.recv() else { break };

        if matches!(report, ScanReport::Stopped { .. }) {
            running -= 1;
        }
        show_report(&report);
        if let Some((op, target, message)) = audit_entry(&report) {
            log::ktlog_lenient(&pool.conn, op, &target, &message);
        }
    }

    monitor.shutdown();
    log::ktlog_lenient(&pool.conn, "monitor", "stop", "all readers stopped");
    info("Monitor stopped.");
    Ok(())
}
