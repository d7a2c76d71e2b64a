use crate::tally::snapshot::{Refresh, SnapshotLoader};
use log::{debug, error, info, warn};
use sqlx::postgres::PgListener;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// What woke the loop up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Tick,
    /// Tables named by the notifications coalesced into this refresh.
    Changed(Vec<String>),
}

// Waits for the next notification; never resolves when there is no listener.
async fn next_change(listener: &mut Option<PgListener>) -> Option<sqlx::Result<String>> {
    match listener {
        Some(listener) => Some(listener.recv().await.map(|n| n.payload().to_string())),
        None => std::future::pending().await,
    }
}

// Notifications that arrived while we were busy fold into the same refresh.
fn drain_buffered(listener: &mut Option<PgListener>, tables: &mut Vec<String>) {
    if let Some(listener) = listener {
        while let Some(notification) = listener.next_buffered() {
            let table = notification.payload().to_string();
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
    }
}

/// Re-fetches the snapshot on startup, on every change notification and on
/// every `period`, handing each result to `on_refresh`, until `shutdown`
/// resolves. Every refresh is a full re-fetch.
pub async fn watch_task<F, S>(
    mut loader: SnapshotLoader,
    mut listener: Option<PgListener>,
    period: Duration,
    shutdown: S,
    mut on_refresh: F,
) -> usize
where
    F: FnMut(&Refresh, &Trigger),
    S: Future<Output = ()>,
{
    info!(
        "Starting refresh loop (every {}s, notifications {})",
        period.as_secs(),
        if listener.is_some() { "on" } else { "off" }
    );
    tokio::pin!(shutdown);

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut refreshes = 0;
    let mut trigger = Trigger::Startup;
    loop {
        let refresh = loader.refresh().await;
        refreshes += 1;
        on_refresh(&refresh, &trigger);

        trigger = tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => Trigger::Tick,
            change = next_change(&mut listener) => match change {
                Some(Ok(table)) => {
                    let mut tables = vec![table];
                    drain_buffered(&mut listener, &mut tables);
                    debug!("Change notification from {:?}", tables);
                    // A notification stands in for the next tick.
                    ticker.reset();
                    Trigger::Changed(tables)
                }
                Some(Err(e)) => {
                    error!("Change listener failed: {}", e);
                    warn!("Falling back to periodic refresh only");
                    listener = None;
                    Trigger::Tick
                }
                None => Trigger::Tick,
            },
        };
    }

    info!("Refresh loop stopped after {} refresh(es)", refreshes);
    refreshes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FileSource;
    use std::sync::Arc;

    #[tokio::test]
    async fn refreshes_on_startup_and_on_every_tick() {
        let loader = SnapshotLoader::new(Arc::new(FileSource::new("/nonexistent/snapshot.json")));
        let mut triggers = Vec::new();
        let count = watch_task(
            loader,
            None,
            Duration::from_millis(20),
            tokio::time::sleep(Duration::from_millis(110)),
            |refresh, trigger| {
                assert!(!refresh.fresh);
                triggers.push(trigger.clone());
            },
        )
        .await;

        assert_eq!(count, triggers.len());
        assert_eq!(triggers[0], Trigger::Startup);
        assert!(triggers.len() >= 3, "only {} refreshes", triggers.len());
        assert!(triggers[1..].iter().all(|t| *t == Trigger::Tick));
    }

    #[tokio::test]
    async fn stops_immediately_on_shutdown() {
        let loader = SnapshotLoader::new(Arc::new(FileSource::new("/nonexistent/snapshot.json")));
        let count = watch_task(
            loader,
            None,
            Duration::from_secs(3600),
            std::future::ready(()),
            |_, _| {},
        )
        .await;
        assert_eq!(count, 1);
    }
}
