//! Rill Click Demo
//!
//! Wires the library to its two host collaborators:
//! - A one-shot timeout on the tokio scheduler
//! - A synthetic button whose clicks are mapped to their x offset and
//!   filtered against a threshold
//!
//! Set `RUST_LOG=rill_core=trace` to watch subscriptions come and go.

use std::rc::Rc;
use std::time::Duration;

use rill_core::{EventTarget, FnObserver, Observable, Scheduler};
use rill_time::TokioScheduler;
use tracing_subscriber::EnvFilter;

/// A click on the synthetic button
#[derive(Clone, Debug)]
struct Click {
    offset_x: i32,
}

/// Demo configuration
#[derive(Clone, Debug)]
struct DemoConfig {
    /// Delay before the timeout stream fires
    timeout: Duration,
    /// Clicks at or left of this offset are dropped
    click_threshold: i32,
    /// Offsets of the synthetic clicks, one per `click_interval`
    clicks: Vec<i32>,
    click_interval: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            timeout: Duration::from_millis(500),
            click_threshold: 10,
            clicks: vec![4, 25, 10, 80, 11, 2],
            click_interval: Duration::from_millis(120),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = DemoConfig::default();
    let scheduler = Rc::new(TokioScheduler::new());
    let button = Rc::new(EventTarget::<Click>::new());

    // Timeout
    let timeout = Observable::timeout(config.timeout, scheduler.clone());
    let timeout_sub = timeout.subscribe(
        FnObserver::on_next(|_| tracing::info!("timeout: next"))
            .with_error(|err| tracing::warn!(error = %err, "timeout: error"))
            .with_complete(|| tracing::info!("timeout: done")),
    );

    // Clicks
    let threshold = config.click_threshold;
    let clicks = Observable::from_event(button.clone(), "click")
        .map(|click: Click| click.offset_x)
        .filter(move |x| *x > threshold);
    let clicks_sub = clicks.subscribe(
        FnObserver::on_next(|x: i32| tracing::info!(offset_x = x, "click"))
            .with_error(|err| tracing::warn!(error = %err, "clicks: error")),
    );

    // Synthetic user
    let mut delay = Duration::ZERO;
    for offset_x in config.clicks.iter().copied() {
        delay += config.click_interval;
        let button = Rc::clone(&button);
        scheduler.schedule_once(
            delay,
            Box::new(move || {
                let delivered = button.dispatch("click", &Click { offset_x });
                tracing::debug!(offset_x, delivered, "button clicked");
            }),
        )?;
    }

    scheduler.run_until_idle().await;

    clicks_sub.unsubscribe();
    timeout_sub.unsubscribe();
    tracing::info!(
        listeners = button.listener_count("click"),
        pending = scheduler.pending(),
        "demo finished"
    );
    Ok(())
}
