//! Periodic-message actlet driver.

use crate::context::Context;
use crate::error::Result;
use crate::message::Message;
use crate::messages::{TimerConfiguration, TimerDoneMessage};
use crate::proxy::Proxy;

/// Runs the `{message, interval, delay, now, repetitions}` protocol.
/// `repetitions == 0` means unbounded, regardless of `now`. Intended to be
/// driven through [`crate::actlet::spawn`] so that cancellation between
/// sleeps is reported to the owner the same way any other actlet
/// cancellation is; every step here is an infallible sleep or send, so
/// there is no reachable error path to fail-quiet on and this driver never
/// needs its own catch-and-log branch to still return `TimerDoneMessage`.
pub async fn run<M: Message + Clone>(ctx: Context, owner: Proxy, config: TimerConfiguration<M>) -> Result<TimerDoneMessage> {
    if !config.delay.is_zero() {
        tokio::time::sleep(config.delay).await;
    }

    let mut remaining = if config.repetitions > 0 { Some(config.repetitions) } else { None };

    if config.now {
        owner.tell(&ctx, config.message.clone(), None);
        remaining = remaining.map(|r| r - 1);
        if remaining == Some(0) {
            return Ok(TimerDoneMessage);
        }
    }

    loop {
        if remaining == Some(0) {
            break;
        }
        tokio::time::sleep(config.interval).await;
        owner.tell(&ctx, config.message.clone(), None);
        remaining = remaining.map(|r| r - 1);
    }

    Ok(TimerDoneMessage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Core;
    use crate::identity::Identity;
    use crate::message::downcast_message;
    use serde::{Deserialize, Serialize};
    use crate::service::Service;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Tick;

    fn harness() -> (Context, Proxy, mpsc::UnboundedReceiver<crate::proxy::MailboxItem>) {
        let core = Core::new(slog::Logger::root(slog::Discard, slog::o!()));
        let ctx = Context::root(core, slog::Logger::root(slog::Discard, slog::o!()));
        let (tx, rx) = mpsc::unbounded_channel();
        let owner = Proxy::new(Identity::root(), tx, Service::new());
        (ctx, owner, rx)
    }

    #[tokio::test]
    async fn now_and_repetitions_deliver_exact_count() {
        let (ctx, owner, mut rx) = harness();
        let config = TimerConfiguration::new(Tick, Duration::from_millis(5))
            .with_now(true)
            .with_repetitions(3);
        let done = run(ctx, owner, config).await.unwrap();
        assert_eq!(done, TimerDoneMessage);

        let mut ticks = 0;
        while let Ok((envelope, tx)) = tokio::time::timeout(Duration::from_millis(50), rx.recv())
            .await
            .map(|o| o.expect("channel open"))
        {
            let _ = downcast_message::<Tick>(envelope.message).unwrap();
            tx.resolve(crate::tracker::Outcome::Unhandled);
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test]
    async fn unbounded_when_repetitions_zero_keeps_sending() {
        let (ctx, owner, mut rx) = harness();
        let config = TimerConfiguration::new(Tick, Duration::from_millis(2)).with_now(true);
        tokio::spawn(run(ctx, owner, config));

        for _ in 0..3 {
            let (envelope, tx) = tokio::time::timeout(Duration::from_millis(50), rx.recv())
                .await
                .unwrap()
                .unwrap();
            let _ = downcast_message::<Tick>(envelope.message).unwrap();
            tx.resolve(crate::tracker::Outcome::Unhandled);
        }
    }
}
