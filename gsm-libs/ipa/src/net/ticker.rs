//! ticker - periodic event for timers driven from the relay loop

use async_channel::Sender;
use async_std::task;
use std::time::Duration;
use stop_token::StopSource;
use stop_token::prelude::*;

pub struct Ticker {
    _stop: StopSource,
}

impl Ticker {
    /// Post `make()` to `events` every `period` until dropped.
    pub fn spawn<E: Send + 'static>(period: Duration, events: Sender<E>, make: fn() -> E) -> Self {
        let stop = StopSource::new();
        let token = stop.token();
        task::spawn(async move {
            while task::sleep(period).timeout_at(token.clone()).await.is_ok() {
                if events.send(make()).await.is_err() {
                    return;
                }
            }
        });
        Ticker { _stop: stop }
    }
}
