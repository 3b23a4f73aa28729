use crate::tui::{TuiActor, TuiMsg};
use kai_actors::actor::Addr;
use kai_actors::builder::ShutdownHandle;
use std::time::Duration;
use tokio::time;

/// Forward terminal input and a redraw tick into the UI mailbox until shutdown.
pub fn spawn_tui_feeders(tui: Addr<TuiActor>, shutdown: ShutdownHandle, tick: Duration) {
    let tui_in = tui.clone();
    let mut shutdown_input = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_input.recv() => break,
                ev = tokio::task::spawn_blocking(crossterm::event::read) => {
                    match ev {
                        Ok(Ok(e)) => {
                            if tui_in.send(TuiMsg::InputEvent(e)).await.is_err() {
                                break;
                            }
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "Terminal input error");
                            let _ = tui_in.send(TuiMsg::OpError(format!("input: {e}"))).await;
                        }
                        Err(_) => break,
                    }
                }
            }
        }
        tracing::debug!("Input feeder stopped");
    });

    let tui_tick = tui;
    let mut shutdown_tick = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = time::interval(tick);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown_tick.recv() => break,
                _ = interval.tick() => {
                    // a full mailbox means a redraw is already queued
                    let _ = tui_tick.try_send(TuiMsg::Tick);
                }
            }
        }
    });
}
