use crate::actor::{spawn_actor_reserved, Actor, Addr, Reserved};
use anyhow::Result;
use std::any::Any;
use std::collections::HashMap;
use tokio::{sync::broadcast, task::JoinSet};

/// One broadcast that stops every actor and feeder task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(8);
        Self { tx }
    }

    pub fn signal(&self) {
        let _ = self.tx.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

/// Two-phase wiring: reserve every mailbox, then start actors with the
/// addresses they depend on.
///
/// The app is only useful while all of its actors run, so the first actor to
/// exit, cleanly or not, signals shutdown for the rest.
pub struct Builder {
    shutdown: ShutdownHandle,
    // subscribed up front so a signal sent before `run_until_shutdown` is kept
    stopped: broadcast::Receiver<()>,
    tasks: JoinSet<Result<()>>,
    // Concrete addresses by name for easy wiring.
    addrs: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        let shutdown = ShutdownHandle::new();
        Self {
            stopped: shutdown.subscribe(),
            shutdown,
            tasks: JoinSet::new(),
            addrs: HashMap::new(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Reserve an actor and publish its `Addr` under `name`.
    pub fn reserve<A>(&mut self, name: &str, mailbox: usize) -> Reserved<A>
    where
        A: Actor,
        Addr<A>: Send + Sync,
    {
        let r = spawn_actor_reserved::<A>(name, mailbox);
        self.addrs.insert(name.to_string(), Box::new(r.addr()));
        r
    }

    /// Start a previously reserved actor and track its task.
    pub fn start_reserved<A: Actor>(&mut self, r: Reserved<A>, actor: A) -> &mut Self {
        let name = r.name().to_string();
        let h = r.start_with_shutdown(actor, Some(self.shutdown.subscribe()));
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            let res = h.task.await;
            tracing::debug!(actor = %name, "actor exited; signalling shutdown");
            shutdown.signal();
            res?
        });
        self
    }

    /// Get a typed address by name.
    pub fn addr<A: Actor>(&self, name: &str) -> Option<Addr<A>> {
        self.addrs
            .get(name)
            .and_then(|b| b.downcast_ref::<Addr<A>>().cloned())
    }

    /// Block until CTRL-C or a shutdown signal, stop everything, and return
    /// the first actor error (or panic).
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = self.stopped.recv() => {}
        }
        // Drop published addresses so actor mailboxes close.
        self.addrs.clear();
        self.shutdown.signal();

        let mut first_err = None;
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined.map_err(anyhow::Error::from).and_then(|r| r) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Context;

    struct Noop;

    #[async_trait::async_trait]
    impl Actor for Noop {
        type Msg = ();
        async fn handle(&mut self, _msg: (), _ctx: &mut Context<Self>) -> Result<()> {
            Ok(())
        }
    }

    struct Other;

    #[async_trait::async_trait]
    impl Actor for Other {
        type Msg = u8;
        async fn handle(&mut self, _msg: u8, _ctx: &mut Context<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn addresses_are_typed_by_name() {
        let mut b = Builder::new();
        let r = b.reserve::<Noop>("noop", 2);
        assert!(b.addr::<Noop>("noop").is_some());
        assert!(b.addr::<Other>("noop").is_none());
        assert!(b.addr::<Noop>("missing").is_none());
        b.start_reserved(r, Noop);
    }

    struct Crash;

    #[async_trait::async_trait]
    impl Actor for Crash {
        type Msg = ();
        async fn handle(&mut self, _msg: (), _ctx: &mut Context<Self>) -> Result<()> {
            anyhow::bail!("terminal went away")
        }
    }

    #[tokio::test]
    async fn a_failing_actor_stops_the_rest() {
        let mut b = Builder::new();
        let r_noop = b.reserve::<Noop>("noop", 2);
        let r_crash = b.reserve::<Crash>("crash", 2);
        let crash = r_crash.addr();
        b.start_reserved(r_noop, Noop);
        b.start_reserved(r_crash, Crash);

        assert!(crash.send(()).await.is_ok());
        let res = tokio::time::timeout(std::time::Duration::from_secs(5), b.run_until_shutdown())
            .await
            .expect("run_until_shutdown returned");
        let err = res.expect_err("actor error is reported");
        assert!(err.to_string().contains("terminal went away"));
    }

    #[tokio::test]
    async fn internal_signal_shuts_everything_down() {
        let mut b = Builder::new();
        let r = b.reserve::<Noop>("noop", 2);
        b.start_reserved(r, Noop);
        let shutdown = b.shutdown_handle();

        let run = tokio::spawn(b.run_until_shutdown());
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        shutdown.signal();
        run.await.unwrap().unwrap();
    }
}
