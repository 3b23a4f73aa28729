use anyhow::Result;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

/// Minimal actor trait. `Self: Sized` avoids object-safety issues when using `Context<Self>`.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Runtime context for an actor instance.
pub struct Context<A: Actor> {
    addr: Addr<A>,
    stop: bool,
}

impl<A: Actor> Context<A> {
    /// Get a clone of this actor's `Addr`, e.g. to hand to a spawned task
    /// that reports back later.
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Request a graceful stop after processing the current message.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use kai_actors::actor::{self, Actor, Context};
    /// struct StopOnSecond(u8);
    ///
    /// #[async_trait]
    /// impl Actor for StopOnSecond {
    ///     type Msg = u8;
    ///     async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
    ///         self.0 += msg;
    ///         if self.0 >= 2 {
    ///             ctx.stop();
    ///         }
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let actor::ActorHandle { addr, task } = actor::spawn_actor(StopOnSecond(0), 4);
    ///     addr.send(1).await.unwrap();
    ///     addr.send(1).await.unwrap();
    ///     task.await.unwrap().unwrap();
    /// });
    /// ```
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Address for sending messages to an actor.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

/// Manual Clone to avoid unnecessary bounds on `A`/`A::Msg`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Async send; awaits backpressure. Returns the message if the receiver is dropped.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Try to send without waiting. Returns the message if the mailbox is full or closed.
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    /// Bounded mailbox capacity.
    pub fn capacity(&self) -> usize {
        self.0.max_capacity()
    }
}

/// Handle to a running actor task.
pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

/// Spawn an actor with a bounded mailbox.
///
/// Stop conditions:
/// - `handle` returns `Err`
/// - all senders are dropped
/// - `ctx.stop()` is called
/// - the shutdown channel fires (when one is given)
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    spawn_actor_reserved::<A>("anonymous", capacity).start_with_shutdown(actor, shutdown)
}

async fn run_loop<A: Actor>(
    mut actor: A,
    mut ctx: Context<A>,
    mut rx: mpsc::Receiver<A::Msg>,
    shutdown: Option<broadcast::Receiver<()>>,
    name: String,
) -> Result<()> {
    let mut shutdown = shutdown;
    loop {
        let next = match shutdown.as_mut() {
            Some(shutdown_rx) => tokio::select! {
                _ = shutdown_rx.recv() => None,
                maybe_msg = rx.recv() => maybe_msg,
            },
            None => rx.recv().await,
        };
        let Some(msg) = next else { break };

        if let Err(e) = actor.handle(msg, &mut ctx).await {
            tracing::error!(target = "kai-actors", actor = %name, error = ?e, "actor returned error; stopping");
            return Err(e);
        }
        if ctx.stop {
            break;
        }
    }
    tracing::debug!(target = "kai-actors", actor = %name, "actor stopped");
    Ok(())
}

/// Reserved spawn: create mailbox+addr now; start the task later.
///
/// Lets two actors hold each other's addresses before either runs.
pub struct Reserved<A: Actor> {
    name: String,
    addr: Addr<A>,
    rx: mpsc::Receiver<A::Msg>,
}

impl<A: Actor> Reserved<A> {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Start the actor task using the reserved mailbox.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use kai_actors::actor::{self, Actor, Context};
    /// # struct Echo;
    /// # #[async_trait]
    /// # impl Actor for Echo {
    /// #     type Msg = &'static str;
    /// #     async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
    /// #         assert_eq!(msg, "ping");
    /// #         ctx.stop();
    /// #         Ok(())
    /// #     }
    /// # }
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let reserved = actor::spawn_actor_reserved::<Echo>("echo", 4);
    ///     let addr = reserved.addr();
    ///     let handle = reserved.start(Echo);
    ///     addr.send("ping").await.unwrap();
    ///     drop(addr);
    ///     handle.task.await.unwrap().unwrap();
    /// });
    /// ```
    /// Give up on running a task and take the mailbox itself; the caller
    /// drains it by hand.
    pub fn into_mailbox(self) -> (Addr<A>, mpsc::Receiver<A::Msg>) {
        (self.addr, self.rx)
    }

    pub fn start(self, actor: A) -> ActorHandle<A> {
        self.start_with_shutdown(actor, None)
    }

    pub fn start_with_shutdown(
        self,
        actor: A,
        shutdown: Option<broadcast::Receiver<()>>,
    ) -> ActorHandle<A> {
        let ctx = Context {
            addr: self.addr.clone(),
            stop: false,
        };
        let task = tokio::spawn(run_loop(actor, ctx, self.rx, shutdown, self.name));

        ActorHandle {
            addr: self.addr,
            task,
        }
    }
}

/// Create a named mailbox whose actor is supplied later.
pub fn spawn_actor_reserved<A: Actor>(name: impl Into<String>, capacity: usize) -> Reserved<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity);
    Reserved {
        name: name.into(),
        addr: Addr(tx),
        rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    struct Summer {
        total: u32,
        done: Option<oneshot::Sender<u32>>,
    }

    #[async_trait::async_trait]
    impl Actor for Summer {
        type Msg = Option<u32>;

        async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
            match msg {
                Some(n) => self.total += n,
                None => {
                    if let Some(tx) = self.done.take() {
                        let _ = tx.send(self.total);
                    }
                    ctx.stop();
                }
            }
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Actor for Failing {
        type Msg = ();
        async fn handle(&mut self, _msg: (), _ctx: &mut Context<Self>) -> Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn processes_messages_in_order_then_stops() {
        let (tx, rx) = oneshot::channel();
        let ActorHandle { addr, task } = spawn_actor(
            Summer {
                total: 0,
                done: Some(tx),
            },
            4,
        );
        assert_eq!(addr.capacity(), 4);
        addr.send(Some(2)).await.unwrap();
        addr.send(Some(3)).await.unwrap();
        addr.send(None).await.unwrap();
        assert_eq!(rx.await.unwrap(), 5);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn handler_error_stops_the_actor() {
        let ActorHandle { addr, task } = spawn_actor(Failing, 1);
        addr.send(()).await.unwrap();
        assert!(task.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn shutdown_signal_stops_idle_actor() {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn_actor_with_shutdown(
            Summer {
                total: 0,
                done: None,
            },
            1,
            Some(shutdown_rx),
        );
        shutdown_tx.send(()).unwrap();
        handle.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn reserved_mailbox_buffers_until_started() {
        let reserved = spawn_actor_reserved::<Summer>("summer", 4);
        assert_eq!(reserved.name(), "summer");
        let addr = reserved.addr();
        addr.try_send(Some(7)).unwrap();

        let (tx, rx) = oneshot::channel();
        let handle = reserved.start(Summer {
            total: 0,
            done: Some(tx),
        });
        addr.send(None).await.unwrap();
        assert_eq!(rx.await.unwrap(), 7);
        handle.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn mailbox_can_be_drained_by_hand() {
        let (addr, mut rx) = spawn_actor_reserved::<Summer>("manual", 1).into_mailbox();
        addr.try_send(Some(1)).unwrap();
        assert!(addr.try_send(Some(2)).is_err(), "capacity is respected");
        assert_eq!(rx.recv().await, Some(Some(1)));
    }
}
