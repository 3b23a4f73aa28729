use crate::{
    clipboard::Clipboard,
    command::Command,
    state::{ChatState, NoticeKind, Submission},
    view::{self, ViewSnap},
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    cursor::Show,
    event::{Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use kai_actors::{
    AskCmd, Reply,
    actor::{Actor, Addr, Context},
    assistant::AssistantActor,
    builder::ShutdownHandle,
};
use kai_config::UiSettings;
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use std::{
    io::{self, Stdout},
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};
use tokio::sync::oneshot;
use uuid::Uuid;

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const PAGE: usize = 5;

static TERMINAL_TAKEN: AtomicBool = AtomicBool::new(false);

/// Leave raw mode and the alternate screen if the UI entered them. Safe to
/// call more than once and from a panic hook.
pub fn restore_terminal() {
    if TERMINAL_TAKEN.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

/// Restore the terminal before the default panic report is printed, so the
/// message lands on a usable screen.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        previous(info);
    }));
}

/// Raw mode + alternate screen for as long as it lives.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        TERMINAL_TAKEN.store(true, Ordering::SeqCst);
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

#[derive(Debug)]
pub enum TuiMsg {
    InputEvent(CtEvent),
    Tick,
    Submit,
    Replied(Reply),
    /// The request ended without a reply.
    AskDropped(Uuid),
    OpError(String),
    Copy,
    Shutdown,
}

pub struct TuiActor<B: Backend = CrosstermBackend<Stdout>> {
    // deps
    assistant: Addr<AssistantActor>,
    clipboard: Box<dyn Clipboard>,

    // terminal; the guard is dropped with the actor however it stops
    term: Terminal<B>,
    guard: Option<TerminalGuard>,
    tick_rate: Duration,
    last_tick: Instant,

    state: ChatState,
    copied_for: Duration,
    max_scroll: usize,
    dirty: bool,
    spin_idx: usize,
    was_copied: bool,

    // shutdown coordination
    shutdown: ShutdownHandle,
}

impl TuiActor {
    /// Takes over the real terminal (raw mode, alternate screen). It is handed
    /// back on [`TuiMsg::Shutdown`] or when the actor is dropped.
    pub fn new(
        assistant: Addr<AssistantActor>,
        clipboard: Box<dyn Clipboard>,
        ui: &UiSettings,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        let guard = TerminalGuard::enter()?;
        let mut term = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        term.clear()?;

        let mut actor = Self::with_terminal(assistant, clipboard, ui, shutdown, term);
        actor.guard = Some(guard);
        Ok(actor)
    }
}

impl<B: Backend + Send + 'static> TuiActor<B> {
    /// Draw into an already prepared terminal.
    pub fn with_terminal(
        assistant: Addr<AssistantActor>,
        clipboard: Box<dyn Clipboard>,
        ui: &UiSettings,
        shutdown: ShutdownHandle,
        term: Terminal<B>,
    ) -> Self {
        Self {
            assistant,
            clipboard,
            term,
            guard: None,
            tick_rate: Duration::from_millis(ui.tick_ms),
            last_tick: Instant::now(),
            state: ChatState::new(),
            copied_for: Duration::from_millis(ui.copied_ms),
            max_scroll: 0,
            dirty: true,
            spin_idx: 0,
            was_copied: false,
            shutdown,
        }
    }

    fn spinner(&self) -> &'static str {
        if self.state.loading() {
            BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()]
        } else {
            " "
        }
    }

    fn step_spinner(&mut self) {
        if self.state.loading() {
            self.spin_idx = (self.spin_idx + 1) % BRAILLE_FRAMES.len();
            self.dirty = true;
        }
        // redraw once more when the copied indicator expires
        let copied = self.state.is_copied();
        if copied != self.was_copied {
            self.was_copied = copied;
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let snap = ViewSnap {
            input: self.state.input(),
            input_cursor: self.state.cursor(),
            prompt: self.state.asking().or(self.state.last_prompt()),
            doc: self.state.document(),
            scroll: self.state.scroll(),
            loading: self.state.loading(),
            spinner: self.spinner(),
            copied: self.state.is_copied(),
            notice: self.state.notice(),
        };

        self.max_scroll = view::draw(&mut self.term, &snap)?;
        self.state.clamp_scroll(self.max_scroll);
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<TuiMsg> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        self.dirty = true;
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('q'), KeyModifiers::CONTROL) => return Some(TuiMsg::Shutdown),
            (KeyCode::Char('y'), KeyModifiers::CONTROL) => return Some(TuiMsg::Copy),
            (KeyCode::Enter, _) => return Some(TuiMsg::Submit),
            (KeyCode::PageUp, _) => self.state.scroll_up(PAGE),
            (KeyCode::PageDown, _) => self.state.scroll_down(PAGE, self.max_scroll),
            (KeyCode::Up, _) => self.state.scroll_up(1),
            (KeyCode::Down, _) => self.state.scroll_down(1, self.max_scroll),
            (KeyCode::Left, _) => self.state.cursor_left(),
            (KeyCode::Right, _) => self.state.cursor_right(),
            (KeyCode::Home, _) => self.state.cursor_home(),
            (KeyCode::End, _) => self.state.cursor_end(),
            (KeyCode::Backspace, _) => self.state.backspace(),
            (KeyCode::Delete, _) => self.state.delete(),
            (KeyCode::Esc, _) => self.state.clear_input(),
            (KeyCode::Char(ch), m) if !m.contains(KeyModifiers::CONTROL) => {
                self.state.insert_char(ch)
            }
            _ => self.dirty = false,
        }
        None
    }

    fn route_submit(&mut self, me: &Addr<Self>) {
        self.dirty = true;
        match self.state.submit() {
            Submission::Empty => {}
            Submission::Busy => tracing::debug!("Submission ignored while generating"),
            Submission::Command(cmd) => self.handle_command(cmd, me),
            Submission::Prompt { id, prompt } => self.ask(id, prompt, me.clone()),
        }
    }

    fn ask(&mut self, id: Uuid, prompt: String, me: Addr<Self>) {
        tracing::info!(%id, chars = prompt.chars().count(), "Prompt submitted");

        let (tx, rx) = oneshot::channel::<Reply>();
        if self
            .assistant
            .try_send(AskCmd {
                id,
                prompt,
                reply: tx,
            })
            .is_err()
        {
            tracing::error!(%id, "Assistant mailbox full or closed");
            self.state.fail(id);
            return;
        }

        tokio::spawn(async move {
            let msg = match rx.await {
                Ok(reply) => TuiMsg::Replied(reply),
                Err(_) => TuiMsg::AskDropped(id),
            };
            let _ = me.send(msg).await;
        });
    }

    fn copy(&mut self) {
        self.dirty = true;
        if self
            .state
            .copy_response(self.clipboard.as_mut(), self.copied_for)
        {
            tracing::debug!("Response copied");
        }
    }

    fn handle_command(&mut self, cmd: Command, me: &Addr<Self>) {
        match cmd {
            Command::Quit => {
                let _ = me.try_send(TuiMsg::Shutdown);
            }
            Command::Copy => self.copy(),
            Command::Clear => self.state.clear_response(),
            Command::Help => self.state.set_notice(
                NoticeKind::Info,
                "/copy copy answer · /clear clear panel · /quit exit",
            ),
        }
    }

    /// Apply one message. Returns `true` once the UI has shut down.
    fn process(&mut self, msg: TuiMsg, me: &Addr<Self>) -> Result<bool> {
        match msg {
            TuiMsg::InputEvent(ev) => match ev {
                CtEvent::Key(k) => {
                    if let Some(next) = self.handle_key(k) {
                        let _ = me.try_send(next);
                    }
                }
                CtEvent::Resize(..) => self.dirty = true,
                _ => {}
            },
            TuiMsg::Submit => self.route_submit(me),
            TuiMsg::Replied(reply) => {
                let id = reply.id;
                if self.state.settle(reply) {
                    self.dirty = true;
                } else {
                    tracing::debug!(%id, "Dropping reply for a request no longer pending");
                }
            }
            TuiMsg::AskDropped(id) => {
                tracing::error!(%id, "Assistant dropped the request without replying");
                self.dirty |= self.state.fail(id);
            }
            TuiMsg::OpError(e) => {
                self.state.set_notice(NoticeKind::Error, format!("Error: {e}"));
                self.dirty = true;
            }
            TuiMsg::Copy => self.copy(),
            TuiMsg::Tick => {
                self.step_spinner();
                if self.dirty || self.last_tick.elapsed() >= self.tick_rate {
                    self.draw()?;
                    self.last_tick = Instant::now();
                    self.dirty = false;
                }
            }
            TuiMsg::Shutdown => {
                self.guard.take();
                let _ = self.term.show_cursor();
                tracing::info!("UI closed");
                self.shutdown.signal();
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl<B: Backend + Send + 'static> Actor for TuiActor<B> {
    type Msg = TuiMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        if self.process(msg, &ctx.addr())? {
            ctx.stop();
        }
        Ok(())
    }
}
