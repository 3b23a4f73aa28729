//! Everything the UI remembers between frames.
//!
//! Owned by the UI actor and mutated only from its mailbox, so none of this
//! needs locking. Time-based state (the copied indicator) reads the tokio
//! clock, which lets tests drive it with a paused runtime.
use crate::clipboard::Clipboard;
use crate::command::{parse_command, Command};
use crate::markdown::{self, Document};
use kai_actors::{Outcome, Reply, FALLBACK_MESSAGE};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// What pressing Enter turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank or whitespace-only input; nothing happens.
    Empty,
    /// A request is still outstanding; the input is kept.
    Busy,
    Command(Command),
    Prompt { id: Uuid, prompt: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ChatState {
    input: String,
    cursor: usize,

    response: String,
    doc: Document,
    last_prompt: Option<String>,

    // in flight
    pending: Option<Uuid>,
    asking: Option<String>,

    copied_until: Option<Instant>,
    scroll: usize, // lines from the top of the response
    notice: Option<Notice>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The prompt the current response answers.
    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    /// The prompt currently being answered.
    pub fn asking(&self) -> Option<&str> {
        self.asking.as_deref()
    }

    pub fn loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<Uuid> {
        self.pending
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            text: text.into(),
        });
    }

    /// Read the input line and decide what it means.
    ///
    /// Accepting a prompt clears the input and turns loading on before
    /// anything is sent, so a second Enter can never race the first.
    pub fn submit(&mut self) -> Submission {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            return Submission::Empty;
        }

        if let Some(cmd) = parse_command(trimmed) {
            self.clear_input();
            self.notice = None;
            return Submission::Command(cmd);
        }

        if self.loading() {
            self.set_notice(
                NoticeKind::Info,
                "Still generating. Press Enter again once the answer arrives.",
            );
            return Submission::Busy;
        }

        let prompt = trimmed.to_string();
        self.clear_input();
        self.notice = None;

        let id = Uuid::new_v4();
        self.pending = Some(id);
        self.asking = Some(prompt.clone());
        Submission::Prompt { id, prompt }
    }

    /// Apply the assistant's reply. Replies for anything but the outstanding
    /// request are dropped and `false` is returned.
    pub fn settle(&mut self, reply: Reply) -> bool {
        if self.pending != Some(reply.id) {
            return false;
        }
        if reply.outcome == Outcome::Failed {
            self.set_notice(NoticeKind::Error, "Generation failed.");
        }
        self.finish(reply.text);
        true
    }

    /// The request `id` ended without a reply (mailbox full or closed, reply
    /// channel dropped). Treated like any other failed generation.
    pub fn fail(&mut self, id: Uuid) -> bool {
        if self.pending != Some(id) {
            return false;
        }
        self.set_notice(NoticeKind::Error, "Generation failed.");
        self.finish(FALLBACK_MESSAGE.to_string());
        true
    }

    fn finish(&mut self, text: String) {
        self.pending = None;
        self.last_prompt = self.asking.take();
        self.doc = markdown::parse(&text);
        self.response = text;
        self.scroll = 0;
    }

    /// Empty the response panel. An outstanding request still lands.
    pub fn clear_response(&mut self) {
        self.response.clear();
        self.doc = Document::default();
        self.last_prompt = None;
        self.scroll = 0;
        self.copied_until = None;
    }

    /// Put the whole response on `clipboard` and raise the copied indicator
    /// for `hold`. Returns whether anything was copied.
    pub fn copy_response(&mut self, clipboard: &mut dyn Clipboard, hold: Duration) -> bool {
        if self.response.is_empty() {
            self.set_notice(NoticeKind::Info, "Nothing to copy yet.");
            return false;
        }
        match clipboard.copy(&self.response) {
            Ok(()) => {
                self.mark_copied(hold);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Clipboard copy failed");
                self.set_notice(NoticeKind::Error, format!("Copy failed: {e}"));
                false
            }
        }
    }

    pub fn mark_copied(&mut self, hold: Duration) {
        self.copied_until = Some(Instant::now() + hold);
    }

    pub fn is_copied(&self) -> bool {
        self.copied_until.is_some_and(|t| Instant::now() < t)
    }

    // scrolling

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize, max: usize) {
        self.scroll = self.scroll.saturating_add(n).min(max);
    }

    pub fn clamp_scroll(&mut self, max: usize) {
        self.scroll = self.scroll.min(max);
    }

    // line editing

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.input.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut prev = self.cursor - 1;
        while prev > 0 && !self.input.is_char_boundary(prev) {
            prev -= 1;
        }
        self.input.drain(prev..self.cursor);
        self.cursor = prev;
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.input.len() {
            return;
        }
        let mut end = self.cursor + 1;
        while end < self.input.len() && !self.input.is_char_boundary(end) {
            end += 1;
        }
        self.input.drain(self.cursor..end);
    }

    pub fn cursor_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        while self.cursor > 0 && !self.input.is_char_boundary(self.cursor) {
            self.cursor -= 1;
        }
    }

    pub fn cursor_right(&mut self) {
        if self.cursor >= self.input.len() {
            return;
        }
        self.cursor += 1;
        while self.cursor < self.input.len() && !self.input.is_char_boundary(self.cursor) {
            self.cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::markdown::Block;

    fn typed(text: &str) -> ChatState {
        let mut s = ChatState::new();
        text.chars().for_each(|c| s.insert_char(c));
        s
    }

    fn prompt_id(sub: Submission) -> Uuid {
        match sub {
            Submission::Prompt { id, .. } => id,
            other => panic!("expected a prompt, got {other:?}"),
        }
    }

    fn reply(id: Uuid, text: &str, outcome: Outcome) -> Reply {
        Reply {
            id,
            text: text.into(),
            outcome,
        }
    }

    #[test]
    fn submit_turns_loading_on_and_success_turns_it_off() {
        let mut s = typed("  what is rust?  ");
        let sub = s.submit();
        assert_eq!(
            sub,
            Submission::Prompt {
                id: s.pending().unwrap(),
                prompt: "what is rust?".into()
            }
        );
        assert!(s.loading());
        assert_eq!(s.input(), "");
        assert_eq!(s.asking(), Some("what is rust?"));

        let id = prompt_id(sub);
        assert!(s.settle(reply(id, "# Rust\n\nA language.", Outcome::Succeeded)));
        assert!(!s.loading());
        assert_eq!(s.response(), "# Rust\n\nA language.");
        assert_eq!(s.last_prompt(), Some("what is rust?"));
        assert!(matches!(s.document().blocks[0], Block::Heading { level: 1, .. }));
        assert!(s.notice().is_none());
    }

    #[test]
    fn failed_reply_also_clears_loading() {
        let mut s = typed("hi");
        let id = prompt_id(s.submit());
        assert!(s.settle(reply(id, FALLBACK_MESSAGE, Outcome::Failed)));
        assert!(!s.loading());
        assert_eq!(s.response(), FALLBACK_MESSAGE);
        assert_eq!(s.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[test]
    fn dropped_reply_falls_back() {
        let mut s = typed("hi");
        let id = prompt_id(s.submit());
        assert!(s.fail(id));
        assert!(!s.loading());
        assert_eq!(s.response(), FALLBACK_MESSAGE);
    }

    #[test]
    fn whitespace_only_input_is_ignored() {
        let mut s = typed("first");
        let id = prompt_id(s.submit());
        s.settle(reply(id, "answer", Outcome::Succeeded));

        "  \t ".chars().for_each(|c| s.insert_char(c));
        assert_eq!(s.submit(), Submission::Empty);
        assert!(!s.loading());
        assert_eq!(s.response(), "answer");
        assert_eq!(s.input(), "  \t ");
    }

    #[test]
    fn submission_while_loading_is_ignored() {
        let mut s = typed("one");
        let first = prompt_id(s.submit());

        "two".chars().for_each(|c| s.insert_char(c));
        assert_eq!(s.submit(), Submission::Busy);
        assert_eq!(s.pending(), Some(first));
        assert_eq!(s.input(), "two");
        assert_eq!(s.asking(), Some("one"));
    }

    #[test]
    fn stale_replies_are_dropped() {
        let mut s = typed("one");
        let id = prompt_id(s.submit());
        assert!(!s.settle(reply(Uuid::new_v4(), "late", Outcome::Succeeded)));
        assert!(s.loading());
        assert_eq!(s.response(), "");
        assert!(s.settle(reply(id, "on time", Outcome::Succeeded)));
    }

    #[test]
    fn commands_bypass_the_loading_guard() {
        let mut s = typed("one");
        s.submit();
        "/copy".chars().for_each(|c| s.insert_char(c));
        assert_eq!(s.submit(), Submission::Command(Command::Copy));
        assert_eq!(s.input(), "");
        assert!(s.loading());
    }

    #[test]
    fn unknown_slash_words_are_sent_as_prompts() {
        let mut s = typed("/usr/bin contains what?");
        match s.submit() {
            Submission::Prompt { prompt, .. } => assert_eq!(prompt, "/usr/bin contains what?"),
            other => panic!("expected a prompt, got {other:?}"),
        }
        assert!(s.loading());
        assert_eq!(s.input(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn copied_indicator_lasts_two_seconds() {
        let mut s = typed("q");
        let id = prompt_id(s.submit());
        s.settle(reply(id, "copy me", Outcome::Succeeded));

        let mut clip = MemoryClipboard::new();
        assert!(s.copy_response(&mut clip, Duration::from_millis(2000)));
        assert_eq!(clip.contents().as_deref(), Some("copy me"));
        assert!(s.is_copied());

        tokio::time::advance(Duration::from_millis(1999)).await;
        assert!(s.is_copied());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!s.is_copied());
    }

    #[tokio::test(start_paused = true)]
    async fn copy_without_response_or_with_broken_clipboard() {
        let mut s = ChatState::new();
        let mut clip = MemoryClipboard::new();
        assert!(!s.copy_response(&mut clip, Duration::from_secs(2)));
        assert_eq!(clip.contents(), None);
        assert!(!s.is_copied());

        let mut s = typed("q");
        let id = prompt_id(s.submit());
        s.settle(reply(id, "text", Outcome::Succeeded));
        let mut broken = MemoryClipboard::failing();
        assert!(!s.copy_response(&mut broken, Duration::from_secs(2)));
        assert!(!s.is_copied());
        assert_eq!(s.notice().map(|n| n.kind), Some(NoticeKind::Error));
    }

    #[test]
    fn clear_empties_the_panel_only() {
        let mut s = typed("q");
        let id = prompt_id(s.submit());
        s.settle(reply(id, "text", Outcome::Succeeded));
        s.clear_response();
        assert_eq!(s.response(), "");
        assert!(s.document().is_empty());
        assert_eq!(s.last_prompt(), None);
    }

    #[test]
    fn scroll_is_bounded() {
        let mut s = ChatState::new();
        s.scroll_down(10, 4);
        assert_eq!(s.scroll(), 4);
        s.scroll_up(3);
        assert_eq!(s.scroll(), 1);
        s.scroll_up(3);
        assert_eq!(s.scroll(), 0);
        s.scroll_down(3, 10);
        s.clamp_scroll(2);
        assert_eq!(s.scroll(), 2);
    }

    #[test]
    fn editing_respects_char_boundaries() {
        let mut s = typed("héllo");
        s.cursor_home();
        s.cursor_right();
        s.cursor_right();
        s.backspace();
        assert_eq!(s.input(), "hllo");
        s.delete();
        assert_eq!(s.input(), "hlo");
        s.cursor_end();
        s.insert_char('!');
        assert_eq!(s.input(), "hlo!");
        s.cursor_left();
        assert_eq!(s.cursor(), 3);
    }
}
