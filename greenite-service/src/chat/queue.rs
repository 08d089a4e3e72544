//! Serial chat message processing.
//!
//! Messages are answered one at a time in arrival order. A drain task is
//! spawned on the Idle to Processing transition and runs until the queue is
//! empty; enqueueing while it runs only appends. The only suspension points are
//! the thinking delay before each answer and the settle delay after it.

use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;
use crate::config::{ChatConfig, RuntimeConfig};

use super::responder::Responder;

/// What the chat view must render, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    UserTurn { text: String },
    AssistantTurn { text: String },
    ThinkingShown,
    ThinkingHidden,
    /// Input and quick-action buttons must be disabled
    InputLocked,
    InputUnlocked,
    /// Quick actions are no longer offered once the conversation has started
    QuickActionsHidden,
}

/// One answered user message
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub user_text: String,
    pub timestamp: i64,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<String>,
    processing: bool,
    thinking_visible: bool,
    quick_actions_hidden: bool,
    history: Vec<ConversationEntry>,
}

pub struct MessageQueue {
    state: Mutex<QueueState>,
    responder: Arc<dyn Responder>,
    clock: Arc<dyn Clock>,
    config: Arc<RuntimeConfig>,
    events: mpsc::UnboundedSender<ChatEvent>,
    cancel: CancellationToken,
}

impl MessageQueue {
    pub fn new(
        responder: Arc<dyn Responder>,
        clock: Arc<dyn Clock>,
        config: Arc<RuntimeConfig>,
        events: mpsc::UnboundedSender<ChatEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState::default()),
            responder,
            clock,
            config,
            events,
            cancel: CancellationToken::new(),
        })
    }

    /// Queue a message for answering.
    ///
    /// Blank messages are dropped and long ones truncated. Returns whether the
    /// message was queued.
    pub fn enqueue(self: &Arc<Self>, message: &str) -> bool {
        let max_len = self.config.dynamic().chat.max_message_len;
        let Some(message) = normalize_message(message, max_len) else {
            return false;
        };

        let start_drain = {
            let mut state = self.state();
            state.pending.push_back(message);
            let start = !std::mem::replace(&mut state.processing, true);
            // Lock state and its event change together, or a finishing drain
            // could report unlocked after this one reported locked
            if start {
                self.emit(ChatEvent::InputLocked);
            }
            start
        };

        if start_drain {
            debug!("Chat queue processing started");
            tokio::spawn(self.clone().drain());
        }

        true
    }

    /// Stop the drain at its next suspension point
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn is_processing(&self) -> bool {
        self.state().processing
    }

    #[allow(dead_code)] // Useful for monitoring/debugging
    pub fn history_len(&self) -> usize {
        self.state().history.len()
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let next = {
                let mut state = self.state();
                match state.pending.pop_front() {
                    Some(message) => {
                        state.thinking_visible = true;
                        Some(message)
                    }
                    None => {
                        state.processing = false;
                        self.emit(ChatEvent::InputUnlocked);
                        None
                    }
                }
            };
            let Some(message) = next else {
                break;
            };

            self.emit(ChatEvent::UserTurn {
                text: message.clone(),
            });
            self.emit(ChatEvent::ThinkingShown);

            let chat = self.config.dynamic().chat.clone();
            if !self.pause(thinking_delay(&chat)).await {
                return;
            }

            let reply = self.record_and_respond(message);
            let (was_thinking, hide_quick_actions) = {
                let mut state = self.state();
                let was_thinking = std::mem::replace(&mut state.thinking_visible, false);
                let hide = state.history.len() > 1 && !state.quick_actions_hidden;
                if hide {
                    state.quick_actions_hidden = true;
                }
                (was_thinking, hide)
            };

            if was_thinking {
                self.emit(ChatEvent::ThinkingHidden);
            }
            self.emit(ChatEvent::AssistantTurn { text: reply });
            if hide_quick_actions {
                self.emit(ChatEvent::QuickActionsHidden);
            }
            metrics::counter!("greenite_chat_messages_total").increment(1);

            if !self.pause(chat.settle_delay()).await {
                return;
            }
        }

        debug!("Chat queue drained");
    }

    fn record_and_respond(&self, message: String) -> String {
        let reply = self.responder.respond(&message);
        self.state().history.push(ConversationEntry {
            user_text: message,
            timestamp: self.clock.now_ms(),
        });
        reply
    }

    /// Sleep unless cancelled first; false means the drain must stop
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Chat queue cancelled");
                false
            }
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Never blocks, so it is safe to call with the state lock held
    fn emit(&self, event: ChatEvent) {
        // Receiver gone means the connection closed; nothing left to render
        let _ = self.events.send(event);
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Trim, drop blanks, and cap at `max_len` characters
fn normalize_message(message: &str, max_len: usize) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_len).collect())
}

/// Uniform random delay within the configured thinking bounds
fn thinking_delay(chat: &ChatConfig) -> Duration {
    let low = chat.thinking_delay_min_ms.min(chat.thinking_delay_max_ms);
    let high = chat.thinking_delay_min_ms.max(chat.thinking_delay_max_ms);
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{DynamicConfig, StaticConfig};
    use tokio::time::{Instant, timeout};

    struct Echo;

    impl Responder for Echo {
        fn respond(&self, message: &str) -> String {
            format!("re: {}", message)
        }
    }

    fn queue() -> (Arc<MessageQueue>, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Arc::new(RuntimeConfig::new(
            StaticConfig::default(),
            DynamicConfig::default(),
        ));
        let queue = MessageQueue::new(
            Arc::new(Echo),
            Arc::new(ManualClock::new(0)),
            config,
            tx,
        );
        (queue, rx)
    }

    async fn collect_until_unlocked(rx: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = event == ChatEvent::InputUnlocked;
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    fn assistant_turns(events: &[ChatEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::AssistantTurn { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_messages_answered_in_order() {
        let (queue, mut rx) = queue();

        assert!(queue.enqueue("a"));
        assert!(queue.enqueue("b"));
        assert!(queue.enqueue("c"));

        let events = collect_until_unlocked(&mut rx).await;
        assert_eq!(assistant_turns(&events), vec!["re: a", "re: b", "re: c"]);
        assert_eq!(events.first(), Some(&ChatEvent::InputLocked));

        let mut visible = 0;
        for event in &events {
            match event {
                ChatEvent::ThinkingShown => {
                    visible += 1;
                    assert_eq!(visible, 1, "two thinking indicators at once");
                }
                ChatEvent::ThinkingHidden => visible -= 1,
                _ => {}
            }
        }
        assert_eq!(visible, 0);
        assert!(!queue.is_processing());
        assert_eq!(queue.history_len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_sent_mid_drain_waits_its_turn() {
        let (queue, mut rx) = queue();

        queue.enqueue("first");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(queue.is_processing());
        queue.enqueue("second");

        let events = collect_until_unlocked(&mut rx).await;
        assert_eq!(assistant_turns(&events), vec!["re: first", "re: second"]);
        let locks = events
            .iter()
            .filter(|e| **e == ChatEvent::InputLocked)
            .count();
        assert_eq!(locks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_arrives_within_thinking_bounds() {
        let (queue, mut rx) = queue();
        let started = Instant::now();

        queue.enqueue("hello");
        loop {
            if let Some(ChatEvent::AssistantTurn { .. }) = rx.recv().await {
                break;
            }
        }

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed <= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_actions_hidden_after_second_turn() {
        let (queue, mut rx) = queue();

        queue.enqueue("one");
        let events = collect_until_unlocked(&mut rx).await;
        assert!(!events.contains(&ChatEvent::QuickActionsHidden));

        queue.enqueue("two");
        queue.enqueue("three");
        let events = collect_until_unlocked(&mut rx).await;
        let hidden = events
            .iter()
            .filter(|e| **e == ChatEvent::QuickActionsHidden)
            .count();
        assert_eq!(hidden, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_messages_ignored() {
        let (queue, mut rx) = queue();

        assert!(!queue.enqueue("   "));
        assert!(!queue.is_processing());
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_drain() {
        let (queue, mut rx) = queue();

        queue.enqueue("a");
        queue.enqueue("b");
        assert_eq!(rx.recv().await, Some(ChatEvent::InputLocked));
        assert_eq!(
            rx.recv().await,
            Some(ChatEvent::UserTurn {
                text: "a".to_string()
            })
        );
        assert_eq!(rx.recv().await, Some(ChatEvent::ThinkingShown));

        queue.cancel();
        assert!(timeout(Duration::from_secs(10), rx.recv()).await.is_err());
    }

    /// Lock and unlock must strictly alternate even when a new message lands
    /// just as the previous drain finishes
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lock_events_alternate_under_contention() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dynamic = DynamicConfig::default();
        dynamic.chat.thinking_delay_min_ms = 0;
        dynamic.chat.thinking_delay_max_ms = 0;
        dynamic.chat.settle_delay_ms = 0;
        let config = Arc::new(RuntimeConfig::new(StaticConfig::default(), dynamic));
        let queue = MessageQueue::new(Arc::new(Echo), Arc::new(ManualClock::new(0)), config, tx);

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..500 {
                    queue.enqueue("ping");
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        timeout(Duration::from_secs(30), async {
            while queue.is_processing() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();

        let mut locked = false;
        let mut answers = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                ChatEvent::InputLocked => {
                    assert!(!locked, "locked twice without an unlock");
                    locked = true;
                }
                ChatEvent::InputUnlocked => {
                    assert!(locked, "unlocked while already unlocked");
                    locked = false;
                }
                ChatEvent::AssistantTurn { .. } => {
                    assert!(locked, "answer rendered with input unlocked");
                    answers += 1;
                }
                _ => {}
            }
        }
        assert!(!locked);
        assert_eq!(answers, 2000);
    }

    #[test]
    fn test_normalize_message() {
        assert_eq!(normalize_message("  hi  ", 10), Some("hi".to_string()));
        assert_eq!(normalize_message("\n\t", 10), None);
        assert_eq!(normalize_message("abcdef", 3), Some("abc".to_string()));
    }
}
