//! Keyword-driven replies for the sustainability assistant.

use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::i18n::I18n;

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(hi|hello|hey|good morning|good afternoon|good evening)")
        .expect("greeting pattern is valid")
});

static THANKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"thank|thanks|appreciate").expect("thanks pattern is valid"));

/// Produces the assistant's reply to one user message
pub trait Responder: Send + Sync {
    fn respond(&self, message: &str) -> String;
}

/// A subject the assistant knows canned answers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Topic {
    Energy,
    Waste,
    Transport,
    Water,
    Climate,
}

impl Topic {
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Topic::Energy => &[
                "energy",
                "electricity",
                "solar",
                "wind",
                "renewable",
                "power",
                "battery",
            ],
            Topic::Waste => &[
                "waste", "recycle", "trash", "garbage", "plastic", "reduce", "reuse",
            ],
            Topic::Transport => &[
                "transport",
                "car",
                "bike",
                "bus",
                "mrt",
                "walk",
                "commute",
                "vehicle",
            ],
            Topic::Water => &["water", "conservation", "save", "shower", "tap", "rain"],
            Topic::Climate => &[
                "climate",
                "global warming",
                "carbon",
                "emission",
                "greenhouse",
                "temperature",
            ],
        }
    }

    /// First topic, in declaration order, with a keyword contained in `text`
    pub fn detect(text: &str) -> Option<Topic> {
        use strum::IntoEnumIterator;

        let lower = text.to_lowercase();
        Topic::iter().find(|topic| topic.keywords().iter().any(|kw| lower.contains(kw)))
    }

    fn message_keys(self) -> [String; 3] {
        let name = self.as_ref();
        [1, 2, 3].map(|n| format!("topic-{}-{}", name, n))
    }
}

const GENERAL_KEYWORDS: &[&str] = &["sustainability", "environment", "green", "eco"];

const FOLLOW_UP_KEYS: &[&str] = &["chat-follow-up-1", "chat-follow-up-2", "chat-follow-up-3"];

const MENU_KEYS: &[&str] = &[
    "chat-menu-energy",
    "chat-menu-waste",
    "chat-menu-transport",
    "chat-menu-water",
    "chat-menu-climate",
];

/// Canned responder backed by the Fluent message bundle
pub struct TopicResponder {
    i18n: Arc<I18n>,
    locale: String,
}

impl TopicResponder {
    pub fn new(i18n: Arc<I18n>, locale: impl Into<String>) -> Self {
        Self {
            i18n,
            locale: locale.into(),
        }
    }

    fn text(&self, key: &str) -> String {
        self.i18n.get(&self.locale, key, None)
    }

    fn topic_answer(&self, topic: Topic) -> String {
        let mut rng = rand::thread_rng();
        let keys = topic.message_keys();
        let answer = keys
            .choose(&mut rng)
            .map(|key| self.text(key))
            .unwrap_or_default();
        let follow_up = FOLLOW_UP_KEYS
            .choose(&mut rng)
            .map(|key| self.text(key))
            .unwrap_or_default();

        format!("{}\n\n{}", answer, follow_up)
    }

    fn topic_menu(&self) -> String {
        let items: Vec<String> = MENU_KEYS.iter().map(|key| self.text(key)).collect();
        format!(
            "{}\n\n{}\n\n{}",
            self.text("chat-menu-intro"),
            items.join("\n"),
            self.text("chat-menu-outro")
        )
    }
}

impl Responder for TopicResponder {
    fn respond(&self, message: &str) -> String {
        let lower = message.to_lowercase();

        if GREETING_RE.is_match(&lower) {
            return self.text("chat-greeting");
        }
        if THANKS_RE.is_match(&lower) {
            return self.text("chat-thanks");
        }
        if let Some(topic) = Topic::detect(&lower) {
            return self.topic_answer(topic);
        }
        if GENERAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return self.text("chat-general");
        }

        self.topic_menu()
    }
}
