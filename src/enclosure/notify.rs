//! Debounced "no internet" notifications

use std::time::{Duration, Instant};

use crate::bus::{Message, events};

/// Spoken when a paired device loses its connection
pub const NOT_CONNECTED_UTTERANCE: &str = "This device is not connected to the Internet. \
     Either plug in a network cable or set up your wifi connection.";

/// What the enclosure should tell the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Speak a warning
    Speak(String),
    /// Start guided Wi-Fi setup
    WifiSetup {
        /// Whether setup may time out on its own
        allow_timeout: Option<bool>,
        /// Language the setup prompts are spoken in
        lang: String,
    },
}

impl Notice {
    /// Bus message carrying this notice
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            Self::Speak(utterance) => Message::speak(&utterance),
            Self::WifiSetup {
                allow_timeout,
                lang,
            } => {
                let data = match allow_timeout {
                    Some(allow) => serde_json::json!({ "allow_timeout": allow, "lang": lang }),
                    None => serde_json::json!({ "lang": lang }),
                };
                Message::new(events::WIFI_SETUP).with_data(data)
            }
        }
    }
}

/// Owned debounce state for "no internet" notices
#[derive(Debug, Clone)]
pub struct NoInternetNotifier {
    window: Duration,
    last_notified: Option<Instant>,
}

impl NoInternetNotifier {
    /// Create a notifier that stays quiet for `window` after each notice
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_notified: None,
        }
    }

    /// When the last notice fired, if ever
    #[must_use]
    pub const fn last_notified(&self) -> Option<Instant> {
        self.last_notified
    }

    /// Decide whether to notify, recording the notice time when one fires
    ///
    /// Nothing fires while `connected`, or within the window of the last
    /// notice. Otherwise a paired device gets a spoken warning and an
    /// unpaired one is sent into Wi-Fi setup.
    pub fn decide(
        &mut self,
        now: Instant,
        connected: bool,
        paired: bool,
        lang: &str,
    ) -> Option<Notice> {
        if connected {
            return None;
        }

        let recently_notified = self
            .last_notified
            .is_some_and(|last| now.saturating_duration_since(last) <= self.window);
        if recently_notified {
            return None;
        }

        self.last_notified = Some(now);

        Some(if paired {
            Notice::Speak(NOT_CONNECTED_UTTERANCE.to_string())
        } else {
            Notice::WifiSetup {
                allow_timeout: None,
                lang: lang.to_string(),
            }
        })
    }
}
