//! Typing effect state machine
//!
//! Cycles forever through a word list: type the current word one character
//! per tick, dwell, delete one character per tick, dwell, move to the next
//! word. The machine is pure; the caller owns the timer and waits
//! [`TypingStep::delay`] before the next [`TypingCycle::tick`].

use std::time::Duration;

use crate::config::TypingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingPhase {
    Typing,
    PausingFull,
    Deleting,
    PausingEmpty,
}

/// Tick delays for each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingTimings {
    pub type_delay: Duration,
    pub delete_delay: Duration,
    /// Dwell once the word is fully shown
    pub pause_full: Duration,
    /// Dwell once the text is empty, before the next word
    pub pause_empty: Duration,
}

impl Default for TypingTimings {
    fn default() -> Self {
        Self::from(&TypingConfig::default())
    }
}

impl From<&TypingConfig> for TypingTimings {
    fn from(config: &TypingConfig) -> Self {
        Self {
            type_delay: Duration::from_millis(config.type_ms),
            delete_delay: Duration::from_millis(config.delete_ms),
            pause_full: Duration::from_millis(config.pause_full_ms),
            pause_empty: Duration::from_millis(config.pause_empty_ms),
        }
    }
}

/// Output of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingStep {
    /// Text to display after this tick
    pub text: String,
    /// Wait before the next tick
    pub delay: Duration,
    /// Phase the machine is in after this tick
    pub phase: TypingPhase,
}

#[derive(Debug, Clone)]
pub struct TypingCycle {
    words: Vec<Vec<char>>,
    word_index: usize,
    char_index: usize,
    phase: TypingPhase,
    timings: TypingTimings,
}

impl TypingCycle {
    /// Returns `None` for an empty word list; there is nothing to type
    pub fn new<S: AsRef<str>>(words: &[S], timings: TypingTimings) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        Some(Self {
            words: words.iter().map(|w| w.as_ref().chars().collect()).collect(),
            word_index: 0,
            char_index: 0,
            phase: TypingPhase::Typing,
            timings,
        })
    }

    pub fn from_config(config: &TypingConfig) -> Option<Self> {
        Self::new(&config.words, TypingTimings::from(config))
    }

    #[inline]
    pub fn phase(&self) -> TypingPhase {
        self.phase
    }

    #[inline]
    pub fn word_index(&self) -> usize {
        self.word_index
    }

    /// Currently displayed text
    pub fn text(&self) -> String {
        self.current_word()[..self.char_index].iter().collect()
    }

    fn current_word(&self) -> &[char] {
        &self.words[self.word_index]
    }

    /// Advance one tick
    pub fn tick(&mut self) -> TypingStep {
        let delay = match self.phase {
            TypingPhase::Typing => self.type_step(),
            TypingPhase::PausingFull => {
                self.phase = TypingPhase::Deleting;
                self.delete_step()
            }
            TypingPhase::Deleting => self.delete_step(),
            TypingPhase::PausingEmpty => {
                self.word_index = (self.word_index + 1) % self.words.len();
                self.phase = TypingPhase::Typing;
                self.type_step()
            }
        };

        TypingStep {
            text: self.text(),
            delay,
            phase: self.phase,
        }
    }

    fn type_step(&mut self) -> Duration {
        let len = self.current_word().len();
        self.char_index = (self.char_index + 1).min(len);
        if self.char_index == len {
            self.phase = TypingPhase::PausingFull;
            self.timings.pause_full
        } else {
            self.timings.type_delay
        }
    }

    fn delete_step(&mut self) -> Duration {
        self.char_index = self.char_index.saturating_sub(1);
        if self.char_index == 0 {
            self.phase = TypingPhase::PausingEmpty;
            self.timings.pause_empty
        } else {
            self.timings.delete_delay
        }
    }
}
