//! Word-by-word subtitle reveal.

use std::time::Duration;

/// Reply text split into words, revealed one word per `interval`.
#[derive(Debug, Clone)]
pub struct Subtitles {
    words: Vec<String>,
    interval: Duration,
}

impl Subtitles {
    pub fn new(text: &str, interval: Duration) -> Self {
        Self {
            words: text.split_whitespace().map(str::to_string).collect(),
            interval,
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Words visible after `elapsed`. The first word shows immediately.
    pub fn visible_words(&self, elapsed: Duration) -> usize {
        if self.words.is_empty() {
            return 0;
        }
        if self.interval.is_zero() {
            return self.words.len();
        }
        let steps = (elapsed.as_millis() / self.interval.as_millis()) as usize;
        (steps + 1).min(self.words.len())
    }

    /// Visible text after `elapsed`.
    pub fn visible_at(&self, elapsed: Duration) -> String {
        self.words[..self.visible_words(elapsed)].join(" ")
    }

    /// Reveal progress in percent.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.words.is_empty() {
            return 100.0;
        }
        self.visible_words(elapsed) as f64 / self.words.len() as f64 * 100.0
    }

    /// Time until the last word is shown.
    pub fn total_duration(&self) -> Duration {
        self.interval * self.words.len().saturating_sub(1) as u32
    }

    /// Reveal words in real time, calling `on_word` with the visible text and progress.
    pub async fn play<F>(&self, mut on_word: F)
    where
        F: FnMut(&str, f64),
    {
        let mut shown = String::new();
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.interval).await;
                shown.push(' ');
            }
            shown.push_str(word);
            let progress = (i + 1) as f64 / self.words.len() as f64 * 100.0;
            on_word(&shown, progress);
        }
    }
}
