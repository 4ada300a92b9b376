use super::card::Rating;
use crate::config::RatingPolicy;
use crate::types::ResponseEvent;

impl RatingPolicy {
    /// Map a raw response to a review rating.
    ///
    /// Wrong answers and heavily cued answers are lapses. Any lighter cue
    /// caps the rating at hard; unaided answers are graded by latency.
    pub fn rate(&self, correct: bool, assistance_level: u8, latency_ms: i64) -> Rating {
        if !correct || assistance_level >= self.heavy_assistance_level {
            return Rating::Again;
        }
        if assistance_level > 0 {
            return Rating::Hard;
        }
        if latency_ms < self.easy_latency_ms {
            Rating::Easy
        } else if latency_ms < self.hard_latency_ms {
            Rating::Good
        } else {
            Rating::Hard
        }
    }

    pub fn rate_event(&self, event: &ResponseEvent) -> Rating {
        self.rate(event.correct, event.assistance_level, event.latency_ms)
    }
}
