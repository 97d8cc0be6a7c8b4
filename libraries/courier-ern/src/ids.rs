//! Message and resource identifiers

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// How identifiers are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierMode {
    /// Fresh random numbers for every identifier
    #[default]
    Random,

    /// A random run prefix with a counter
    Sequential,
}

/// Source of `NNNNNN-NNNN` message ids and `A####` resource references
///
/// In `Random` mode each message id is drawn from 900 000 × 9 000 values, so a
/// clash between two messages of a run is unlikely but possible. Resource
/// references only have 9 000 values; a clash within one document is avoided
/// by the builder, clashes across documents are harmless because references
/// are scoped to their message.
///
/// `Sequential` mode draws a random six-digit prefix once and then counts.
/// Message ids and resource references have separate counters, so message
/// ids cannot repeat within a run of up to 9 000 messages.
#[derive(Debug)]
pub struct IdentifierSource {
    mode: IdentifierMode,
    prefix: u32,
    messages: AtomicU32,
    references: AtomicU32,
}

impl Default for IdentifierSource {
    fn default() -> Self {
        Self::new(IdentifierMode::Random)
    }
}

impl IdentifierSource {
    pub fn new(mode: IdentifierMode) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            mode,
            prefix: rng.gen_range(100_000..=999_999),
            messages: AtomicU32::new(0),
            references: AtomicU32::new(0),
        }
    }

    pub fn mode(&self) -> IdentifierMode {
        self.mode
    }

    /// Message or thread id, `NNNNNN-NNNN`
    pub fn message_id(&self) -> String {
        match self.mode {
            IdentifierMode::Random => {
                let mut rng = rand::thread_rng();
                format!(
                    "{}-{}",
                    rng.gen_range(100_000..=999_999),
                    rng.gen_range(1000..=9999)
                )
            }
            IdentifierMode::Sequential => {
                format!("{}-{}", self.prefix, 1000 + next(&self.messages) % 9000)
            }
        }
    }

    /// Resource reference, `A` followed by four digits
    pub fn resource_reference(&self) -> String {
        let number = match self.mode {
            IdentifierMode::Random => rand::thread_rng().gen_range(1000..=9999),
            IdentifierMode::Sequential => 1000 + next(&self.references) % 9000,
        };
        format!("A{number}")
    }
}

fn next(counter: &AtomicU32) -> u32 {
    counter.fetch_add(1, Ordering::Relaxed)
}
