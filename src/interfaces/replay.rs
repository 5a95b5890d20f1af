//! JSON-lines event stream for the replay binary.
//!
//! Events reference entities by caller-chosen string labels; the binary
//! resolves labels to the ids the engines mint.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// Registers an account; `referred_by` names an earlier account label.
    Account {
        label: String,
        email: String,
        #[serde(default)]
        referred_by: Option<String>,
    },
    /// Initiates an activation payment and immediately delivers its
    /// callback with the given outcome.
    Activation {
        account: String,
        phone: String,
        #[serde(default = "default_true")]
        success: bool,
    },
    PostJob {
        label: String,
        client: String,
        budget: Decimal,
    },
    Apply {
        label: String,
        job: String,
        freelancer: String,
    },
    Accept {
        application: String,
        actor: String,
    },
    Milestone {
        label: String,
        job: String,
        actor: String,
        title: String,
        amount: Decimal,
    },
    CompleteMilestone {
        milestone: String,
        actor: String,
    },
    CompleteJob {
        job: String,
        actor: String,
        #[serde(default)]
        final_amount: Option<Decimal>,
    },
    Dispute {
        job: String,
        actor: String,
    },
    /// Requests a withdrawal and, when `decision` is present, finalizes it.
    Withdraw {
        account: String,
        wallet: String,
        amount: Decimal,
        #[serde(default)]
        decision: Option<WithdrawalDecision>,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalDecision {
    Approve,
    Reject,
}

/// Streaming reader over a JSON-lines event log. Blank lines are skipped;
/// malformed lines surface as errors so the binary can report and move on.
pub struct EventReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
        }
    }

    pub fn events(self) -> impl Iterator<Item = serde_json::Result<ReplayEvent>> {
        self.reader
            .lines()
            .filter_map(|line| match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(Ok(line)),
                Err(err) => Some(Err(err)),
            })
            .map(|line| match line {
                Ok(line) => serde_json::from_str(&line),
                Err(err) => Err(serde_json::Error::io(err)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reads_events_and_skips_blank_lines() {
        let input = concat!(
            r#"{"event": "account", "label": "alice", "email": "alice@example.com"}"#,
            "\n\n",
            r#"{"event": "post_job", "label": "job1", "client": "alice", "budget": "1500"}"#,
            "\n",
        );
        let events: Vec<_> = EventReader::new(input.as_bytes())
            .events()
            .collect::<serde_json::Result<_>>()
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            ReplayEvent::Account {
                label: "alice".into(),
                email: "alice@example.com".into(),
                referred_by: None,
            }
        );
        assert_eq!(
            events[1],
            ReplayEvent::PostJob {
                label: "job1".into(),
                client: "alice".into(),
                budget: dec!(1500),
            }
        );
    }

    #[test]
    fn malformed_lines_report_errors() {
        let input = "{\"event\": \"unknown_kind\"}\n";
        let mut events = EventReader::new(input.as_bytes()).events();
        assert!(events.next().unwrap().is_err());
    }
}
