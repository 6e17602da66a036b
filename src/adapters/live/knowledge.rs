//! Live adapter for the `Knowledge` port over simulated account facts.
//!
//! Answers the handlerless internal tasks of the demo configuration:
//! balance questions, with a projected balance when a transfer amount is
//! already on the table, and daily-limit questions. A real deployment
//! would put a document store behind this port instead.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::ports::knowledge::{AnswerFuture, Knowledge, KnowledgeAnswer, KnowledgeRequest};

/// Serves account questions from configured facts.
pub struct AccountFactsKnowledge {
    balance: f64,
    daily_limit: f64,
    used_today: f64,
}

impl AccountFactsKnowledge {
    /// Creates a source with explicit facts.
    #[must_use]
    pub fn new(balance: f64, daily_limit: f64, used_today: f64) -> Self {
        Self { balance, daily_limit, used_today }
    }

    /// Creates a source from the engine configuration's demo facts.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.account_balance, config.daily_transfer_limit, config.transfers_used_today)
    }

    fn answer_sync(&self, request: &KnowledgeRequest) -> KnowledgeAnswer {
        let query = request.query.to_lowercase();
        let mut facts = BTreeMap::new();

        if query.contains("balance") || query.contains("money") {
            let mut answer = format!("Your current balance is {}.", format_usd(self.balance));
            facts.insert("balance".to_string(), Value::from(self.balance));
            if let Some(amount) = request.context.get("amount").and_then(Value::as_f64) {
                let projected = self.balance - amount;
                answer.push_str(&format!(
                    " After transferring {}, your new balance will be {}.",
                    format_usd(amount),
                    format_usd(projected)
                ));
                facts.insert("projected_balance".to_string(), Value::from(projected));
            }
            return KnowledgeAnswer { answer, sources: vec![], facts };
        }

        if query.contains("limit") {
            let remaining = self.daily_limit - self.used_today;
            facts.insert("remaining_limit".to_string(), Value::from(remaining));
            return KnowledgeAnswer {
                answer: format!(
                    "You have {} of your {} daily transfer limit remaining.",
                    format_usd(remaining),
                    format_usd(self.daily_limit)
                ),
                sources: vec![],
                facts,
            };
        }

        KnowledgeAnswer {
            answer: "I can tell you about your balance or your daily transfer limit.".to_string(),
            sources: vec![],
            facts,
        }
    }
}

impl Knowledge for AccountFactsKnowledge {
    fn answer(&self, request: &KnowledgeRequest) -> AnswerFuture<'_> {
        let answer = self.answer_sync(request);
        Box::pin(async move { Ok(answer) })
    }
}

/// Formats a dollar amount with comma grouping and two decimals.
#[allow(clippy::cast_possible_truncation)]
fn format_usd(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as i64;
    let dollars = cents / 100;
    let rem = cents % 100;

    let digits = dollars.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{rem:02}")
}
