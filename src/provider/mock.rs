//! Illustrative mock results
//!
//! Fixed-probability draws, no adaptive logic: a "good" subject lifts open
//! and click rates, five stock personas each roll one reaction, and three
//! canned insights are attached. Events are serialised to NDJSON and pushed
//! through the same decoder the backend stream uses.

use super::ResultProvider;
use crate::client::ClientError;
use crate::decoder::{NdjsonDecoder, StreamSummary};
use crate::events::{EventHandler, SimulationEvent};
use crate::models::{
    Action, EmailDraft, Insight, InsightKind, Persona, Sentiment, SimulationMetrics,
    SimulationResponse, SimulationResult,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Words that make a subject look like bulk promotion
const SPAM_WORDS: &[&str] = &["free", "бесплатно"];

/// Generates results locally; seeded runs are reproducible
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    seed: Option<u64>,
    step_delay: Duration,
    /// Fixed result timestamp (ms) instead of the wall clock
    timestamp_ms: Option<i64>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pause between progress events so the progress bar is visible
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    #[cfg(test)]
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl ResultProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn run<H: EventHandler + ?Sized>(
        &self,
        draft: &EmailDraft,
        handler: &mut H,
    ) -> Result<StreamSummary, ClientError> {
        let mut rng = self.rng();
        let now = self
            .timestamp_ms
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let result = generate_mock_result(draft, &mut rng, now);
        tracing::info!(seed = ?self.seed, personas = result.responses.len(), "Generating mock simulation");

        let mut decoder = NdjsonDecoder::new();
        for current in 1..=result.responses.len() as u64 {
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
            feed_event(&mut decoder, handler, &SimulationEvent::Progress { current });
        }
        feed_event(
            &mut decoder,
            handler,
            &SimulationEvent::Result { data: result },
        );

        Ok(StreamSummary {
            stats: decoder.stats(),
            dropped_tail: decoder.close(),
        })
    }
}

fn feed_event<H: EventHandler + ?Sized>(
    decoder: &mut NdjsonDecoder,
    handler: &mut H,
    event: &SimulationEvent,
) {
    match serde_json::to_vec(event) {
        Ok(mut line) => {
            line.push(b'\n');
            decoder.feed(&line, handler);
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode mock event"),
    }
}

fn is_good_subject(subject: &str) -> bool {
    let lower = subject.to_lowercase();
    subject.chars().count() > 10 && !SPAM_WORDS.iter().any(|w| lower.contains(w))
}

/// Build one illustrative result for `draft`
///
/// At most `sample_size` of the stock personas respond.
pub fn generate_mock_result<R: Rng>(
    draft: &EmailDraft,
    rng: &mut R,
    timestamp_ms: i64,
) -> SimulationResult {
    let good_subject = is_good_subject(&draft.subject);
    let (base_open, base_click) = if good_subject { (45, 12) } else { (15, 2) };

    let open_rate = (base_open + rng.gen_range(0..10)).min(100);
    let click_rate = (base_click + rng.gen_range(0..5)).min(100);
    let reply_rate = rng.gen_range(0..5);
    let spam_rate = if good_subject {
        rng.gen_range(0..2)
    } else {
        rng.gen_range(10..30)
    };
    let forward_rate = rng.gen_range(0..3);

    let metrics = SimulationMetrics {
        open_rate,
        click_rate,
        reply_rate,
        spam_rate,
        ignore_rate: 100u32.saturating_sub(open_rate + spam_rate),
        forward_rate,
        // 60% of openers read attentively
        read_rate: base_open * 6 / 10,
    };

    let responses = stock_personas()
        .into_iter()
        .take(draft.sample_size as usize)
        .map(|persona| roll_response(persona, rng.gen::<f64>()))
        .collect();

    SimulationResult {
        id: timestamp_ms.to_string(),
        timestamp: timestamp_ms,
        metrics,
        insights: stock_insights(good_subject),
        responses,
    }
}

fn roll_response(persona: Persona, roll: f64) -> SimulationResponse {
    let (action, comment, reasoning) = if roll > 0.8 {
        (
            Action::Replied,
            "Interesting offer, but we already have a contract. Write again in Q3?",
            "The email hit a current need but the timing was off. The personal tone earned a polite reply instead of silence.",
        )
    } else if roll > 0.6 {
        (
            Action::Clicked,
            "Clicked to check pricing. Looks a bit expensive for us right now.",
            "The CTA was clear and promised concrete value. Interest in the details was dampened by the price positioning.",
        )
    } else if roll > 0.3 {
        (
            Action::Opened,
            "Opened because the subject caught my eye, but the text is too long.",
            "The subject line was relevant, but the body was overloaded with text and attention dropped off.",
        )
    } else {
        (
            Action::Ignored,
            "Ignored. Looks like an ordinary marketing blast.",
            "Generic phrasing and no personalisation made the email read as bulk mail.",
        )
    };

    SimulationResponse {
        persona,
        action,
        sentiment: Sentiment::Neutral,
        comment: comment.to_string(),
        detailed_reasoning: reasoning.to_string(),
    }
}

fn persona(
    id: &str,
    name: &str,
    role: &str,
    company: &str,
    avatar: &str,
    psychographics: &str,
    past_behavior: &str,
) -> Persona {
    Persona {
        id: id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        company: company.to_string(),
        avatar: avatar.to_string(),
        psychographics: psychographics.to_string(),
        past_behavior: past_behavior.to_string(),
    }
}

fn stock_personas() -> Vec<Persona> {
    vec![
        persona(
            "1",
            "Alexey Petrov",
            "CTO",
            "TechFlow",
            "👨‍💻",
            "Pragmatic, values brevity and technical specifics. Hates marketing fluff.",
            "Often opens emails with technical subjects, rarely clicks.",
        ),
        persona(
            "2",
            "Maria Ivanova",
            "VP Engineering",
            "CloudScale",
            "👩‍💼",
            "Focused on team growth and process efficiency. Looking for ways to scale.",
            "Replies to personalised emails.",
        ),
        persona(
            "3",
            "Mikhail Sidorov",
            "DevOps Lead",
            "Startup Inc",
            "👷",
            "Skeptic. Looks for the catch. Loves open-source tools.",
            "Often marks cold emails as spam.",
        ),
        persona(
            "4",
            "Elena Smirnova",
            "Product Manager",
            "SaaSify",
            "👩‍🎨",
            "Visual thinker, values clear decks and case studies. Hunts for new product features.",
            "Clicks links to demos.",
        ),
        persona(
            "5",
            "Dmitry Kozlov",
            "Founder",
            "AI Labs",
            "🤵",
            "Visionary but very busy. Reads only the first two lines.",
            "Ignores long emails.",
        ),
    ]
}

fn stock_insights(good_subject: bool) -> Vec<Insight> {
    let subject = if good_subject {
        Insight {
            kind: InsightKind::Positive,
            title: "Strong subject line".to_string(),
            description: "The subject is short, punchy and free of stop words, which drives a high open rate.".to_string(),
        }
    } else {
        Insight {
            kind: InsightKind::Negative,
            title: "Weak subject line".to_string(),
            description: "The subject looks like spam or is too generic. Add specifics or personalisation.".to_string(),
        }
    };

    vec![
        subject,
        Insight {
            kind: InsightKind::Warning,
            title: "Risk of CTOs ignoring it".to_string(),
            description: "Technical leaders tend to skip this email because the first paragraph lacks technical detail.".to_string(),
        },
        Insight {
            kind: InsightKind::Positive,
            title: "Good CTA".to_string(),
            description: "The call to action is clear, which helps click rate among managers.".to_string(),
        },
    ]
}
