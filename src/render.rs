// Render module - plain terminal output for results, audiences and history
//
// Everything writes to an `impl Write` so the same code serves stdout and
// tests. Colour is a per-call switch; callers decide based on the terminal
// and `NO_COLOR`.

use crate::events::EventHandler;
use crate::models::{
    Audience, HistoryItem, InsightKind, Sentiment, SimulationDetail, SimulationResponse,
    SimulationResult,
};
use crate::run::SimulationRun;
use crate::util::{fit_width, truncate_chars};
use chrono::{DateTime, Local};
use std::io::{self, IsTerminal, Write};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
}

/// Cells in the progress bar
const BAR_WIDTH: usize = 10;

/// Longest persona comment shown in the response table
const MAX_COMMENT_CHARS: usize = 80;

/// Applies ANSI codes when enabled
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Colour when stdout is a terminal and `NO_COLOR` is unset
    pub fn for_stdout() -> Self {
        Self::new(std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none())
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", code, text, colors::RESET)
        } else {
            text.to_string()
        }
    }
}

/// `[#####.....] 5/10`
pub fn progress_bar(current: u64, total: u32) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((current.min(total as u64) as usize) * BAR_WIDTH) / total as usize
    };
    format!(
        "[{}{}] {}/{}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        current,
        total
    )
}

/// Local time for a millisecond epoch timestamp
pub fn format_timestamp(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => "-".to_string(),
    }
}

/// Event handler that redraws a progress bar on each progress event
pub struct ProgressReporter<W: Write> {
    out: W,
    total: u32,
    drawn: bool,
}

impl ProgressReporter<io::Stderr> {
    pub fn stderr(total: u32) -> Self {
        Self::new(io::stderr(), total)
    }
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(out: W, total: u32) -> Self {
        Self {
            out,
            total,
            drawn: false,
        }
    }

    /// End the progress line so following output starts clean
    pub fn finish(mut self) -> W {
        if self.drawn {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
        self.out
    }
}

impl<W: Write> EventHandler for ProgressReporter<W> {
    fn on_progress(&mut self, current: u64) {
        // Progress output is cosmetic; a closed stderr must not end the run
        let _ = write!(self.out, "\r{}", progress_bar(current, self.total));
        let _ = self.out.flush();
        self.drawn = true;
    }
}

/// Metrics, insights and per-persona responses of one run
pub fn render_result(
    out: &mut impl Write,
    result: &SimulationResult,
    painter: Painter,
    details: bool,
) -> io::Result<()> {
    use colors::*;

    let m = &result.metrics;
    writeln!(
        out,
        "{} {}",
        painter.paint(BOLD, "Simulation"),
        painter.paint(DIM, &result.id)
    )?;
    if result.timestamp > 0 {
        writeln!(out, "  {}", painter.paint(DIM, &format_timestamp(result.timestamp)))?;
    }
    writeln!(out)?;

    writeln!(out, "{}", painter.paint(BOLD, "Metrics"))?;
    for (label, value) in [
        ("Open", m.open_rate),
        ("Click", m.click_rate),
        ("Reply", m.reply_rate),
        ("Forward", m.forward_rate),
        ("Read", m.read_rate),
        ("Ignore", m.ignore_rate),
        ("Spam", m.spam_rate),
    ] {
        writeln!(out, "  {} {:>3}%", fit_width(label, 8), value)?;
    }

    if !result.insights.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", painter.paint(BOLD, "Insights"))?;
        for insight in &result.insights {
            let (marker, code) = match insight.kind {
                InsightKind::Positive => ("+", GREEN),
                InsightKind::Negative => ("-", RED),
                InsightKind::Warning => ("!", YELLOW),
            };
            writeln!(
                out,
                "  {} {}",
                painter.paint(code, marker),
                painter.paint(BOLD, &insight.title)
            )?;
            writeln!(out, "    {}", insight.description)?;
        }
    }

    if !result.responses.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", painter.paint(BOLD, "Responses"))?;
        for response in &result.responses {
            render_response(out, response, painter, details)?;
        }
    }

    Ok(())
}

/// One persona's reaction; `details` adds the persona profile and reasoning
fn render_response(
    out: &mut impl Write,
    response: &SimulationResponse,
    painter: Painter,
    details: bool,
) -> io::Result<()> {
    use colors::*;

    let persona = &response.persona;
    let sentiment = match response.sentiment {
        Sentiment::Positive => painter.paint(GREEN, response.sentiment.as_str()),
        Sentiment::Neutral => painter.paint(DIM, response.sentiment.as_str()),
        Sentiment::Negative => painter.paint(RED, response.sentiment.as_str()),
    };
    writeln!(
        out,
        "  {} {} {} {}",
        fit_width(&persona.name, 18),
        fit_width(&persona.role, 22),
        painter.paint(CYAN, &fit_width(response.action.as_str(), 8)),
        sentiment
    )?;

    if !details {
        if !response.comment.is_empty() {
            writeln!(
                out,
                "    {}",
                painter.paint(DIM, truncate_chars(&response.comment, MAX_COMMENT_CHARS))
            )?;
        }
        return Ok(());
    }

    let who = match (persona.avatar.is_empty(), persona.company.is_empty()) {
        (false, false) => format!("{} {}", persona.avatar, persona.company),
        (false, true) => persona.avatar.clone(),
        (true, _) => persona.company.clone(),
    };
    if !who.is_empty() {
        writeln!(out, "    {}", who)?;
    }
    for (label, text) in [
        ("Comment", &response.comment),
        ("Profile", &persona.psychographics),
        ("History", &persona.past_behavior),
        ("Reasoning", &response.detailed_reasoning),
    ] {
        if !text.is_empty() {
            writeln!(out, "    {} {}", painter.paint(DIM, &format!("{}:", label)), text)?;
        }
    }
    writeln!(out)
}

/// A stored run: the draft it was made from, then its result
pub fn render_detail(
    out: &mut impl Write,
    detail: &SimulationDetail,
    painter: Painter,
    details: bool,
) -> io::Result<()> {
    writeln!(out, "{} {}", painter.paint(colors::BOLD, "Subject:"), detail.subject)?;
    if !detail.cta.is_empty() {
        writeln!(out, "{} {}", painter.paint(colors::BOLD, "CTA:"), detail.cta)?;
    }
    if !detail.body.is_empty() {
        writeln!(out)?;
        for line in detail.body.lines() {
            writeln!(out, "  {}", line)?;
        }
    }
    writeln!(out)?;
    render_result(out, &detail.to_result(), painter, details)
}

/// One row per audience, optionally followed by its personas
pub fn render_audiences(
    out: &mut impl Write,
    audiences: &[Audience],
    with_personas: bool,
    painter: Painter,
) -> io::Result<()> {
    if audiences.is_empty() {
        return writeln!(out, "No audiences available");
    }

    writeln!(
        out,
        "{}",
        painter.paint(
            colors::DIM,
            &format!(
                "{} {} {} {:>8}",
                fit_width("ID", 24),
                fit_width("NAME", 28),
                fit_width("TYPE", 10),
                "SIZE"
            )
        )
    )?;
    for audience in audiences {
        writeln!(
            out,
            "{} {} {} {:>8}",
            fit_width(&audience.id, 24),
            fit_width(&audience.name, 28),
            fit_width(&audience.kind, 10),
            audience.size
        )?;
        if with_personas {
            for persona in &audience.personas {
                writeln!(
                    out,
                    "    {} {} {}",
                    fit_width(&persona.name, 18),
                    fit_width(&persona.role, 22),
                    painter.paint(colors::DIM, &persona.company)
                )?;
            }
        }
    }
    Ok(())
}

/// Past runs, newest first as the backend returns them
pub fn render_history(out: &mut impl Write, items: &[HistoryItem], painter: Painter) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "No simulations yet");
    }

    writeln!(
        out,
        "{}",
        painter.paint(
            colors::DIM,
            &format!(
                "{} {} {} {} {:>5} {:>5}",
                fit_width("ID", 14),
                fit_width("WHEN", 16),
                fit_width("SUBJECT", 36),
                fit_width("AUDIENCE", 20),
                "OPEN",
                "CLICK"
            )
        )
    )?;
    for item in items {
        writeln!(
            out,
            "{} {} {} {} {:>4}% {:>4}%",
            fit_width(&item.id, 14),
            fit_width(&format_timestamp(item.timestamp), 16),
            fit_width(&item.subject, 36),
            fit_width(&item.audience, 20),
            item.metrics.open_rate,
            item.metrics.click_rate
        )?;
    }
    Ok(())
}

/// `done 5/5 personas (100%) for marketing-managers in 1.2s`
pub fn run_summary(run: &SimulationRun) -> String {
    let state = if run.is_in_flight() { "running" } else { "done" };
    let elapsed = run
        .elapsed()
        .map(|d| format!(" in {:.1}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_default();
    format!(
        "{} {}/{} personas ({:.0}%) for {}{}",
        state,
        run.progress(),
        run.total(),
        run.percent(),
        run.draft().audience,
        elapsed
    )
}
