//! Loop state machine.
//!
//! ```text
//! AwaitingModel --tool calls--> ExecutingTools --results--> AwaitingModel
//! AwaitingModel --no calls / explicit stop / budget spent--> Finalized
//! ```

use crate::drivers::UsageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingModel,
    ExecutingTools,
    Finalized,
}

/// Mutable state of one loop run. Owned by the loop; handed back to the
/// caller only through the outcome.
#[derive(Debug, Clone)]
pub struct LoopState {
    pub recursions_remaining: u32,
    pub final_text: Option<String>,
    /// Most recent non-empty assistant text, used when the loop ends early.
    pub last_text: Option<String>,
    pub usage_log: Vec<UsageRecord>,
    phase: Phase,
}

impl LoopState {
    pub fn new(max_recursions: u32) -> Self {
        Self {
            recursions_remaining: max_recursions,
            final_text: None,
            last_text: None,
            usage_log: Vec::new(),
            phase: Phase::AwaitingModel,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn budget_exhausted(&self) -> bool {
        self.recursions_remaining == 0
    }

    pub fn record_usage(&mut self, record: UsageRecord) {
        self.usage_log.push(record);
    }

    pub fn note_text(&mut self, text: Option<&str>) {
        if let Some(t) = text.filter(|t| !t.trim().is_empty()) {
            self.last_text = Some(t.to_string());
        }
    }

    /// Enter a tool cycle. A cycle costs one unit however many calls it carries.
    pub fn begin_tools(&mut self) {
        self.recursions_remaining = self.recursions_remaining.saturating_sub(1);
        self.phase = Phase::ExecutingTools;
    }

    pub fn await_model(&mut self) {
        self.phase = Phase::AwaitingModel;
    }

    pub fn finalize(&mut self, text: String) {
        self.final_text = Some(text);
        self.phase = Phase::Finalized;
    }
}
