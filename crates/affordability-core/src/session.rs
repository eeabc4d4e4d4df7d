use crate::scenario::{calculate, ApplicationSnapshot, CalculationOutcome, ScenarioKind};
use crate::types::ComputationOutput;

/// One wizard traversal.
///
/// Holds the scenario the user is on and the latest outcome. Changing the
/// loan purpose throws the previous outcome away and starts a new generation.
#[derive(Debug, Default)]
pub struct Session {
    kind: Option<ScenarioKind>,
    generation: u64,
    latest: Option<ComputationOutput<CalculationOutcome>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> Option<ScenarioKind> {
        self.kind
    }

    /// Incremented every time the purpose switches.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn latest(&self) -> Option<&ComputationOutput<CalculationOutcome>> {
        self.latest.as_ref()
    }

    /// Recompute for a new snapshot, restarting first if the purpose changed.
    pub fn recalculate(&mut self, snapshot: &ApplicationSnapshot) -> &ComputationOutput<CalculationOutcome> {
        let kind = snapshot.kind();
        if self.kind.is_some_and(|current| current != kind) {
            tracing::debug!(from = ?self.kind, to = %kind, "loan purpose changed; restarting session");
            self.restart();
        }
        self.kind = Some(kind);
        self.latest.insert(calculate(snapshot))
    }

    pub fn restart(&mut self) {
        self.kind = None;
        self.latest = None;
        self.generation += 1;
    }
}
