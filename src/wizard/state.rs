//! Wizard state machine: tracks which screen the user is on.

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// The screens of the questionnaire.
///
/// Progresses linearly: ProductMarketFit → CompetitionPricing → SalesBudget →
/// ExpansionExecution. Back moves one screen the other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    ProductMarketFit,
    CompetitionPricing,
    SalesBudget,
    ExpansionExecution,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::ProductMarketFit,
        WizardStep::CompetitionPricing,
        WizardStep::SalesBudget,
        WizardStep::ExpansionExecution,
    ];

    /// Number of screens.
    pub const COUNT: usize = Self::ALL.len();

    /// 1-based position of this screen.
    pub fn number(&self) -> usize {
        match self {
            Self::ProductMarketFit => 1,
            Self::CompetitionPricing => 2,
            Self::SalesBudget => 3,
            Self::ExpansionExecution => 4,
        }
    }

    /// Screen at a 1-based position.
    pub fn from_number(n: usize) -> Option<WizardStep> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(&self) -> Option<WizardStep> {
        Self::from_number(self.number() - 1)
    }

    pub fn is_first(&self) -> bool {
        self.previous().is_none()
    }

    /// Whether this is the screen that offers generation.
    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }

    /// Screen heading.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ProductMarketFit => "Product & Market Fit",
            Self::CompetitionPricing => "Competition & Pricing",
            Self::SalesBudget => "Sales & Budget",
            Self::ExpansionExecution => "Expansion & Execution",
        }
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::ProductMarketFit
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ProductMarketFit => "product_market_fit",
            Self::CompetitionPricing => "competition_pricing",
            Self::SalesBudget => "sales_budget",
            Self::ExpansionExecution => "expansion_execution",
        };
        write!(f, "{s}")
    }
}

/// Step pointer for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub step: WizardStep,
}

impl WizardState {
    /// Move to the next screen. Rejected on the last screen, leaving the
    /// pointer where it is.
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        let next = self.step.next().ok_or(WizardError::AtLastStep)?;
        self.step = next;
        Ok(next)
    }

    /// Move to the previous screen. Rejected on the first screen.
    pub fn retreat(&mut self) -> Result<WizardStep, WizardError> {
        let previous = self.step.previous().ok_or(WizardError::AtFirstStep)?;
        self.step = previous;
        Ok(previous)
    }

    /// Check that generation may start from the current screen. The step
    /// pointer is never moved by a submit.
    pub fn ensure_can_submit(&self) -> Result<(), WizardError> {
        if self.step.is_last() {
            Ok(())
        } else {
            Err(WizardError::NotAtFinalStep {
                step: self.step.number(),
            })
        }
    }

    /// Progress as `(current, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.step.number(), WizardStep::COUNT)
    }
}
