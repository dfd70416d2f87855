//! Questionnaire wizard: four linear screens that fill an `AnswerRecord`.
//!
//! The wizard only tracks the step pointer and the answers. Turning answers
//! into a request prompt lives in `prompts`; generation and the resulting
//! document belong to the session layer.

pub mod model;
pub mod prompts;
pub mod state;

pub use model::{
    AnswerRecord, Choice, Field, FieldKind, FieldUpdates, MarketMaturity, PLACEHOLDER,
    PricingModel, ProductType, SalesCycle,
};
pub use prompts::format_prompt;
pub use state::{WizardState, WizardStep};
