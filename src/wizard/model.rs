//! Questionnaire answer model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::state::WizardStep;
use crate::error::WizardError;

/// Placeholder rendered for any field the user left empty.
pub const PLACEHOLDER: &str = "N/A";

/// A fixed-choice questionnaire answer.
pub trait Choice: Sized + Copy + 'static {
    /// Every variant, in display order.
    const ALL: &'static [Self];

    /// Human-readable label shown in the form and the prompt.
    fn label(&self) -> &'static str;

    /// Stable snake_case identifier (matches the serde representation).
    fn id(&self) -> &'static str;

    /// Parse from either the label or the id, ignoring case.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(raw) || c.id().eq_ignore_ascii_case(raw))
    }

    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.label()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Saas,
    Fintech,
    Healthtech,
    Martech,
    Other,
}

impl Choice for ProductType {
    const ALL: &'static [Self] = &[
        Self::Saas,
        Self::Fintech,
        Self::Healthtech,
        Self::Martech,
        Self::Other,
    ];

    fn label(&self) -> &'static str {
        match self {
            Self::Saas => "SaaS",
            Self::Fintech => "Fintech",
            Self::Healthtech => "Healthtech",
            Self::Martech => "Martech",
            Self::Other => "Other",
        }
    }

    fn id(&self) -> &'static str {
        match self {
            Self::Saas => "saas",
            Self::Fintech => "fintech",
            Self::Healthtech => "healthtech",
            Self::Martech => "martech",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketMaturity {
    Emerging,
    Growing,
    Mature,
}

impl Choice for MarketMaturity {
    const ALL: &'static [Self] = &[Self::Emerging, Self::Growing, Self::Mature];

    fn label(&self) -> &'static str {
        match self {
            Self::Emerging => "Emerging",
            Self::Growing => "Growing",
            Self::Mature => "Mature",
        }
    }

    fn id(&self) -> &'static str {
        match self {
            Self::Emerging => "emerging",
            Self::Growing => "growing",
            Self::Mature => "mature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Freemium,
    Subscription,
    OneTimePayment,
}

impl Choice for PricingModel {
    const ALL: &'static [Self] = &[Self::Freemium, Self::Subscription, Self::OneTimePayment];

    fn label(&self) -> &'static str {
        match self {
            Self::Freemium => "Freemium",
            Self::Subscription => "Subscription",
            Self::OneTimePayment => "One-time Payment",
        }
    }

    fn id(&self) -> &'static str {
        match self {
            Self::Freemium => "freemium",
            Self::Subscription => "subscription",
            Self::OneTimePayment => "one_time_payment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesCycle {
    Short,
    Medium,
    Long,
}

impl Choice for SalesCycle {
    const ALL: &'static [Self] = &[Self::Short, Self::Medium, Self::Long];

    fn label(&self) -> &'static str {
        match self {
            Self::Short => "Short (2 days - 3 weeks)",
            Self::Medium => "Medium (1-3 months)",
            Self::Long => "Long (3-6 months)",
        }
    }

    fn id(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

/// Suggested target audiences offered by the form. Any text is accepted.
pub const AUDIENCE_SUGGESTIONS: &[&str] = &[
    "Gen Z",
    "Millennials",
    "Gen Alpha",
    "Founders",
    "Sales Leaders",
];

/// How a field is edited in the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Multi-line text.
    LongText,
    /// Single-line text with suggested values.
    Suggest(&'static [&'static str]),
    /// One of a fixed set of labels.
    Choice(Vec<&'static str>),
    /// Calendar date.
    Date,
    /// Checkbox.
    Flag,
}

/// Every questionnaire field, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ProductName,
    ProductType,
    TargetAudience,
    PrimaryValueProp,
    SecondaryBenefits,
    Competitors,
    MarketMaturity,
    PricingModel,
    PricePoint,
    SalesCycle,
    LaunchBudget,
    LaunchDate,
    TechnicalComplexity,
    ExistingCustomerBase,
    GeographicFocus,
    IndustryFocus,
    TeamSize,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::ProductName,
        Field::ProductType,
        Field::TargetAudience,
        Field::PrimaryValueProp,
        Field::SecondaryBenefits,
        Field::Competitors,
        Field::MarketMaturity,
        Field::PricingModel,
        Field::PricePoint,
        Field::SalesCycle,
        Field::LaunchBudget,
        Field::LaunchDate,
        Field::TechnicalComplexity,
        Field::ExistingCustomerBase,
        Field::GeographicFocus,
        Field::IndustryFocus,
        Field::TeamSize,
    ];

    /// Form and JSON key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ProductName => "product_name",
            Self::ProductType => "product_type",
            Self::TargetAudience => "target_audience",
            Self::PrimaryValueProp => "primary_value_prop",
            Self::SecondaryBenefits => "secondary_benefits",
            Self::Competitors => "competitors",
            Self::MarketMaturity => "market_maturity",
            Self::PricingModel => "pricing_model",
            Self::PricePoint => "price_point",
            Self::SalesCycle => "sales_cycle",
            Self::LaunchBudget => "launch_budget",
            Self::LaunchDate => "launch_date",
            Self::TechnicalComplexity => "technical_complexity",
            Self::ExistingCustomerBase => "existing_customer_base",
            Self::GeographicFocus => "geographic_focus",
            Self::IndustryFocus => "industry_focus",
            Self::TeamSize => "team_size",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductName => "Product Name",
            Self::ProductType => "Product Type",
            Self::TargetAudience => "Target Audience",
            Self::PrimaryValueProp => "Primary Value Proposition",
            Self::SecondaryBenefits => "Secondary Benefits",
            Self::Competitors => "Competitors",
            Self::MarketMaturity => "Market Maturity",
            Self::PricingModel => "Pricing Model",
            Self::PricePoint => "Price Point",
            Self::SalesCycle => "Sales Cycle",
            Self::LaunchBudget => "Launch Budget",
            Self::LaunchDate => "Target Launch Date",
            Self::TechnicalComplexity => "Technical Complexity",
            Self::ExistingCustomerBase => "Existing Customer Base",
            Self::GeographicFocus => "Geographic Focus",
            Self::IndustryFocus => "Industry Focus",
            Self::TeamSize => "Team Size",
        }
    }

    /// The wizard screen that edits this field.
    pub fn step(&self) -> WizardStep {
        match self {
            Self::ProductName
            | Self::ProductType
            | Self::TargetAudience
            | Self::PrimaryValueProp
            | Self::SecondaryBenefits => WizardStep::ProductMarketFit,
            Self::Competitors | Self::MarketMaturity | Self::PricingModel | Self::PricePoint => {
                WizardStep::CompetitionPricing
            }
            Self::SalesCycle
            | Self::LaunchBudget
            | Self::LaunchDate
            | Self::TechnicalComplexity => WizardStep::SalesBudget,
            Self::ExistingCustomerBase
            | Self::GeographicFocus
            | Self::IndustryFocus
            | Self::TeamSize => WizardStep::ExpansionExecution,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::ProductType => FieldKind::Choice(ProductType::labels()),
            Self::MarketMaturity => FieldKind::Choice(MarketMaturity::labels()),
            Self::PricingModel => FieldKind::Choice(PricingModel::labels()),
            Self::SalesCycle => FieldKind::Choice(SalesCycle::labels()),
            Self::TargetAudience => FieldKind::Suggest(AUDIENCE_SUGGESTIONS),
            Self::PrimaryValueProp
            | Self::SecondaryBenefits
            | Self::Competitors
            | Self::TechnicalComplexity => FieldKind::LongText,
            Self::LaunchDate => FieldKind::Date,
            Self::ExistingCustomerBase => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }

    /// Fields edited on one screen, in form order.
    pub fn for_step(step: WizardStep) -> impl Iterator<Item = Field> {
        Self::ALL.into_iter().filter(move |f| f.step() == step)
    }
}

/// Answers collected over one wizard session.
///
/// Every field starts empty; empty fields are rendered as [`PLACEHOLDER`]
/// when the prompt is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerRecord {
    pub product_name: Option<String>,
    pub product_type: Option<ProductType>,
    pub target_audience: Option<String>,
    pub primary_value_prop: Option<String>,
    pub secondary_benefits: Option<String>,
    pub competitors: Option<String>,
    pub market_maturity: Option<MarketMaturity>,
    pub pricing_model: Option<PricingModel>,
    pub price_point: Option<String>,
    pub sales_cycle: Option<SalesCycle>,
    pub launch_budget: Option<String>,
    pub launch_date: Option<NaiveDate>,
    pub technical_complexity: Option<String>,
    pub existing_customer_base: bool,
    pub geographic_focus: Option<String>,
    pub industry_focus: Option<String>,
    pub team_size: Option<String>,
}

/// A partial update to an [`AnswerRecord`], as posted by a form or the JSON API.
///
/// `None` leaves a field untouched; an empty string clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldUpdates {
    pub product_name: Option<String>,
    pub product_type: Option<String>,
    pub target_audience: Option<String>,
    pub primary_value_prop: Option<String>,
    pub secondary_benefits: Option<String>,
    pub competitors: Option<String>,
    pub market_maturity: Option<String>,
    pub pricing_model: Option<String>,
    pub price_point: Option<String>,
    pub sales_cycle: Option<String>,
    pub launch_budget: Option<String>,
    pub launch_date: Option<String>,
    pub technical_complexity: Option<String>,
    pub existing_customer_base: Option<bool>,
    pub geographic_focus: Option<String>,
    pub industry_focus: Option<String>,
    pub team_size: Option<String>,
}

impl FieldUpdates {
    /// Set one field from raw form text. For the flag, `on`, `true`, `yes`
    /// and `1` mean checked and anything else unchecked.
    pub fn set(&mut self, field: Field, raw: impl Into<String>) {
        let raw = raw.into();
        let slot = match field {
            Field::ExistingCustomerBase => {
                let checked = matches!(
                    raw.trim().to_ascii_lowercase().as_str(),
                    "on" | "true" | "yes" | "1"
                );
                self.existing_customer_base = Some(checked);
                return;
            }
            Field::ProductName => &mut self.product_name,
            Field::ProductType => &mut self.product_type,
            Field::TargetAudience => &mut self.target_audience,
            Field::PrimaryValueProp => &mut self.primary_value_prop,
            Field::SecondaryBenefits => &mut self.secondary_benefits,
            Field::Competitors => &mut self.competitors,
            Field::MarketMaturity => &mut self.market_maturity,
            Field::PricingModel => &mut self.pricing_model,
            Field::PricePoint => &mut self.price_point,
            Field::SalesCycle => &mut self.sales_cycle,
            Field::LaunchBudget => &mut self.launch_budget,
            Field::LaunchDate => &mut self.launch_date,
            Field::TechnicalComplexity => &mut self.technical_complexity,
            Field::GeographicFocus => &mut self.geographic_focus,
            Field::IndustryFocus => &mut self.industry_focus,
            Field::TeamSize => &mut self.team_size,
        };
        *slot = Some(raw);
    }
}

impl AnswerRecord {
    /// Build a record from a set of updates applied to an empty record.
    pub fn from_updates(updates: &FieldUpdates) -> Result<Self, WizardError> {
        let mut record = Self::default();
        record.apply(updates)?;
        Ok(record)
    }

    /// Apply an update. Either every field in the update is stored or, on the
    /// first invalid value, none is.
    pub fn apply(&mut self, updates: &FieldUpdates) -> Result<(), WizardError> {
        let mut next = self.clone();

        set_text(&mut next.product_name, &updates.product_name);
        set_choice(&mut next.product_type, &updates.product_type, Field::ProductType)?;
        set_text(&mut next.target_audience, &updates.target_audience);
        set_text(&mut next.primary_value_prop, &updates.primary_value_prop);
        set_text(&mut next.secondary_benefits, &updates.secondary_benefits);
        set_text(&mut next.competitors, &updates.competitors);
        set_choice(&mut next.market_maturity, &updates.market_maturity, Field::MarketMaturity)?;
        set_choice(&mut next.pricing_model, &updates.pricing_model, Field::PricingModel)?;
        set_text(&mut next.price_point, &updates.price_point);
        set_choice(&mut next.sales_cycle, &updates.sales_cycle, Field::SalesCycle)?;
        set_text(&mut next.launch_budget, &updates.launch_budget);
        if let Some(raw) = &updates.launch_date {
            next.launch_date = parse_date(raw)?;
        }
        set_text(&mut next.technical_complexity, &updates.technical_complexity);
        if let Some(flag) = updates.existing_customer_base {
            next.existing_customer_base = flag;
        }
        set_text(&mut next.geographic_focus, &updates.geographic_focus);
        set_text(&mut next.industry_focus, &updates.industry_focus);
        set_text(&mut next.team_size, &updates.team_size);

        *self = next;
        Ok(())
    }

    /// Current value of a field as display text, or `None` when empty.
    ///
    /// The flag is never empty: it reads `Yes` or `No`.
    pub fn value(&self, field: Field) -> Option<String> {
        let text = |v: &Option<String>| v.clone();
        let choice = |label: Option<&'static str>| label.map(str::to_string);
        match field {
            Field::ProductName => text(&self.product_name),
            Field::ProductType => choice(self.product_type.map(|c| c.label())),
            Field::TargetAudience => text(&self.target_audience),
            Field::PrimaryValueProp => text(&self.primary_value_prop),
            Field::SecondaryBenefits => text(&self.secondary_benefits),
            Field::Competitors => text(&self.competitors),
            Field::MarketMaturity => choice(self.market_maturity.map(|c| c.label())),
            Field::PricingModel => choice(self.pricing_model.map(|c| c.label())),
            Field::PricePoint => text(&self.price_point),
            Field::SalesCycle => choice(self.sales_cycle.map(|c| c.label())),
            Field::LaunchBudget => text(&self.launch_budget),
            Field::LaunchDate => self.launch_date.map(|d| d.format("%Y-%m-%d").to_string()),
            Field::TechnicalComplexity => text(&self.technical_complexity),
            Field::ExistingCustomerBase => Some(
                if self.existing_customer_base { "Yes" } else { "No" }.to_string(),
            ),
            Field::GeographicFocus => text(&self.geographic_focus),
            Field::IndustryFocus => text(&self.industry_focus),
            Field::TeamSize => text(&self.team_size),
        }
    }

    /// Field value or [`PLACEHOLDER`].
    pub fn value_or_placeholder(&self, field: Field) -> String {
        self.value(field).unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

fn set_text(slot: &mut Option<String>, update: &Option<String>) {
    if let Some(raw) = update {
        let trimmed = raw.trim();
        *slot = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

fn set_choice<C: Choice>(
    slot: &mut Option<C>,
    update: &Option<String>,
    field: Field,
) -> Result<(), WizardError> {
    let Some(raw) = update else {
        return Ok(());
    };
    if raw.trim().is_empty() {
        *slot = None;
        return Ok(());
    }
    match C::parse(raw) {
        Some(choice) => {
            *slot = Some(choice);
            Ok(())
        }
        None => Err(WizardError::InvalidField {
            field: field.key(),
            value: raw.clone(),
            reason: format!("expected one of: {}", C::labels().join(", ")),
        }),
    }
}

fn parse_date(raw: &str) -> Result<Option<NaiveDate>, WizardError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| WizardError::InvalidField {
            field: Field::LaunchDate.key(),
            value: raw.to_string(),
            reason: format!("expected YYYY-MM-DD ({e})"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_empty() {
        let record = AnswerRecord::default();
        for field in Field::ALL {
            if field == Field::ExistingCustomerBase {
                assert_eq!(record.value(field).as_deref(), Some("No"));
            } else {
                assert!(record.value(field).is_none(), "{field:?} should start empty");
            }
        }
    }

    #[test]
    fn choices_parse_from_label_or_id() {
        assert_eq!(ProductType::parse("SaaS"), Some(ProductType::Saas));
        assert_eq!(ProductType::parse("saas"), Some(ProductType::Saas));
        assert_eq!(PricingModel::parse("One-time Payment"), Some(PricingModel::OneTimePayment));
        assert_eq!(PricingModel::parse("one_time_payment"), Some(PricingModel::OneTimePayment));
        assert_eq!(SalesCycle::parse("Medium (1-3 months)"), Some(SalesCycle::Medium));
        assert_eq!(MarketMaturity::parse("  growing "), Some(MarketMaturity::Growing));
        assert_eq!(MarketMaturity::parse("ancient"), None);
    }

    #[test]
    fn choice_ids_match_serde() {
        for c in ProductType::ALL {
            assert_eq!(serde_json::to_string(c).unwrap(), format!("\"{}\"", c.id()));
        }
        for c in PricingModel::ALL {
            assert_eq!(serde_json::to_string(c).unwrap(), format!("\"{}\"", c.id()));
        }
        for c in SalesCycle::ALL {
            assert_eq!(serde_json::to_string(c).unwrap(), format!("\"{}\"", c.id()));
        }
    }

    #[test]
    fn apply_sets_and_clears_fields() {
        let mut record = AnswerRecord::default();
        record
            .apply(&FieldUpdates {
                product_name: Some("  Acme ".to_string()),
                product_type: Some("Fintech".to_string()),
                launch_date: Some("2026-03-01".to_string()),
                existing_customer_base: Some(true),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(record.product_name.as_deref(), Some("Acme"));
        assert_eq!(record.product_type, Some(ProductType::Fintech));
        assert_eq!(record.value(Field::LaunchDate).as_deref(), Some("2026-03-01"));
        assert!(record.existing_customer_base);

        record
            .apply(&FieldUpdates {
                product_name: Some("   ".to_string()),
                product_type: Some(String::new()),
                ..Default::default()
            })
            .unwrap();
        assert!(record.product_name.is_none());
        assert!(record.product_type.is_none());
        // Untouched fields keep their values
        assert!(record.launch_date.is_some());
    }

    #[test]
    fn invalid_update_applies_nothing() {
        let mut record = AnswerRecord {
            product_name: Some("Before".to_string()),
            ..Default::default()
        };
        let err = record
            .apply(&FieldUpdates {
                product_name: Some("After".to_string()),
                pricing_model: Some("Barter".to_string()),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, WizardError::InvalidField { field: "pricing_model", .. }));
        assert_eq!(record.product_name.as_deref(), Some("Before"));
    }

    #[test]
    fn updates_set_by_field() {
        let mut updates = FieldUpdates::default();
        updates.set(Field::Competitors, "Globex");
        updates.set(Field::SalesCycle, "short");
        updates.set(Field::ExistingCustomerBase, "on");

        let record = AnswerRecord::from_updates(&updates).unwrap();
        assert_eq!(record.competitors.as_deref(), Some("Globex"));
        assert_eq!(record.sales_cycle, Some(SalesCycle::Short));
        assert!(record.existing_customer_base);

        updates.set(Field::ExistingCustomerBase, "off");
        assert_eq!(updates.existing_customer_base, Some(false));
    }

    #[test]
    fn invalid_date_is_rejected() {
        let err = AnswerRecord::from_updates(&FieldUpdates {
            launch_date: Some("next spring".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, WizardError::InvalidField { field: "launch_date", .. }));
    }

    #[test]
    fn every_step_has_fields() {
        for step in WizardStep::ALL {
            assert!(Field::for_step(step).count() >= 4, "{step} has too few fields");
        }
        let total: usize = WizardStep::ALL
            .iter()
            .map(|s| Field::for_step(*s).count())
            .sum();
        assert_eq!(total, Field::ALL.len());
    }

    #[test]
    fn record_serde_roundtrip_uses_ids() {
        let record = AnswerRecord {
            product_name: Some("Acme".to_string()),
            pricing_model: Some(PricingModel::OneTimePayment),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["pricing_model"], "one_time_payment");

        let parsed: AnswerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
