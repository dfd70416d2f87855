//! Playbook request prompt built from the collected answers.

use super::model::{AnswerRecord, Field};

/// Prompt sections, in the order they appear, with the fields each lists.
pub const PROMPT_SECTIONS: &[(&str, &[Field])] = &[
    (
        "Product Overview",
        &[Field::ProductName, Field::ProductType, Field::TargetAudience],
    ),
    (
        "Value Proposition",
        &[Field::PrimaryValueProp, Field::SecondaryBenefits],
    ),
    (
        "Market Landscape",
        &[
            Field::Competitors,
            Field::MarketMaturity,
            Field::PricingModel,
            Field::PricePoint,
        ],
    ),
    (
        "Go-To-Market Strategy",
        &[
            Field::SalesCycle,
            Field::LaunchBudget,
            Field::LaunchDate,
            Field::TechnicalComplexity,
            Field::ExistingCustomerBase,
            Field::GeographicFocus,
            Field::IndustryFocus,
            Field::TeamSize,
        ],
    ),
];

/// Deliverables the playbook must contain, each becoming a `#` section.
pub const DELIVERABLES: &[(&str, &str)] = &[
    (
        "Market Analysis",
        "market size, audience segments and where the product wins against the competitors listed",
    ),
    (
        "Launch Strategy",
        "pre-launch, launch and post-launch phases with concrete actions for each",
    ),
    (
        "Channel Plan",
        "primary and secondary channel recommendations with the reasoning for each",
    ),
    (
        "Pricing & Positioning",
        "how to present the pricing model and price point, plus a one-line positioning statement",
    ),
    (
        "Sales & Marketing Alignment",
        "how sales and marketing share pipeline, messaging and handoffs given the sales cycle and team size",
    ),
    (
        "Budget Allocation",
        "split of the launch budget across channels and phases, tied to the value proposition",
    ),
    (
        "Cold Outreach Message",
        "a short cold email or message aimed at the target audience",
    ),
    (
        "KPIs",
        "success metrics with target values for the first quarter",
    ),
    (
        "Risk Mitigation",
        "the main launch risks and how to mitigate each",
    ),
    (
        "90-Day Roadmap",
        "week-by-week or month-by-month plan for the first 90 days",
    ),
];

/// Render the answers into the instruction sent as the user message.
///
/// Every section and every field is always present; empty fields read
/// `N/A`. Pure: no I/O.
pub fn format_prompt(answers: &AnswerRecord) -> String {
    let mut parts = vec![
        "Generate a go-to-market launch playbook based on these inputs:".to_string(),
    ];

    for (heading, fields) in PROMPT_SECTIONS {
        let lines: Vec<String> = fields
            .iter()
            .map(|field| format!("- {}: {}", field.label(), answers.value_or_placeholder(*field)))
            .collect();
        parts.push(format!("## {heading}\n{}", lines.join("\n")));
    }

    let deliverables: Vec<String> = DELIVERABLES
        .iter()
        .enumerate()
        .map(|(i, (title, detail))| format!("{}. {title}: {detail}", i + 1))
        .collect();
    parts.push(format!(
        "Provide the following sections, in this order:\n{}",
        deliverables.join("\n")
    ));

    parts.push(
        "Formatting rules:\n\
         - Start each of the sections above with a line of the form \"# <Section Title>\".\n\
         - Use \"## <Subheading>\" lines for subsections.\n\
         - Put key takeaways or warnings on their own paragraph starting with \"> \".\n\
         - Separate every heading, paragraph and note with a blank line.\n\
         - Use plain text otherwise: no tables, no code blocks."
            .to_string(),
    );

    parts.join("\n\n")
}
