//! Server-rendered wizard screens.
//!
//! Every screen is one HTML form that posts its fields together with the
//! chosen action (`back`, `next`, `generate` or `save`), so values are stored
//! before any navigation happens.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use secrecy::SecretString;
use tracing::debug;
use uuid::Uuid;

use super::AppState;
use super::api::pdf_response;
use super::error::ApiError;
use crate::session::{GenerationStatus, Session, SessionSnapshot};
use crate::wizard::{AnswerRecord, Field, FieldKind, FieldUpdates, WizardStep};

/// Seconds between reloads while a generation is pending.
const REFRESH_SECS: u32 = 3;

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(start))
        .route("/sessions/{id}", get(show).post(submit_form))
        .route("/sessions/{id}/download", get(download))
}

async fn start(State(state): State<AppState>) -> Redirect {
    let session = state.store.create().await;
    Redirect::to(&format!("/sessions/{}", session.id))
}

async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.store.get(id).await {
        Ok(session) => Html(render_session(&state, &session, None).await).into_response(),
        Err(e) => not_found(&e.to_string()),
    }
}

async fn submit_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let session = match state.store.get(id).await {
        Ok(session) => session,
        Err(e) => return not_found(&e.to_string()),
    };

    match apply_form(&state, &session, &form).await {
        Ok(()) => Redirect::to(&format!("/sessions/{id}")).into_response(),
        Err(e) => {
            debug!(session_id = %id, error = %e.0, "Form action rejected");
            let body = render_session(&state, &session, Some(&e.0.to_string())).await;
            (e.status(), Html(body)).into_response()
        }
    }
}

async fn download(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let session = match state.store.get(id).await {
        Ok(session) => session,
        Err(e) => return not_found(&e.to_string()),
    };
    match session.document().await {
        Some(document) => pdf_response(&document),
        None => not_found("No playbook has been generated for this session yet."),
    }
}

/// Store the posted screen, then perform the requested action.
async fn apply_form(
    state: &AppState,
    session: &Arc<Session>,
    form: &HashMap<String, String>,
) -> Result<(), ApiError> {
    if let Some(key) = form.get("api_key").filter(|k| !k.trim().is_empty()) {
        session
            .set_credential(Some(SecretString::from(key.trim().to_string())))
            .await;
    }

    // Fields belong to the screen the form was rendered for
    let current = session.step().await;
    let screen = form
        .get("step")
        .and_then(|raw| raw.parse().ok())
        .and_then(WizardStep::from_number)
        .unwrap_or(current);
    session.update_answers(&form_updates(screen, form)).await?;

    match form.get("action").map(String::as_str) {
        Some("back") => {
            session.retreat().await?;
        }
        Some("next") => {
            session.advance().await?;
        }
        Some("generate") => state.generator.submit(Arc::clone(session)).await?,
        _ => {}
    }
    Ok(())
}

/// Updates for one screen's fields. An absent checkbox means unchecked;
/// other absent fields are left alone.
fn form_updates(step: WizardStep, form: &HashMap<String, String>) -> FieldUpdates {
    let mut updates = FieldUpdates::default();
    for field in Field::for_step(step) {
        match form.get(field.key()) {
            Some(raw) => updates.set(field, raw.as_str()),
            None if field.kind() == FieldKind::Flag => updates.set(field, "off"),
            None => {}
        }
    }
    updates
}

async fn render_session(state: &AppState, session: &Session, flash: Option<&str>) -> String {
    let snapshot = session
        .snapshot(state.generator.has_shared_credential())
        .await;
    let document = session.document().await;
    render_page(&snapshot, document.as_ref().map(|d| d.raw_text.as_str()), flash)
}

fn not_found(message: &str) -> Response {
    let body = layout(
        "Not found",
        "",
        &format!(
            "<h1>Session not found</h1><p>{}</p><p><a href=\"/\">Start a new playbook</a></p>",
            escape(message)
        ),
    );
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

// ── Rendering ───────────────────────────────────────────────────────────

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;background:#f5f7fa;color:#222;margin:0}\
main{max-width:760px;margin:2rem auto;background:#fff;padding:2rem;border-radius:8px;\
box-shadow:0 1px 4px rgba(0,0,0,.08)}\
h1{color:#1a3a73;margin-top:0}label{display:block;font-weight:600;margin:1rem 0 .3rem}\
input[type=text],input[type=date],input[type=password],select,textarea{width:100%;padding:.5rem;\
box-sizing:border-box;border:1px solid #c5cdd8;border-radius:4px;font:inherit}\
.check label{display:inline;font-weight:600}.progress{color:#555}progress{width:100%}\
.buttons{margin-top:1.5rem;display:flex;gap:.5rem}button{padding:.6rem 1.2rem;font:inherit;\
border:0;border-radius:4px;background:#2a66c9;color:#fff;cursor:pointer}\
button.secondary{background:#8a94a3}button:disabled{background:#c5cdd8;cursor:default}\
.error{background:#fdecea;color:#8a1c12;padding:.8rem;border-radius:4px}\
.pending{background:#eef4ff;padding:.8rem;border-radius:4px}\
.ready{background:#edf7ee;padding:.8rem;border-radius:4px}\
pre.playbook{white-space:pre-wrap;background:#fafafa;border:1px solid #e3e6ea;padding:1rem;\
border-radius:4px}";

fn layout(title: &str, head_extra: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title>{head_extra}<style>{STYLE}</style></head>\
         <body><main>{body}</main></body></html>",
        escape(title)
    )
}

/// Render one wizard screen.
pub(crate) fn render_page(
    snapshot: &SessionSnapshot,
    playbook_text: Option<&str>,
    flash: Option<&str>,
) -> String {
    let pending = snapshot.status.is_pending();
    let step = snapshot.step;
    let mut body = String::new();

    let _ = write!(
        body,
        "<h1>GTM Playbook Generator</h1>\
         <p class=\"progress\">Step {} of {} &middot; {}</p>\
         <progress value=\"{}\" max=\"{}\"></progress>",
        snapshot.step_number,
        snapshot.step_count,
        escape(snapshot.step_title),
        snapshot.step_number,
        snapshot.step_count,
    );

    if let Some(message) = flash {
        let _ = write!(body, "<p class=\"error\">{}</p>", escape(message));
    }

    let _ = write!(
        body,
        "<form method=\"post\" action=\"/sessions/{}\">\
         <input type=\"hidden\" name=\"step\" value=\"{}\">",
        snapshot.id, snapshot.step_number
    );
    for field in Field::for_step(step) {
        body.push_str(&render_field(field, &snapshot.answers));
    }

    if !snapshot.has_credential {
        body.push_str(
            "<label for=\"api_key\">OpenAI API Key</label>\
             <input type=\"password\" id=\"api_key\" name=\"api_key\" autocomplete=\"off\" \
             placeholder=\"sk-...\">",
        );
    }

    body.push_str("<div class=\"buttons\">");
    if !step.is_first() {
        body.push_str(
            "<button type=\"submit\" name=\"action\" value=\"back\" class=\"secondary\">Back</button>",
        );
    }
    if step.is_last() {
        let disabled = if pending { " disabled" } else { "" };
        let _ = write!(
            body,
            "<button type=\"submit\" name=\"action\" value=\"generate\"{disabled}>\
             Generate Playbook</button>"
        );
    } else {
        body.push_str("<button type=\"submit\" name=\"action\" value=\"next\">Next</button>");
    }
    body.push_str("</div></form>");

    body.push_str(&render_status(snapshot, playbook_text));

    let refresh = if pending {
        format!("<meta http-equiv=\"refresh\" content=\"{REFRESH_SECS}\">")
    } else {
        String::new()
    };
    layout("GTM Playbook Generator", &refresh, &body)
}

fn render_field(field: Field, answers: &AnswerRecord) -> String {
    let key = field.key();
    let label = escape(field.label());
    let value = escape(&answers.value(field).unwrap_or_default());

    match field.kind() {
        FieldKind::Text => format!(
            "<label for=\"{key}\">{label}</label>\
             <input type=\"text\" id=\"{key}\" name=\"{key}\" value=\"{value}\">"
        ),
        FieldKind::LongText => format!(
            "<label for=\"{key}\">{label}</label>\
             <textarea id=\"{key}\" name=\"{key}\" rows=\"3\">{value}</textarea>"
        ),
        FieldKind::Suggest(options) => {
            let list: String = options
                .iter()
                .map(|o| format!("<option value=\"{}\">", escape(o)))
                .collect();
            format!(
                "<label for=\"{key}\">{label}</label>\
                 <input type=\"text\" id=\"{key}\" name=\"{key}\" value=\"{value}\" \
                 list=\"{key}-options\"><datalist id=\"{key}-options\">{list}</datalist>"
            )
        }
        FieldKind::Choice(options) => {
            let current = answers.value(field);
            let mut select = format!(
                "<label for=\"{key}\">{label}</label><select id=\"{key}\" name=\"{key}\">\
                 <option value=\"\">Select...</option>"
            );
            for option in options {
                let selected = if current.as_deref() == Some(option) {
                    " selected"
                } else {
                    ""
                };
                let option = escape(option);
                let _ = write!(
                    select,
                    "<option value=\"{option}\"{selected}>{option}</option>"
                );
            }
            select.push_str("</select>");
            select
        }
        FieldKind::Date => format!(
            "<label for=\"{key}\">{label}</label>\
             <input type=\"date\" id=\"{key}\" name=\"{key}\" value=\"{value}\">"
        ),
        FieldKind::Flag => {
            let checked = if answers.existing_customer_base {
                " checked"
            } else {
                ""
            };
            format!(
                "<p class=\"check\"><input type=\"checkbox\" id=\"{key}\" name=\"{key}\"{checked}> \
                 <label for=\"{key}\">{label}</label></p>"
            )
        }
    }
}

fn render_status(snapshot: &SessionSnapshot, playbook_text: Option<&str>) -> String {
    match &snapshot.status {
        GenerationStatus::Idle => String::new(),
        GenerationStatus::Pending { .. } => {
            "<p class=\"pending\">Generating your GTM playbook. This page refreshes \
             automatically.</p>"
                .to_string()
        }
        GenerationStatus::Failed { message, .. } => format!(
            "<p class=\"error\">Generation failed: {}</p>",
            escape(message)
        ),
        GenerationStatus::Ready {
            filename, degraded, ..
        } => {
            let mut out = format!(
                "<div class=\"ready\"><p>Your playbook is ready. \
                 <a href=\"/sessions/{}/download\">Download {}</a></p>",
                snapshot.id,
                escape(filename)
            );
            if *degraded {
                out.push_str("<p>The styled layout failed, so the PDF contains plain text.</p>");
            }
            out.push_str("</div>");
            if let Some(text) = playbook_text {
                let _ = write!(
                    out,
                    "<h2>Generated GTM Playbook</h2><pre class=\"playbook\">{}</pre>",
                    escape(text)
                );
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::session::SessionStore;

    async fn snapshot_at(step_moves: usize, answers: FieldUpdates) -> SessionSnapshot {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.create().await;
        session.update_answers(&answers).await.unwrap();
        for _ in 0..step_moves {
            session.advance().await.unwrap();
        }
        session.snapshot(false).await
    }

    #[test]
    fn escape_html() {
        assert_eq!(
            escape("<b>\"Acme\" & 'co'</b>"),
            "&lt;b&gt;&quot;Acme&quot; &amp; &#39;co&#39;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn first_screen_shows_progress_and_values() {
        let snapshot = snapshot_at(
            0,
            FieldUpdates {
                product_name: Some("Acme <Cloud>".to_string()),
                product_type: Some("SaaS".to_string()),
                ..Default::default()
            },
        )
        .await;
        let html = render_page(&snapshot, None, None);

        assert!(html.contains("Step 1 of 4"));
        assert!(html.contains("value=\"Acme &lt;Cloud&gt;\""));
        assert!(html.contains("<option value=\"SaaS\" selected>SaaS</option>"));
        assert!(html.contains("<datalist id=\"target_audience-options\">"));
        assert!(html.contains("value=\"next\""));
        assert!(!html.contains("value=\"back\""));
        assert!(!html.contains("value=\"generate\""));
        // No credential in this snapshot
        assert!(html.contains("name=\"api_key\""));
    }

    #[tokio::test]
    async fn last_screen_offers_generate() {
        let snapshot = snapshot_at(
            3,
            FieldUpdates {
                existing_customer_base: Some(true),
                ..Default::default()
            },
        )
        .await;
        let html = render_page(&snapshot, None, None);

        assert!(html.contains("Step 4 of 4"));
        assert!(html.contains("value=\"generate\""));
        assert!(html.contains("value=\"back\""));
        assert!(html.contains("name=\"existing_customer_base\" checked"));
        assert!(!html.contains("http-equiv=\"refresh\""));
    }

    #[tokio::test]
    async fn status_sections() {
        let mut snapshot = snapshot_at(3, FieldUpdates::default()).await;

        snapshot.status = GenerationStatus::Pending {
            started_at: chrono::Utc::now(),
        };
        let html = render_page(&snapshot, None, None);
        assert!(html.contains("http-equiv=\"refresh\""));
        assert!(html.contains("value=\"generate\" disabled"));

        snapshot.status = GenerationStatus::Failed {
            kind: crate::session::FailureKind::Generation,
            message: "Provider stub request failed".to_string(),
        };
        let html = render_page(&snapshot, None, None);
        assert!(html.contains("Generation failed: Provider stub request failed"));

        snapshot.status = GenerationStatus::Ready {
            filename: "Acme_GTM_Playbook.pdf".to_string(),
            page_count: 3,
            degraded: false,
            generated_at: chrono::Utc::now(),
        };
        let html = render_page(&snapshot, Some("# Market Analysis"), None);
        assert!(html.contains(&format!("/sessions/{}/download", snapshot.id)));
        assert!(html.contains("<pre class=\"playbook\"># Market Analysis</pre>"));
    }

    #[test]
    fn form_updates_only_touch_the_screen() {
        let mut form = HashMap::new();
        form.insert("product_name".to_string(), "Acme".to_string());
        form.insert("competitors".to_string(), "Globex".to_string());

        let updates = form_updates(WizardStep::ProductMarketFit, &form);
        assert_eq!(updates.product_name.as_deref(), Some("Acme"));
        assert_eq!(updates.competitors, None);

        // Unchecked box on the last screen clears the flag
        let updates = form_updates(WizardStep::ExpansionExecution, &form);
        assert_eq!(updates.existing_customer_base, Some(false));
        assert_eq!(updates.product_name, None);
    }
}
