//! Headless generation: answers file in, PDF out.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ConfigError, Error};
use crate::session::PlaybookGenerator;
use crate::wizard::{AnswerRecord, FieldUpdates};

/// Read answers from a JSON file. Keys are field keys; choice values may be
/// labels or ids.
pub async fn read_answers(path: &Path) -> Result<AnswerRecord, Error> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(ConfigError::Io)?;
    let updates: FieldUpdates =
        serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
            key: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(AnswerRecord::from_updates(&updates)?)
}

/// Generate a playbook for the answers in `answers_path` and write the PDF.
///
/// Writes to `out` when given, otherwise to the download filename in the
/// current directory. Returns the path written.
pub async fn generate_to_file(
    generator: &PlaybookGenerator,
    answers_path: &Path,
    out: Option<&Path>,
) -> Result<PathBuf, Error> {
    let answers = read_answers(answers_path).await?;
    let document = generator.generate_once(answers).await?;

    let target = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&document.filename));
    tokio::fs::write(&target, &document.pdf)
        .await
        .map_err(ConfigError::Io)?;

    info!(
        path = %target.display(),
        pages = document.page_count,
        degraded = document.degraded,
        "Playbook written"
    );
    Ok(target)
}
