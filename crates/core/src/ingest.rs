use std::{path::Path, time::Duration};

use tokio::{fs, process::Command};

use crate::{
    error::{Result, SpendreelError},
    render::run_tool,
};

/// Plain text of a bank statement. PDFs go through `pdftotext`, anything else is read as text.
pub async fn extract_statement_text(path: &Path, timeout: Duration) -> Result<String> {
    let extraction_failed = |reason: String| SpendreelError::ExtractionFailed {
        path: path.to_path_buf(),
        reason,
    };

    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        let mut command = Command::new("pdftotext");
        command.arg("-layout").arg(path).arg("-");
        let output = run_tool("pdftotext", command, timeout)
            .await
            .map_err(|e| extraction_failed(e.to_string()))?;
        String::from_utf8_lossy(&output.stdout).into_owned()
    } else {
        fs::read_to_string(path)
            .await
            .map_err(|e| extraction_failed(e.to_string()))?
    };

    if text.trim().is_empty() {
        return Err(extraction_failed("no text found in document".to_string()));
    }

    Ok(text)
}
