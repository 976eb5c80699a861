//! Desktop notification dispatch.
//!
//! Best-effort only: a failed notification is logged and never fails the
//! journal entry. Currently macOS via osascript; a no-op elsewhere.

#[cfg(target_os = "macos")]
use tracing::warn;

#[cfg(not(target_os = "macos"))]
use tracing::debug;

/// Send a desktop notification.
#[cfg(target_os = "macos")]
pub async fn send(title: &str, message: &str) {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        message.replace('"', "'"),
        title.replace('"', "'")
    );

    match tokio::process::Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .await
    {
        Ok(output) if output.status.success() => {}
        Ok(output) => warn!(
            "osascript failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => warn!("Failed to run osascript: {}", e),
    }
}

/// Send a desktop notification (no-op on this platform).
#[cfg(not(target_os = "macos"))]
pub async fn send(title: &str, message: &str) {
    debug!("Notification skipped (unsupported platform): {} - {}", title, message);
}
