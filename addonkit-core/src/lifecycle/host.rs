//! What the addon manager needs from the embedding application

use async_trait::async_trait;

/// Answer to a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    /// The affirmative action; the only answer treated as consent
    Primary,
    Secondary,
    Cancel,
}

/// A yes/no decision the manager cannot take on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    /// Label of the affirmative action
    pub primary: String,
    /// Label of the dismissive action
    pub cancel: String,
    /// Identifiers the action would affect besides the target
    pub affected: Vec<String>,
}

/// Services the host application provides to the addon manager.
///
/// Only the version and the confirmation primitive are required; the rest
/// default to log lines.
#[async_trait]
pub trait HostServices: Send + Sync {
    /// Version of the running host application
    fn app_version(&self) -> String;

    /// Ask the user to confirm a destructive action
    async fn confirm(&self, prompt: &ConfirmPrompt) -> DialogChoice;

    /// Informational message for the user
    async fn show_message(&self, title: &str, message: &str) {
        tracing::info!(user_facing = true, title = %title, "{}", message);
    }

    /// Called once after startup when some addons carry errors
    async fn report_addon_errors(&self, count: usize) {
        tracing::warn!(user_facing = true, count, "Some addons have errors");
    }

    /// Addon states or capabilities changed; refresh whatever shows them
    async fn reload_ui(&self) {}

    /// An error the user should see
    fn user_error(&self, message: &str) {
        tracing::error!(user_facing = true, "{}", message);
    }
}
