//! Host services for a terminal without dialogs

use addonkit_core::{ConfirmPrompt, DialogChoice, HostServices};
use async_trait::async_trait;

/// Answers every confirmation up front: `--yes` consents, anything else
/// cancels. Messages go to stderr so stdout stays parseable.
pub struct HeadlessHost {
    version: String,
    assume_yes: bool,
}

impl HeadlessHost {
    pub fn new(version: impl Into<String>, assume_yes: bool) -> Self {
        Self {
            version: version.into(),
            assume_yes,
        }
    }
}

#[async_trait]
impl HostServices for HeadlessHost {
    fn app_version(&self) -> String {
        self.version.clone()
    }

    async fn confirm(&self, prompt: &ConfirmPrompt) -> DialogChoice {
        eprintln!("{}", prompt.title);
        eprintln!("{}", prompt.message);
        if self.assume_yes {
            eprintln!("Proceeding: {}", prompt.primary);
            DialogChoice::Primary
        } else {
            eprintln!("Not confirmed (pass --yes to {})", prompt.primary.to_lowercase());
            DialogChoice::Cancel
        }
    }

    async fn show_message(&self, title: &str, message: &str) {
        eprintln!("{}: {}", title, message);
    }

    async fn report_addon_errors(&self, count: usize) {
        let noun = if count == 1 { "addon has" } else { "addons have" };
        eprintln!("{} {} errors. Run 'addonkit addon list' for details.", count, noun);
    }

    fn user_error(&self, message: &str) {
        eprintln!("Error: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> ConfirmPrompt {
        ConfirmPrompt {
            title: "Disable dependent addons?".into(),
            message: "b depends on a".into(),
            primary: "Disable Anyway".into(),
            cancel: "Cancel".into(),
            affected: vec!["b".into()],
        }
    }

    #[tokio::test]
    async fn test_confirm_follows_assume_yes() {
        let yes = HeadlessHost::new("1.0.0", true);
        let no = HeadlessHost::new("1.0.0", false);

        assert_eq!(yes.confirm(&prompt()).await, DialogChoice::Primary);
        assert_eq!(no.confirm(&prompt()).await, DialogChoice::Cancel);
    }

    #[test]
    fn test_app_version() {
        assert_eq!(HeadlessHost::new("2.3.1", false).app_version(), "2.3.1");
    }
}
