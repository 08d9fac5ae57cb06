//! Spoken confirmation for destructive actions
//!
//! Shutdown and restart only proceed when the reply to the
//! confirmation prompt contains the word ACTIVATE. Every other
//! outcome cancels, with a distinct spoken message per cause.

use std::time::Duration;

use crate::speech::{Heard, Listen, Speak};

const CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);
const CONFIRM_PHRASE_LIMIT: Duration = Duration::from_secs(5);

/// The only word that confirms a destructive action
const CONFIRMATION_TOKEN: &str = "ACTIVATE";

/// Outcome of a confirmation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The reply contained the confirmation token
    Confirmed,
    /// Anything else: timeout, noise, a refusal, or a listen failure
    Cancelled,
}

/// Run the confirmation dialog for `label` ("Shutdown" or "Restart")
pub async fn confirm_action(
    listener: &dyn Listen,
    voice: &dyn Speak,
    label: &str,
) -> Confirmation {
    voice
        .say(&format!("{label} command received, awaiting confirmation."))
        .await;

    match listener
        .listen_once(CONFIRM_TIMEOUT, CONFIRM_PHRASE_LIMIT)
        .await
    {
        Ok(Heard::Utterance(reply)) if reply.contains(CONFIRMATION_TOKEN) => {
            tracing::warn!(action = label, "destructive action confirmed");
            voice
                .say(&format!("Confirmation received. {label} in 60 seconds"))
                .await;
            Confirmation::Confirmed
        }
        Ok(Heard::Utterance(reply)) => {
            tracing::info!(action = label, reply = %reply, "confirmation reply lacked token");
            voice.say(&format!("{label} cancelled.")).await;
            Confirmation::Cancelled
        }
        Ok(Heard::Silence) => {
            voice
                .say(&format!(
                    "{label} confirmation timed out. {label} cancelled."
                ))
                .await;
            Confirmation::Cancelled
        }
        Ok(Heard::Unintelligible) => {
            voice
                .say(&format!("Did not understand confirmation. {label} cancelled."))
                .await;
            Confirmation::Cancelled
        }
        Err(e) => {
            tracing::error!(action = label, error = %e, "confirmation listen failed");
            voice.say(&format!("{label} cancelled due to error.")).await;
            Confirmation::Cancelled
        }
    }
}
