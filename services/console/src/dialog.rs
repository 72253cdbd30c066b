//! Confirmation dialog
//!
//! `Closed -> AwaitingUser -> Closed`. Opening the dialog hands back a
//! [`PendingChoice`] the caller awaits; whoever talks to the operator
//! answers through [`ConfirmDialog::confirm`] or [`ConfirmDialog::cancel`].
//! A dismissed prompt (closed without an answer, or replaced by a new
//! one) resolves to `false`.

use tokio::sync::oneshot;
use tracing::debug;

/// Dialog state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    AwaitingUser { message: String },
}

/// The operator's eventual answer to one prompt
#[derive(Debug)]
pub struct PendingChoice {
    receiver: oneshot::Receiver<bool>,
}

impl PendingChoice {
    /// Wait for the answer; a dismissed prompt counts as "no"
    pub async fn wait(self) -> bool {
        self.receiver.await.unwrap_or(false)
    }
}

/// Single confirmation prompt
#[derive(Debug, Default)]
pub struct ConfirmDialog {
    state: DialogState,
    responder: Option<oneshot::Sender<bool>>,
}

impl ConfirmDialog {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::AwaitingUser { .. })
    }

    /// Ask the operator a question
    pub fn open(&mut self, message: impl Into<String>) -> PendingChoice {
        if self.is_open() {
            debug!("Replacing an unanswered confirmation prompt");
            self.dismiss();
        }

        let (sender, receiver) = oneshot::channel();
        self.responder = Some(sender);
        self.state = DialogState::AwaitingUser {
            message: message.into(),
        };
        PendingChoice { receiver }
    }

    /// Answer yes; returns false when no prompt was open
    pub fn confirm(&mut self) -> bool {
        self.answer(true)
    }

    /// Answer no; returns false when no prompt was open
    pub fn cancel(&mut self) -> bool {
        self.answer(false)
    }

    /// Close without an answer
    pub fn dismiss(&mut self) {
        self.responder = None;
        self.state = DialogState::Closed;
    }

    fn answer(&mut self, choice: bool) -> bool {
        self.state = DialogState::Closed;
        match self.responder.take() {
            // The waiting side may have given up; that is not an error
            Some(sender) => {
                let _ = sender.send(choice);
                true
            }
            None => false,
        }
    }
}
