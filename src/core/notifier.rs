use crate::core::{Delivery, Mailer, MatchResult, Report};

pub const REPORT_SUBJECT: &str = "Pierogarnia 1588";

/// One `<name>: <state>` line per entry, in report order.
pub fn render_report(report: &Report) -> String {
    let mut msg = String::new();
    for entry in report.entries() {
        msg.push_str(&format!("{}: {}\n", entry.name, entry.availability));
    }
    msg
}

pub struct Notifier<M: Mailer> {
    mailer: M,
    recipient: String,
}

impl<M: Mailer> Notifier<M> {
    pub fn new(mailer: M, recipient: String) -> Self {
        Self { mailer, recipient }
    }

    /// Send the report unless nothing is available and `force` is off.
    /// Transport failures are logged and reported as `Delivery::Failed`.
    pub async fn notify(&self, result: &MatchResult, force: bool) -> Delivery {
        if !result.notify && !force {
            tracing::info!("Nothing available, email not sent");
            return Delivery::Skipped;
        }

        let msg = render_report(&result.report);
        tracing::info!("Sending message:\n{}", msg);

        match self.mailer.send(&self.recipient, REPORT_SUBJECT, &msg).await {
            Ok(message_id) => {
                tracing::info!(
                    "Sent message to '{}'. Message Id: {}",
                    self.recipient,
                    message_id
                );
                Delivery::Sent { message_id }
            }
            Err(e) => {
                tracing::error!("An error occurred: {}", e);
                Delivery::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
