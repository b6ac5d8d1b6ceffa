use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::notifications::{EmailMessage, Mailer};

/// Domain events published after a transaction commits. Each one turns
/// into a stakeholder email in the dispatcher task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    BranchCreated {
        branch_id: Uuid,
        city: String,
        agent_email: String,
    },
    CargoBooked {
        cargo_id: Uuid,
        city: String,
        sender_email: String,
        agent_email: String,
    },
    OrderCreated {
        order_id: Uuid,
        tracking_id: Uuid,
        status: String,
        price: Decimal,
        booking_agent_email: String,
        sender_email: String,
        recipient_email: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously. Event loss is tolerated: the
    /// triggering mutation has already committed.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!(error = %e, "event channel closed; notification dropped");
        }
    }
}

/// Render an event into the email it produces.
fn render_event(event: &Event) -> Result<EmailMessage, crate::notifications::MailError> {
    match event {
        Event::BranchCreated {
            city, agent_email, ..
        } => EmailMessage::new(
            "Your new branch is live.",
            format!(
                "Hello. You have been registered as the agent for the CargoTracker \
                 branch in {city}. Bookings made at your branch will be routed to you."
            ),
            "noreply@cargotracker.io",
            vec![agent_email.clone()],
        ),
        Event::CargoBooked {
            city,
            sender_email,
            agent_email,
            ..
        } => EmailMessage::new(
            "Book new order.",
            format!(
                "Hello. A new order was made at the CargoTracker branch in {city}. \
                 As the admin of the branch, please proceed and record the order for \
                 it to be sent to its destination."
            ),
            sender_email.clone(),
            vec![agent_email.clone()],
        ),
        Event::OrderCreated {
            status,
            price,
            booking_agent_email,
            sender_email,
            recipient_email,
            ..
        } => EmailMessage::new(
            "Order Finalized and ready to go.",
            format!(
                "Your cargo has been booked and is ready for delivery. You will be \
                 notified whenever the status changes. It is currently {status}. It \
                 cost a total of ${price:.3}. Your booking agent is {booking_agent_email}"
            ),
            booking_agent_email.clone(),
            vec![sender_email.clone(), recipient_email.clone()],
        ),
    }
}

/// Event dispatcher loop: drains the channel and hands each rendered
/// email to the mailer. Fire-and-forget: failures are logged, never
/// propagated back to the request that produced the event.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>, mailer: Arc<dyn Mailer>) {
    info!("event dispatcher started");
    while let Some(event) = receiver.recv().await {
        match render_event(&event) {
            Ok(message) => {
                if let Err(e) = mailer.deliver(message).await {
                    warn!(error = %e, ?event, "notification delivery failed");
                }
            }
            Err(e) => warn!(error = %e, ?event, "notification could not be rendered"),
        }
    }
    info!("event dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_created_email_reaches_both_parties() {
        let event = Event::OrderCreated {
            order_id: Uuid::new_v4(),
            tracking_id: Uuid::new_v4(),
            status: "Pending".into(),
            price: dec!(59.000),
            booking_agent_email: "agent@cargotracker.io".into(),
            sender_email: "sender@example.com".into(),
            recipient_email: "recipient@example.com".into(),
        };

        let message = render_event(&event).unwrap();
        assert_eq!(message.from, "agent@cargotracker.io");
        assert_eq!(
            message.to,
            vec![
                "sender@example.com".to_string(),
                "recipient@example.com".to_string()
            ]
        );
        assert!(message.body.contains("$59.000"));
        assert!(message.body.contains("Pending"));
    }

    #[test]
    fn cargo_booked_email_goes_to_branch_agent_from_sender() {
        let event = Event::CargoBooked {
            cargo_id: Uuid::new_v4(),
            city: "Nairobi".into(),
            sender_email: "sender@example.com".into(),
            agent_email: "agent@cargotracker.io".into(),
        };

        let message = render_event(&event).unwrap();
        assert_eq!(message.from, "sender@example.com");
        assert_eq!(message.to, vec!["agent@cargotracker.io".to_string()]);
        assert!(message.body.contains("Nairobi"));
    }
}
