//! JSON messages published on the events ZeroMQ socket.

use serde::{Deserialize, Serialize};

/// Event pushed to subscribers whenever marketplace state they display changes.
///
/// `notify` lists the user ids that should receive an in-app notification.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DentalEvent {
    /// Homepage offers must be re-fetched (carousel refresh).
    OffersChanged {
        offer_id: i32,
        status: String,
        #[serde(default)]
        notify: Vec<i32>,
    },
    BookingStatusChanged {
        booking_id: i32,
        reference: String,
        status: String,
        #[serde(default)]
        notify: Vec<i32>,
    },
    QuoteUpdated {
        quote_id: i32,
        status: String,
        #[serde(default)]
        notify: Vec<i32>,
    },
    MessagePosted {
        booking_id: i32,
        reference: String,
        #[serde(default)]
        notify: Vec<i32>,
    },
}

impl DentalEvent {
    pub fn recipients(&self) -> &[i32] {
        match self {
            DentalEvent::OffersChanged { notify, .. }
            | DentalEvent::BookingStatusChanged { notify, .. }
            | DentalEvent::QuoteUpdated { notify, .. }
            | DentalEvent::MessagePosted { notify, .. } => notify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = DentalEvent::OffersChanged {
            offer_id: 4,
            status: "approved".into(),
            notify: vec![],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "OffersChanged");
        assert_eq!(json["offer_id"], 4);

        let parsed: DentalEvent =
            serde_json::from_str(r#"{"type":"QuoteUpdated","quote_id":1,"status":"quoted"}"#)
                .unwrap();
        assert!(parsed.recipients().is_empty());
    }
}
