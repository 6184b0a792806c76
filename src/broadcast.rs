//! Selection fan-out from the chart to the structure and legend views.
//!
//! The chart is the only producer. Consumers hold the receiving end of a
//! channel and drain it when asked to redraw; delivery is synchronous and
//! in-process, so a publish is visible to every consumer by the time it
//! returns.

use std::sync::mpsc;

use crate::data::NormalizedMutation;

/// What the chart tells the other views.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    /// The selection was replaced by these rows.
    SitesSelected(Vec<NormalizedMutation>),
    /// The selection is now empty.
    SelectionCleared,
}

impl SelectionEvent {
    /// Event for a (possibly empty) row set.
    #[must_use]
    pub fn from_rows(rows: Vec<NormalizedMutation>) -> Self {
        if rows.is_empty() {
            Self::SelectionCleared
        } else {
            Self::SitesSelected(rows)
        }
    }

    /// Rows carried by the event.
    #[must_use]
    pub fn rows(&self) -> &[NormalizedMutation] {
        match self {
            Self::SitesSelected(rows) => rows,
            Self::SelectionCleared => &[],
        }
    }
}

/// Views that consume selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    /// The structure view.
    Protein,
    /// The legend.
    Legend,
}

/// Publish/subscribe channel with one slot per consumer.
#[derive(Debug, Default)]
pub struct SelectionBroadcaster {
    subscribers: Vec<(Consumer, mpsc::Sender<SelectionEvent>)>,
}

impl SelectionBroadcaster {
    /// Create a broadcaster with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `consumer`, replacing its previous subscription (whose
    /// receiver is disconnected). Subscribers are notified in order of
    /// first registration.
    pub fn subscribe(&mut self, consumer: Consumer) -> mpsc::Receiver<SelectionEvent> {
        let (tx, rx) = mpsc::channel();
        if let Some(slot) = self.subscribers.iter_mut().find(|(c, _)| *c == consumer) {
            slot.1 = tx;
        } else {
            self.subscribers.push((consumer, tx));
        }
        rx
    }

    /// Drop `consumer`'s subscription.
    pub fn unsubscribe(&mut self, consumer: Consumer) {
        self.subscribers.retain(|(c, _)| *c != consumer);
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Subscribed consumers in delivery order.
    pub fn consumers(&self) -> impl Iterator<Item = Consumer> + '_ {
        self.subscribers.iter().map(|(consumer, _)| *consumer)
    }

    /// Deliver `event` to every subscriber and return how many received
    /// it. Subscribers whose receiver is gone are dropped.
    pub fn publish(&mut self, event: &SelectionEvent) -> usize {
        self.subscribers
            .retain(|(consumer, tx)| match tx.send(event.clone()) {
                Ok(()) => true,
                Err(_) => {
                    log::debug!("dropping disconnected {consumer:?} subscriber");
                    false
                }
            });
        self.subscribers.len()
    }
}

/// Drain a receiver, keeping only the most recent event.
pub fn latest(rx: &mpsc::Receiver<SelectionEvent>) -> Option<SelectionEvent> {
    let mut latest = None;
    while let Ok(event) = rx.try_recv() {
        latest = Some(event);
    }
    latest
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::data::ProteinSite;

    fn row(site: i64) -> NormalizedMutation {
        NormalizedMutation {
            site,
            site_reference: site.to_string(),
            site_protein: ProteinSite::Number(site),
            site_chain: "A".to_owned(),
            metric: Some(1.0),
            epitope: "1".to_owned(),
            fields: Map::new(),
        }
    }

    #[test]
    fn resubscribe_replaces_rather_than_stacks() {
        let mut broadcaster = SelectionBroadcaster::new();
        let old = broadcaster.subscribe(Consumer::Protein);
        let new = broadcaster.subscribe(Consumer::Protein);
        assert_eq!(broadcaster.subscriber_count(), 1);

        let delivered = broadcaster.publish(&SelectionEvent::SelectionCleared);
        assert_eq!(delivered, 1);
        assert_eq!(latest(&new), Some(SelectionEvent::SelectionCleared));
        assert_eq!(latest(&old), None);
    }

    #[test]
    fn consumers_see_latest_event() {
        let mut broadcaster = SelectionBroadcaster::new();
        let protein = broadcaster.subscribe(Consumer::Protein);
        let legend = broadcaster.subscribe(Consumer::Legend);

        let _ = broadcaster.publish(&SelectionEvent::from_rows(vec![row(1)]));
        let _ = broadcaster.publish(&SelectionEvent::from_rows(vec![row(2), row(3)]));

        let event = latest(&protein).unwrap();
        assert_eq!(event.rows().len(), 2);
        assert_eq!(latest(&legend), Some(event));
        assert_eq!(latest(&protein), None);
    }

    #[test]
    fn disconnected_subscribers_are_dropped() {
        let mut broadcaster = SelectionBroadcaster::new();
        drop(broadcaster.subscribe(Consumer::Legend));
        let _protein = broadcaster.subscribe(Consumer::Protein);
        assert_eq!(broadcaster.publish(&SelectionEvent::SelectionCleared), 1);
        broadcaster.unsubscribe(Consumer::Protein);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn delivery_follows_first_registration() {
        let mut broadcaster = SelectionBroadcaster::new();
        let _legend = broadcaster.subscribe(Consumer::Legend);
        let _protein = broadcaster.subscribe(Consumer::Protein);
        let _legend = broadcaster.subscribe(Consumer::Legend);
        assert_eq!(
            broadcaster.consumers().collect::<Vec<_>>(),
            [Consumer::Legend, Consumer::Protein]
        );

        broadcaster.unsubscribe(Consumer::Legend);
        let _legend = broadcaster.subscribe(Consumer::Legend);
        assert_eq!(
            broadcaster.consumers().collect::<Vec<_>>(),
            [Consumer::Protein, Consumer::Legend]
        );
    }

    #[test]
    fn empty_rows_mean_cleared() {
        assert_eq!(SelectionEvent::from_rows(Vec::new()), SelectionEvent::SelectionCleared);
        assert!(SelectionEvent::SelectionCleared.rows().is_empty());
    }
}
