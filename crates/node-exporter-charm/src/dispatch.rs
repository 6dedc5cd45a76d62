//! Event delivery with deferral.
//!
//! An event the controller cannot act on yet is kept in a backlog that outlives the
//! process (it is part of [`StoredState`]). Deferred events are re-delivered, oldest
//! first, before each newly dispatched event and on an explicit [`Dispatcher::reemit`].

use std::collections::VecDeque;

use node_exporter_ops::{HostOps, ReleaseSource};

use super::*;

/// Delivers lifecycle events to a [`NodeExporterCharm`], keeping deferred ones for later.
pub struct Dispatcher<H, R> {
  /// Receives every delivery
  charm:   NodeExporterCharm<H, R>,
  /// Deferred events, oldest first
  backlog: VecDeque<Event>,
}

impl<H: HostOps, R: ReleaseSource> Dispatcher<H, R> {
  /// Creates a dispatcher resuming with previously deferred events.
  pub fn new(charm: NodeExporterCharm<H, R>, deferred: Vec<Event>) -> Self {
    Self { charm, backlog: deferred.into() }
  }

  /// The controller events are delivered to.
  pub fn charm(&self) -> &NodeExporterCharm<H, R> { &self.charm }

  /// Events currently waiting for re-delivery.
  pub fn deferred(&self) -> impl Iterator<Item = &Event> { self.backlog.iter() }

  /// Delivers `event`, after first re-delivering anything deferred.
  ///
  /// A deferred event identical to `event` is dropped rather than delivered twice, and a
  /// stop discards the whole backlog since nothing queued before it still applies. Only
  /// events that defer are queued; a failed delivery is reported and not retried.
  ///
  /// # Errors
  ///
  /// Returns `CharmErrors` if `event` fails, or otherwise if re-delivering the backlog
  /// failed. `event` is delivered either way.
  pub async fn dispatch(
    &mut self,
    event: Event,
    config: &CharmConfig,
  ) -> Result<Outcome, CharmErrors> {
    if event == Event::Stop {
      if !self.backlog.is_empty() {
        debug!("Dropping {} deferred event(s) ahead of stop", self.backlog.len());
      }
      self.backlog.clear();
    } else {
      self.backlog.retain(|deferred| *deferred != event);
    }
    let replayed = self.reemit(config).await;

    let outcome = self.charm.handle(event, config).await?;
    if outcome == Outcome::Deferred {
      info!("Deferring {event} event");
      self.backlog.push_back(event);
    }
    replayed.map(|()| outcome)
  }

  /// Re-delivers every deferred event once, in the order they were deferred.
  ///
  /// Events that defer again go back on the backlog. Completed and failed ones are
  /// consumed, so a failure is never retried automatically.
  ///
  /// # Errors
  ///
  /// Returns `CharmErrors` from the first re-delivery that fails, after every other
  /// deferred event has been re-delivered.
  pub async fn reemit(&mut self, config: &CharmConfig) -> Result<(), CharmErrors> {
    let pending: Vec<Event> = self.backlog.drain(..).collect();
    let mut first_failure = None;

    for event in pending {
      debug!("Re-emitting deferred {event} event");
      match self.charm.handle(event, config).await {
        Ok(Outcome::Deferred) => self.backlog.push_back(event),
        Ok(Outcome::Completed) => {},
        Err(e) => {
          warn!("Deferred {event} event failed and will not be retried");
          first_failure.get_or_insert(e);
        },
      }
    }
    first_failure.map_or(Ok(()), Err)
  }

  /// Returns the state to persist for the next invocation.
  pub fn into_state(self) -> StoredState {
    StoredState { unit: self.charm.into_unit(), deferred: self.backlog.into() }
  }
}
