use shared::{
    domain::{MarqueeState, OverlayState, TransitionState},
    error::ApiError,
    protocol::{OverlayServerEvent, UpdateTransitionRequest},
};
use tokio::sync::broadcast;
use tracing::info;

use crate::store::StateStore;

/// Marquee and transition overlays; every change is pushed to all viewers.
pub struct OverlayController {
    store: StateStore<OverlayState>,
    events: broadcast::Sender<OverlayServerEvent>,
}

impl OverlayController {
    pub fn new(store: StateStore<OverlayState>, events: broadcast::Sender<OverlayServerEvent>) -> Self {
        Self { store, events }
    }

    /// Snapshot and subscription are taken together so no update falls between them.
    pub async fn connect(&self) -> (OverlayState, broadcast::Receiver<OverlayServerEvent>) {
        self.store
            .apply(|state| (state.clone(), self.events.subscribe()))
            .await
    }

    pub async fn state(&self) -> OverlayState {
        self.store.read().await
    }

    pub async fn update_marquee(&self, text: &str) -> Result<MarqueeState, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::validation("Texto no puede estar vacío"));
        }

        let marquee = self
            .store
            .apply(|state| {
                state.marquee.text = text.to_string();
                self.publish(OverlayServerEvent::MarqueeUpdate(state.marquee.clone()));
                state.marquee.clone()
            })
            .await;
        info!(text = %marquee.text, "marquee updated");
        Ok(marquee)
    }

    pub async fn toggle_marquee(&self) -> MarqueeState {
        let marquee = self
            .store
            .apply(|state| {
                state.marquee.visible = !state.marquee.visible;
                self.publish(OverlayServerEvent::MarqueeUpdate(state.marquee.clone()));
                state.marquee.clone()
            })
            .await;
        info!(visible = marquee.visible, "marquee toggled");
        marquee
    }

    pub async fn show_transition(&self) -> TransitionState {
        self.set_transition_visible(true).await
    }

    pub async fn hide_transition(&self) -> TransitionState {
        self.set_transition_visible(false).await
    }

    /// Blank or missing fields keep their current value; the transition is re-broadcast regardless.
    pub async fn update_transition(&self, update: &UpdateTransitionRequest) -> TransitionState {
        let message = non_blank(update.message.as_deref());
        let church_name = non_blank(update.church_name.as_deref());
        let service_info = non_blank(update.service_info.as_deref());

        let transition = self
            .store
            .apply(|state| {
                if let Some(message) = message {
                    state.transition.message = message.to_string();
                }
                if let Some(church_name) = church_name {
                    state.transition.church_name = church_name.to_string();
                }
                if let Some(service_info) = service_info {
                    state.transition.service_info = service_info.to_string();
                }
                self.publish(OverlayServerEvent::TransitionUpdate(state.transition.clone()));
                state.transition.clone()
            })
            .await;
        info!(message = %transition.message, "transition updated");
        transition
    }

    async fn set_transition_visible(&self, visible: bool) -> TransitionState {
        let transition = self
            .store
            .apply(|state| {
                state.transition.visible = visible;
                self.publish(OverlayServerEvent::TransitionUpdate(state.transition.clone()));
                state.transition.clone()
            })
            .await;
        info!(visible, "transition visibility changed");
        transition
    }

    fn publish(&self, event: OverlayServerEvent) {
        // No connected viewers is not an error.
        let _ = self.events.send(event);
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "tests/overlay_tests.rs"]
mod tests;
