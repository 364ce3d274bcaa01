//! Message update handlers - thin dispatcher delegating to submodules

mod global;
pub mod track_lifecycle;
mod zone_loader;

use super::{App, Effect, Message};

impl App {
    /// Apply one message and return the follow-up effects
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::Zone(event) => self.handle_zone(event),
            Message::Track(event) => self.handle_track(event),
            Message::Global(event) => self.handle_global(event),
        }
    }
}
