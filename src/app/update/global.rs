//! Player-wide flags: activity, live video mode, progress

use tracing::debug;

use crate::app::message::{Effect, GlobalEvent};
use crate::app::state::{ActivityState, App, GlobalState};

impl GlobalState {
    pub fn reduce(&self, event: &GlobalEvent) -> GlobalState {
        let mut next = self.clone();
        match event {
            GlobalEvent::SetActive => next.activity = ActivityState::Active,
            GlobalEvent::SetInactive => next.activity = ActivityState::Inactive,
            GlobalEvent::SetLiveVideoMode(mode) => next.live_video_mode = *mode,
            GlobalEvent::ReportProgress(progress) => next.progress = progress.clone(),
        }
        next
    }
}

impl App {
    pub(super) fn handle_global(&mut self, event: GlobalEvent) -> Vec<Effect> {
        if !matches!(event, GlobalEvent::ReportProgress(_)) {
            debug!("Global event {:?}", event);
        }
        self.global = self.global.reduce(&event);
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::{LiveVideoMode, ProgressInfo};

    #[test]
    fn test_initial_state() {
        let state = GlobalState::default();
        assert_eq!(state.live_video_mode, LiveVideoMode::FullScreenZoomed);
        assert_eq!(state.activity, ActivityState::Active);
        assert!(state.progress.is_none());
    }

    #[test]
    fn test_activity_toggles() {
        let state = GlobalState::default().reduce(&GlobalEvent::SetInactive);
        assert_eq!(state.activity, ActivityState::Inactive);
        let state = state.reduce(&GlobalEvent::SetActive);
        assert_eq!(state.activity, ActivityState::Active);
    }

    #[test]
    fn test_live_video_mode() {
        let state = GlobalState::default().reduce(&GlobalEvent::SetLiveVideoMode(
            LiveVideoMode::FullScreenAspectRatio,
        ));
        assert_eq!(state.live_video_mode, LiveVideoMode::FullScreenAspectRatio);
    }

    #[test]
    fn test_progress_set_and_cleared() {
        let info = ProgressInfo {
            progress: Some(40),
            title: Some("Downloading".into()),
            ..Default::default()
        };
        let state = GlobalState::default().reduce(&GlobalEvent::ReportProgress(Some(info.clone())));
        assert_eq!(state.progress, Some(info));
        let state = state.reduce(&GlobalEvent::ReportProgress(None));
        assert!(state.progress.is_none());
    }
}
