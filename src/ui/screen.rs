use ratatui::Frame;

use crate::{ui::miss_stats::render_miss_stats, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Question/answer screen, rendered by the App widget
pub struct QuizScreen;

impl Screen for QuizScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Shown when the hand table could not be fetched or parsed
pub struct LoadFailedScreen;

impl Screen for LoadFailedScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Most-missed hands table
pub struct StatsScreen;

impl Screen for StatsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_miss_stats(app, f);
    }
}

pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Quiz => Box::new(QuizScreen),
        AppState::Stats => Box::new(StatsScreen),
        AppState::LoadFailed => Box::new(LoadFailedScreen),
    }
}
