use crate::input::Key;
use crate::time::FramePacer;

/// Frame loop configuration.
///
/// Window size and title are applied when the window is created; changing
/// them afterwards has no effect on a running loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,

    /// Target frames per second. Zero disables pacing.
    pub frame_rate: u32,

    /// Ask the renderer to synchronize with the display refresh.
    pub vsync: bool,

    /// Releasing this key ends the loop after the current frame.
    pub quit_key: Key,

    /// Releasing this key toggles fullscreen.
    pub fullscreen_key: Key,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Effulgent".to_string(),
            width: 800,
            height: 600,
            frame_rate: 90,
            vsync: true,
            quit_key: Key::Q,
            fullscreen_key: Key::F,
        }
    }
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_quit_key(mut self, key: Key) -> Self {
        self.quit_key = key;
        self
    }

    pub fn with_fullscreen_key(mut self, key: Key) -> Self {
        self.fullscreen_key = key;
        self
    }

    pub fn pacer(&self) -> FramePacer {
        FramePacer::new(self.frame_rate)
    }
}
