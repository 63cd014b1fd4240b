//! The host as seen by the state machine and the particle engine.

use std::time::Duration;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

/// Visible area in logical pixels, origin top-left, y pointing down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Largest top-left offset at which a box of `size` still fits.
    pub fn room_for(&self, size: Vec2) -> Vec2 {
        Vec2::new(
            (self.width - size.x).max(0.0),
            (self.height - size.y).max(0.0),
        )
    }

    /// Screen coordinates to the 2d camera's world space (origin centre, y up).
    pub fn to_world(&self, screen: Vec2) -> Vec2 {
        Vec2::new(screen.x - self.width / 2.0, self.height / 2.0 - screen.y)
    }
}

pub trait Environment {
    fn viewport(&self) -> Viewport;
    /// Monotonic time since startup.
    fn now(&self) -> Duration;
}

/// Snapshot of the primary window and clock for the current frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameEnv {
    pub viewport: Viewport,
    pub now: Duration,
}

impl FrameEnv {
    pub fn capture(windows: &Query<&Window, With<PrimaryWindow>>, time: &Time) -> Option<Self> {
        let win = windows.get_single().ok()?;
        Some(Self {
            viewport: Viewport::new(win.width(), win.height()),
            now: time.elapsed(),
        })
    }
}

impl Environment for FrameEnv {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn now(&self) -> Duration {
        self.now
    }
}

/// Hand-driven environment for tests and headless runs.
#[derive(Clone, Debug)]
pub struct FakeEnvironment {
    pub viewport: Viewport,
    pub now: Duration,
}

impl FakeEnvironment {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            now: Duration::ZERO,
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl Environment for FakeEnvironment {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn now(&self) -> Duration {
        self.now
    }
}
