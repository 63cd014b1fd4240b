//! The question, the answer, and where the No button ran off to.

use std::time::Duration;

use bevy::prelude::*;
use rand::Rng;

use crate::audio::{Cue, PlayCue};
use crate::config::ProposalConfig;
use crate::env::{Environment, Viewport};
use crate::particles::{BurstSpec, BurstTag};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProposalState {
    #[default]
    Pending,
    Accepted,
}

/// Side effects an operation wants the host to carry out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reaction {
    pub cues: Vec<PlayCue>,
    pub start: Vec<BurstSpec>,
    pub stop: Vec<BurstTag>,
}

impl Reaction {
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty() && self.start.is_empty() && self.stop.is_empty()
    }
}

#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct Proposal {
    state: ProposalState,
    decline_position: Option<Vec2>,
    evasions: u32,
}

impl Proposal {
    pub fn state(&self) -> ProposalState {
        self.state
    }

    /// Top-left of the No button in screen pixels, once it has moved.
    pub fn decline_position(&self) -> Option<Vec2> {
        self.decline_position
    }

    pub fn evasions(&self) -> u32 {
        self.evasions
    }

    pub fn trigger_evade<E, R>(&mut self, env: &E, rng: &mut R, config: &ProposalConfig) -> Reaction
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        if self.state == ProposalState::Accepted {
            return Reaction::default();
        }

        let pos = random_position(env.viewport(), config.control_size, rng);
        self.decline_position = Some(pos);
        self.evasions += 1;
        info!("No button dodged to ({:.0}, {:.0}), attempt {}", pos.x, pos.y, self.evasions);

        Reaction {
            cues: vec![PlayCue::now(Cue::Evade)],
            start: vec![BurstSpec::taunts(config)],
            stop: Vec::new(),
        }
    }

    pub fn accept(&mut self, config: &ProposalConfig) -> Reaction {
        if self.state == ProposalState::Accepted {
            return Reaction::default();
        }

        self.state = ProposalState::Accepted;
        info!("accepted after {} dodges", self.evasions);

        Reaction {
            cues: vec![
                PlayCue::now(Cue::Success),
                PlayCue {
                    cue: Cue::Cheer,
                    delay: Cue::Success.length(),
                },
            ],
            start: vec![BurstSpec::confetti(config)],
            stop: Vec::new(),
        }
    }

    pub fn reset(&mut self) -> Reaction {
        *self = Self::default();
        info!("asking again");

        Reaction {
            stop: vec![BurstTag::Celebration],
            ..default()
        }
    }

    /// A touch counts as a dodge trigger only when it was held long enough.
    pub fn evaluate_touch_gesture(start: Duration, end: Duration, threshold: Duration) -> bool {
        end.saturating_sub(start) >= threshold
    }
}

/// Uniform top-left for a box of `footprint` that keeps it fully on screen.
pub fn random_position<R: Rng + ?Sized>(viewport: Viewport, footprint: Vec2, rng: &mut R) -> Vec2 {
    let room = viewport.room_for(footprint);
    Vec2::new(rng.random::<f32>() * room.x, rng.random::<f32>() * room.y)
}

/// Press-and-hold tracking for the No button on touch screens.
#[derive(Resource, Debug, Default)]
pub struct TouchGesture {
    started_at: Option<Duration>,
}

impl TouchGesture {
    pub fn begin(&mut self, at: Duration) {
        self.started_at = Some(at);
    }

    pub fn is_pending(&self) -> bool {
        self.started_at.is_some()
    }

    /// Closes the gesture. `None` when nothing was pending.
    pub fn finish(&mut self, at: Duration, threshold: Duration) -> Option<bool> {
        let start = self.started_at.take()?;
        Some(Proposal::evaluate_touch_gesture(start, at, threshold))
    }
}
