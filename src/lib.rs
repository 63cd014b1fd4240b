//! Will you be my Valentine?
//!
//! A one-screen Bevy toy: the No button runs from the pointer, Yes rains
//! confetti and plays a little chord progression. Sounds are synthesized on
//! the fly and particles are simulated per frame.

pub mod audio;
pub mod config;
pub mod effects;
pub mod env;
pub mod particles;
pub mod proposal;
pub mod ui;

use bevy::audio::AddAudioSource;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::audio::{Chime, PlayCue};
use crate::config::ProposalConfig;
use crate::effects::BurstCommand;
use crate::particles::ParticleEngine;
use crate::proposal::{Proposal, TouchGesture};

/// Every random choice (dodge spots, particle spawns) draws from here.
#[derive(Resource)]
pub struct RandomSource(pub StdRng);

impl RandomSource {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_os_rng()),
        }
    }
}

/// Wires the proposal screen into an app that already has `DefaultPlugins`.
#[derive(Default)]
pub struct ValentinePlugin {
    /// Skips reading the environment when set.
    pub config: Option<ProposalConfig>,
}

impl Plugin for ValentinePlugin {
    fn build(&self, app: &mut App) {
        let config = self.config.clone().unwrap_or_else(|| {
            let (config, rejected) = ProposalConfig::from_env();
            for e in rejected {
                warn!("ignoring {}, keeping the default for it", e);
            }
            config
        });
        if let Some(seed) = config.seed {
            info!("using fixed random seed {}", seed);
        }

        app.insert_resource(ClearColor(ui::BG_COLOR))
            .insert_resource(RandomSource::new(config.seed))
            .insert_resource(config)
            .init_resource::<Proposal>()
            .init_resource::<TouchGesture>()
            .init_resource::<ParticleEngine>()
            .init_resource::<ui::ShownAt>()
            .add_event::<PlayCue>()
            .add_event::<BurstCommand>()
            .add_audio_source::<Chime>()
            .add_systems(Startup, ui::setup)
            .add_systems(
                Update,
                (
                    (
                        ui::press_yes,
                        ui::dodge_on_pointer,
                        ui::dodge_on_touch_hold,
                        ui::press_reset,
                    ),
                    effects::apply_burst_commands,
                    effects::tick_bursts.run_if(effects::bursts_alive),
                    effects::sync_particles.run_if(resource_changed::<ParticleEngine>),
                    (audio::play_cues, audio::expire_cues),
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    ui::sync_screens.run_if(resource_changed::<Proposal>),
                    ui::spring_decline,
                    ui::bob,
                    ui::reveal,
                    ui::grow_screens,
                    ui::tint_buttons,
                )
                    .chain()
                    .after(ui::press_reset),
            );
    }
}
