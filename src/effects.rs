//! Bevy side of the particle engine: burst commands, the per-frame tick, and
//! one sprite or text entity per live particle.

use std::collections::HashMap;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use bevy::window::PrimaryWindow;

use crate::audio::PlayCue;
use crate::env::{FrameEnv, Viewport};
use crate::particles::{BurstId, BurstSpec, BurstTag, Look, Particle, ParticleEngine};
use crate::proposal::Reaction;
use crate::RandomSource;

/// Particles are drawn by a second camera so they land on top of the UI.
pub const PARTICLE_LAYER: usize = 1;

const CONFETTI_Z: f32 = 5.0;
const GLYPH_Z: f32 = 6.0;

#[derive(Event, Clone, Debug, PartialEq)]
pub enum BurstCommand {
    Start(BurstSpec),
    Stop(BurstTag),
}

/// Writers for everything a `Reaction` can ask for.
#[derive(SystemParam)]
pub struct Reactions<'w> {
    cues: EventWriter<'w, PlayCue>,
    bursts: EventWriter<'w, BurstCommand>,
}

impl Reactions<'_> {
    pub fn apply(&mut self, reaction: Reaction) {
        for cue in reaction.cues {
            self.cues.send(cue);
        }
        for tag in reaction.stop {
            self.bursts.send(BurstCommand::Stop(tag));
        }
        for spec in reaction.start {
            self.bursts.send(BurstCommand::Start(spec));
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleSprite {
    burst: BurstId,
    particle: u32,
}

pub fn apply_burst_commands(
    mut commands: EventReader<BurstCommand>,
    mut engine: ResMut<ParticleEngine>,
    mut rng: ResMut<RandomSource>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
) {
    let Some(env) = FrameEnv::capture(&windows, &time) else {
        return;
    };

    for command in commands.read() {
        match command {
            BurstCommand::Start(spec) => {
                engine.start(spec, &env, &mut rng.0);
            }
            BurstCommand::Stop(tag) => {
                let stopped = engine.cancel_tagged(*tag);
                if !stopped.is_empty() {
                    debug!("stopped {:?} bursts {:?}", tag, stopped);
                }
            }
        }
    }
}

pub fn bursts_alive(engine: Res<ParticleEngine>) -> bool {
    !engine.is_idle()
}

pub fn tick_bursts(
    mut engine: ResMut<ParticleEngine>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
) {
    let Some(env) = FrameEnv::capture(&windows, &time) else {
        return;
    };
    engine.tick(&env);
}

/// Moves, spawns and despawns particle entities to match the engine.
pub fn sync_particles(
    mut cmd: Commands,
    engine: Res<ParticleEngine>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut drawn: Query<(Entity, &ParticleSprite, &mut Transform, Option<&mut TextColor>)>,
) {
    let Ok(win) = windows.get_single() else {
        return;
    };
    let viewport = Viewport::new(win.width(), win.height());

    let mut live: HashMap<ParticleSprite, &Particle> = engine
        .bursts()
        .flat_map(|b| {
            b.particles().iter().map(move |p| {
                let key = ParticleSprite {
                    burst: b.id(),
                    particle: p.id,
                };
                (key, p)
            })
        })
        .collect();

    for (entity, key, mut transform, text_color) in drawn.iter_mut() {
        let Some(p) = live.remove(key) else {
            cmd.entity(entity).despawn();
            continue;
        };
        *transform = place(p, viewport);
        if let (Some(mut text_color), Look::Glyph { color, .. }) = (text_color, &p.look) {
            text_color.0 = color.with_alpha(p.opacity);
        }
    }

    for (key, p) in live {
        let transform = place(p, viewport);
        let layer = RenderLayers::layer(PARTICLE_LAYER);
        match &p.look {
            Look::Confetti { size, color } => {
                cmd.spawn((Sprite::from_color(*color, *size), transform, key, layer));
            }
            Look::Glyph {
                text,
                color,
                font_size,
            } => {
                cmd.spawn((
                    Text2d::new(*text),
                    TextFont {
                        font_size: *font_size,
                        ..default()
                    },
                    TextColor(color.with_alpha(p.opacity)),
                    transform,
                    key,
                    layer,
                ));
            }
        }
    }
}

fn place(p: &Particle, viewport: Viewport) -> Transform {
    let z = match p.look {
        Look::Confetti { .. } => CONFETTI_Z,
        Look::Glyph { .. } => GLYPH_Z,
    };
    Transform::from_translation(viewport.to_world(p.position).extend(z))
        .with_rotation(Quat::from_rotation_z(-p.angle))
}
