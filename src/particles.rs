//! Falling confetti and falling taunts.
//!
//! Every burst owns its particles outright. A tick rebuilds the particle list
//! from the survivors, and a burst whose list comes back empty (or whose
//! lifetime has run out) is dropped from the engine and never ticked again.

use std::collections::BTreeMap;
use std::time::Duration;

use bevy::prelude::*;
use rand::Rng;

use crate::config::ProposalConfig;
use crate::env::{Environment, Viewport};

const CONFETTI_COLORS: [Color; 8] = [
    Color::srgb(0.96, 0.26, 0.21),
    Color::srgb(0.91, 0.12, 0.39),
    Color::srgb(1.0, 0.41, 0.71),
    Color::srgb(0.99, 0.64, 0.77),
    Color::srgb(0.61, 0.15, 0.69),
    Color::srgb(1.0, 0.76, 0.03),
    Color::srgb(1.0, 1.0, 1.0),
    Color::srgb(0.86, 0.08, 0.24),
];

const TAUNT_COLORS: [Color; 3] = [
    Color::srgb(0.86, 0.15, 0.15),
    Color::srgb(0.93, 0.28, 0.6),
    Color::srgb(0.42, 0.45, 0.5),
];

const TAUNTS: [&str; 7] = ["no?", "nope", "too slow", "hehe", "catch me", "try again", "<3"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BurstId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BurstTag {
    Celebration,
    Taunt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Confetti,
    Glyph,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Look {
    Confetti { size: Vec2, color: Color },
    Glyph { text: &'static str, color: Color, font_size: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BurstSpec {
    pub tag: BurstTag,
    pub shape: Shape,
    pub count: usize,
    pub gravity: f32,
    /// Multiplier on horizontal velocity per tick.
    pub damping: f32,
    pub lifetime: Option<Duration>,
}

impl BurstSpec {
    pub fn confetti(config: &ProposalConfig) -> Self {
        Self {
            tag: BurstTag::Celebration,
            shape: Shape::Confetti,
            count: config.confetti_count,
            gravity: config.gravity,
            damping: 1.0,
            lifetime: None,
        }
    }

    pub fn taunts(config: &ProposalConfig) -> Self {
        Self {
            tag: BurstTag::Taunt,
            shape: Shape::Glyph,
            count: config.taunt_count,
            gravity: config.gravity,
            damping: config.damping,
            lifetime: Some(config.evade_burst_lifetime),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Stable within its burst, used to pair the particle with its entity.
    pub id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub damping: f32,
    pub angle: f32,
    pub spin: f32,
    pub base_opacity: f32,
    pub opacity: f32,
    pub look: Look,
}

impl Particle {
    /// Advance one tick. Returns false once the particle has left the screen.
    pub fn tick(&mut self, gravity: f32, viewport: Viewport) -> bool {
        self.position.y += self.velocity.y;
        self.position.x += self.velocity.x;
        self.velocity.y += gravity;
        self.velocity.x *= self.damping;
        self.angle += self.spin;

        match self.look {
            Look::Confetti { .. } => self.position.y <= viewport.height,
            Look::Glyph { .. } => {
                self.opacity = fade(self.base_opacity, self.position.y, viewport.height);
                self.opacity > 0.0
            }
        }
    }
}

/// Opacity of a glyph at depth `y`: full at the top, gone at the bottom.
pub fn fade(base: f32, y: f32, height: f32) -> f32 {
    if height <= 0.0 {
        return 0.0;
    }
    (base - (y / height) * base).clamp(0.0, base)
}

#[derive(Debug)]
pub struct Burst {
    id: BurstId,
    tag: BurstTag,
    gravity: f32,
    expires_at: Option<Duration>,
    particles: Vec<Particle>,
}

impl Burst {
    pub fn id(&self) -> BurstId {
        self.id
    }

    pub fn tag(&self) -> BurstTag {
        self.tag
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn expired(&self, now: Duration) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    fn advance(&mut self, viewport: Viewport) {
        let gravity = self.gravity;
        self.particles = std::mem::take(&mut self.particles)
            .into_iter()
            .filter_map(|mut p| p.tick(gravity, viewport).then_some(p))
            .collect();
    }
}

/// Owns every live burst and ticks them once per frame.
#[derive(Resource, Debug, Default)]
pub struct ParticleEngine {
    next_id: u64,
    bursts: BTreeMap<BurstId, Burst>,
}

impl ParticleEngine {
    pub fn start<E, R>(&mut self, spec: &BurstSpec, env: &E, rng: &mut R) -> BurstId
    where
        E: Environment + ?Sized,
        R: Rng + ?Sized,
    {
        let id = BurstId(self.next_id);
        self.next_id += 1;

        let viewport = env.viewport();
        let particles = (0..spec.count)
            .map(|i| spawn(i as u32, spec, viewport, &mut *rng))
            .collect();

        self.bursts.insert(
            id,
            Burst {
                id,
                tag: spec.tag,
                gravity: spec.gravity,
                expires_at: spec.lifetime.map(|life| env.now() + life),
                particles,
            },
        );
        debug!("burst {:?} started with {} particles", id, spec.count);
        id
    }

    /// Advances every burst by one tick and returns the ones that finished.
    pub fn tick<E>(&mut self, env: &E) -> Vec<BurstId>
    where
        E: Environment + ?Sized,
    {
        let viewport = env.viewport();
        let now = env.now();
        let mut finished = Vec::new();

        self.bursts.retain(|id, burst| {
            if burst.expired(now) {
                finished.push(*id);
                return false;
            }
            burst.advance(viewport);
            if burst.particles.is_empty() {
                finished.push(*id);
                return false;
            }
            true
        });

        for id in &finished {
            debug!("burst {:?} finished", id);
        }
        finished
    }

    pub fn cancel(&mut self, id: BurstId) -> bool {
        self.bursts.remove(&id).is_some()
    }

    pub fn cancel_tagged(&mut self, tag: BurstTag) -> Vec<BurstId> {
        let mut doomed: Vec<BurstId> = self
            .bursts
            .values()
            .filter(|b| b.tag == tag)
            .map(|b| b.id)
            .collect();
        doomed.retain(|id| self.cancel(*id));
        doomed
    }

    pub fn burst(&self, id: BurstId) -> Option<&Burst> {
        self.bursts.get(&id)
    }

    pub fn bursts(&self) -> impl Iterator<Item = &Burst> {
        self.bursts.values()
    }

    pub fn is_active(&self, id: BurstId) -> bool {
        self.bursts.contains_key(&id)
    }

    pub fn is_idle(&self) -> bool {
        self.bursts.is_empty()
    }
}

fn spawn<R: Rng + ?Sized>(id: u32, spec: &BurstSpec, viewport: Viewport, rng: &mut R) -> Particle {
    let x = rng.random::<f32>() * viewport.width;
    match spec.shape {
        Shape::Confetti => Particle {
            id,
            // Spread over the band above the screen so the pieces trickle in
            position: Vec2::new(x, -rng.random::<f32>() * viewport.height * 0.5),
            velocity: Vec2::new(rng.random_range(-4.0..4.0), rng.random_range(1.0..4.0)),
            damping: spec.damping,
            angle: rng.random_range(0.0..std::f32::consts::TAU),
            spin: rng.random_range(-0.2..0.2),
            base_opacity: 1.0,
            opacity: 1.0,
            look: Look::Confetti {
                size: Vec2::new(rng.random_range(5.0..10.0), rng.random_range(10.0..18.0)),
                color: CONFETTI_COLORS[rng.random_range(0..CONFETTI_COLORS.len())],
            },
        },
        Shape::Glyph => {
            let base_opacity = rng.random_range(0.6..1.0);
            Particle {
                id,
                position: Vec2::new(x, -rng.random::<f32>() * 60.0),
                velocity: Vec2::new(rng.random_range(-2.0..2.0), rng.random_range(1.0..3.0)),
                damping: spec.damping,
                angle: 0.0,
                spin: 0.0,
                base_opacity,
                opacity: base_opacity,
                look: Look::Glyph {
                    text: TAUNTS[rng.random_range(0..TAUNTS.len())],
                    color: TAUNT_COLORS[rng.random_range(0..TAUNT_COLORS.len())],
                    font_size: rng.random_range(18.0..30.0),
                },
            }
        }
    }
}
