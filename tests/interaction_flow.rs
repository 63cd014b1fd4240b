use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use valentine::audio::Cue;
use valentine::config::ProposalConfig;
use valentine::env::FakeEnvironment;
use valentine::particles::{BurstId, BurstTag, Look, ParticleEngine};
use valentine::proposal::{Proposal, ProposalState, Reaction};

const FRAME: Duration = Duration::from_nanos(16_666_667);

struct Stage {
    env: FakeEnvironment,
    rng: StdRng,
    config: ProposalConfig,
    proposal: Proposal,
    engine: ParticleEngine,
}

impl Stage {
    fn new(width: f32, height: f32) -> Self {
        Self {
            env: FakeEnvironment::new(width, height),
            rng: StdRng::seed_from_u64(14),
            config: ProposalConfig::default(),
            proposal: Proposal::default(),
            engine: ParticleEngine::default(),
        }
    }

    fn apply(&mut self, reaction: &Reaction) -> Vec<BurstId> {
        for tag in &reaction.stop {
            self.engine.cancel_tagged(*tag);
        }
        reaction
            .start
            .iter()
            .map(|spec| self.engine.start(spec, &self.env, &mut self.rng))
            .collect()
    }

    fn frame(&mut self) {
        self.env.advance(FRAME);
        self.engine.tick(&self.env);
    }
}

#[test]
fn fresh_load_is_quiet() {
    let stage = Stage::new(800.0, 600.0);
    assert_eq!(stage.proposal.state(), ProposalState::Pending);
    assert_eq!(stage.proposal.decline_position(), None);
    assert!(stage.engine.is_idle());
}

#[test]
fn hovering_no_moves_it_and_taunts_briefly() {
    let mut stage = Stage::new(800.0, 600.0);
    let reaction = stage
        .proposal
        .trigger_evade(&stage.env, &mut stage.rng, &stage.config);

    let pos = stage.proposal.decline_position().expect("button should have moved");
    assert!((0.0..=680.0).contains(&pos.x));
    assert!((0.0..=540.0).contains(&pos.y));
    assert!(reaction.cues.iter().any(|c| c.cue == Cue::Evade));

    let ids = stage.apply(&reaction);
    assert_eq!(ids.len(), 1);
    let burst = stage.engine.burst(ids[0]).unwrap();
    assert_eq!(burst.tag(), BurstTag::Taunt);
    assert!(burst
        .particles()
        .iter()
        .all(|p| matches!(p.look, Look::Glyph { .. })));

    for _ in 0..120 {
        stage.frame();
    }
    assert!(stage.engine.is_idle(), "taunts outlived two seconds");
}

#[test]
fn yes_brings_confetti_and_cheering() {
    let mut stage = Stage::new(800.0, 600.0);
    let reaction = stage.proposal.accept(&stage.config);

    assert_eq!(stage.proposal.state(), ProposalState::Accepted);
    assert!(reaction.cues.iter().any(|c| c.cue == Cue::Cheer));

    let ids = stage.apply(&reaction);
    let burst = stage.engine.burst(ids[0]).unwrap();
    assert_eq!(burst.tag(), BurstTag::Celebration);
    assert_eq!(burst.particles().len(), 100);

    stage.frame();
    assert!(stage.engine.is_active(ids[0]));
}

#[test]
fn asking_again_clears_everything() {
    let mut stage = Stage::new(800.0, 600.0);
    let dodge = stage
        .proposal
        .trigger_evade(&stage.env, &mut stage.rng, &stage.config);
    stage.apply(&dodge);
    let yes = stage.proposal.accept(&stage.config);
    let party = stage.apply(&yes)[0];
    stage.frame();

    let again = stage.proposal.reset();
    assert!(again.start.is_empty());
    stage.apply(&again);

    assert_eq!(stage.proposal.state(), ProposalState::Pending);
    assert_eq!(stage.proposal.decline_position(), None);
    assert!(!stage.engine.is_active(party));
    assert!(stage.engine.bursts().all(|b| b.tag() != BurstTag::Celebration));
}

#[test]
fn overlapping_bursts_run_independently() {
    let mut stage = Stage::new(800.0, 600.0);
    let dodge = stage
        .proposal
        .trigger_evade(&stage.env, &mut stage.rng, &stage.config);
    let taunt = stage.apply(&dodge)[0];
    let yes = stage.proposal.accept(&stage.config);
    let party = stage.apply(&yes)[0];

    let confetti_before = stage.engine.burst(party).unwrap().particles().to_vec();
    stage.engine.cancel(taunt);
    stage.frame();

    let confetti_after = stage.engine.burst(party).unwrap().particles();
    assert_eq!(confetti_after.len(), confetti_before.len());
    for (before, after) in confetti_before.iter().zip(confetti_after) {
        assert_eq!(after.position, before.position + before.velocity);
    }
}

#[test]
fn long_press_dodges_short_tap_does_not() {
    let hold = ProposalConfig::default().hold_threshold;
    let start = Duration::from_secs(3);
    assert!(!Proposal::evaluate_touch_gesture(start, start + Duration::from_millis(499), hold));
    assert!(Proposal::evaluate_touch_gesture(start, start + Duration::from_millis(500), hold));
}
