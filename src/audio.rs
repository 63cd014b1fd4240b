//! Procedural sound cues.
//!
//! Each request renders a fresh mono buffer from a handful of sine tones with
//! exponential decay and hands it to Bevy as a one-shot `Chime` asset. Nothing
//! is cached between requests.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use bevy::audio::{Decodable, PlaybackMode, Source, Volume};
use bevy::prelude::*;
use thiserror::Error;

use crate::config::ProposalConfig;

// Extra time a cue entity is kept around after its last tone ends
const CUE_TAIL_SECS: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Two quick high notes, the first one sliding down.
    Evade,
    /// Three four-note chords.
    Success,
    /// Rising arpeggio, then a sparkle on top.
    Cheer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub freq: f32,
    pub glide_to: Option<f32>,
    pub start: f32,
    pub duration: f32,
    pub peak: f32,
    pub floor: f32,
}

impl Tone {
    const fn note(freq: f32, start: f32, duration: f32, peak: f32) -> Self {
        Self {
            freq,
            glide_to: None,
            start,
            duration,
            peak,
            floor: 0.01,
        }
    }

    fn end(&self) -> f32 {
        self.start + self.duration
    }

    fn check(&self) -> Result<(), SynthError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.freq) {
            return Err(SynthError::Frequency(self.freq));
        }
        if let Some(to) = self.glide_to.filter(|&to| !positive(to)) {
            return Err(SynthError::Frequency(to));
        }
        if !positive(self.duration) || !(self.start.is_finite() && self.start >= 0.0) {
            return Err(SynthError::Timing {
                start: self.start,
                duration: self.duration,
            });
        }
        // Exponential ramps cannot touch zero
        if !positive(self.peak) || !positive(self.floor) {
            return Err(SynthError::Gain(if positive(self.peak) { self.floor } else { self.peak }));
        }
        Ok(())
    }
}

const C4: f32 = 261.63;
const E4: f32 = 329.63;
const F4: f32 = 349.23;
const G4: f32 = 392.00;
const A4: f32 = 440.00;
const B4: f32 = 493.88;
const C5: f32 = 523.25;
const D5: f32 = 587.33;
const E5: f32 = 659.25;
const F5: f32 = 698.46;
const G5: f32 = 783.99;
const C6: f32 = 1046.50;
const E6: f32 = 1318.51;
const G6: f32 = 1567.98;
const C7: f32 = 2093.00;

const CHORDS: [[f32; 4]; 3] = [[C4, E4, G4, C5], [F4, A4, C5, F5], [G4, B4, D5, G5]];

impl Cue {
    pub fn tones(self) -> Vec<Tone> {
        match self {
            Cue::Evade => vec![
                Tone {
                    glide_to: Some(440.0),
                    ..Tone::note(880.0, 0.0, 0.1, 0.1)
                },
                Tone::note(E6, 0.08, 0.08, 0.07),
            ],
            Cue::Success => CHORDS
                .iter()
                .enumerate()
                .flat_map(|(i, chord)| {
                    let start = i as f32 * 0.35;
                    chord.iter().map(move |&f| Tone::note(f, start, 0.45, 0.06))
                })
                .collect(),
            Cue::Cheer => {
                let rise = [C5, E5, G5, C6]
                    .into_iter()
                    .enumerate()
                    .map(|(i, f)| Tone::note(f, i as f32 * 0.08, 0.25, 0.15));
                let shimmer = [E6, G6, C7]
                    .into_iter()
                    .enumerate()
                    .map(|(i, f)| Tone::note(f, 0.4 + i as f32 * 0.06, 0.5, 0.05));
                rise.chain(shimmer).collect()
            }
        }
    }

    /// Length of the cue in seconds.
    pub fn length(self) -> f32 {
        self.tones().iter().map(Tone::end).fold(0.0, f32::max)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum SynthError {
    #[error("nothing to play")]
    Empty,
    #[error("sample rate must be non-zero")]
    SampleRate,
    #[error("bad frequency {0} Hz")]
    Frequency(f32),
    #[error("bad timing: start {start}s, duration {duration}s")]
    Timing { start: f32, duration: f32 },
    #[error("gain {0} cannot be ramped exponentially")]
    Gain(f32),
}

/// Mixes `tones` into a mono buffer, shifted right by `delay` seconds.
pub fn render(tones: &[Tone], delay: f32, sample_rate: u32) -> Result<Vec<f32>, SynthError> {
    if sample_rate == 0 {
        return Err(SynthError::SampleRate);
    }
    if tones.is_empty() {
        return Err(SynthError::Empty);
    }
    for tone in tones {
        tone.check()?;
    }
    let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };

    let rate = sample_rate as f32;
    let end = tones.iter().map(Tone::end).fold(0.0, f32::max) + delay;
    let mut buf = vec![0.0_f32; (end * rate).ceil() as usize];

    for tone in tones {
        let first = ((tone.start + delay) * rate) as usize;
        let count = (tone.duration * rate) as usize;
        let decay = tone.floor / tone.peak;
        let mut phase = 0.0_f32;

        for (i, slot) in buf.iter_mut().skip(first).take(count).enumerate() {
            let progress = i as f32 / count as f32;
            let freq = match tone.glide_to {
                Some(to) => tone.freq * (to / tone.freq).powf(progress),
                None => tone.freq,
            };
            *slot += phase.sin() * tone.peak * decay.powf(progress);
            phase = (phase + TAU * freq / rate) % TAU;
        }
    }

    for s in &mut buf {
        *s = s.clamp(-1.0, 1.0);
    }
    Ok(buf)
}

/// A rendered cue, playable through `AudioPlayer<Chime>`.
#[derive(Asset, TypePath, Clone, Debug)]
pub struct Chime {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl Chime {
    pub fn synthesize(cue: Cue, delay: f32, sample_rate: u32) -> Result<Self, SynthError> {
        let samples = render(&cue.tones(), delay, sample_rate)?;
        Ok(Self {
            samples: samples.into(),
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f32(self.samples().len() as f32 / self.sample_rate as f32)
    }
}

pub struct ChimeDecoder {
    samples: Arc<[f32]>,
    cursor: usize,
    sample_rate: u32,
}

impl Iterator for ChimeDecoder {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let s = self.samples.get(self.cursor).copied();
        self.cursor += 1;
        s
    }
}

impl Source for ChimeDecoder {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(
            self.samples.len() as f32 / self.sample_rate as f32,
        ))
    }
}

impl Decodable for Chime {
    type DecoderItem = f32;
    type Decoder = ChimeDecoder;

    fn decoder(&self) -> Self::Decoder {
        ChimeDecoder {
            samples: self.samples.clone(),
            cursor: 0,
            sample_rate: self.sample_rate,
        }
    }
}

#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct PlayCue {
    pub cue: Cue,
    /// Seconds of silence before the first tone.
    pub delay: f32,
}

impl PlayCue {
    pub fn now(cue: Cue) -> Self {
        Self { cue, delay: 0.0 }
    }
}

/// Despawns a cue player even if the output never got to it.
#[derive(Component)]
pub struct CueLifetime(Timer);

pub fn play_cues(
    mut cmd: Commands,
    mut events: EventReader<PlayCue>,
    mut chimes: ResMut<Assets<Chime>>,
    config: Res<ProposalConfig>,
) {
    for event in events.read() {
        if config.muted {
            debug!("muted, skipping {:?}", event.cue);
            continue;
        }

        let chime = match Chime::synthesize(event.cue, event.delay, config.sample_rate) {
            Ok(chime) => chime,
            Err(e) => {
                debug!("{:?} cue not played: {}", event.cue, e);
                continue;
            }
        };

        let ttl = chime.duration().as_secs_f32() + CUE_TAIL_SECS;
        cmd.spawn((
            AudioPlayer(chimes.add(chime)),
            PlaybackSettings {
                mode: PlaybackMode::Despawn,
                volume: Volume::new(config.volume),
                ..default()
            },
            CueLifetime(Timer::from_seconds(ttl, TimerMode::Once)),
        ));
    }
}

pub fn expire_cues(
    mut cmd: Commands,
    time: Res<Time>,
    mut players: Query<(Entity, &mut CueLifetime)>,
) {
    for (entity, mut life) in players.iter_mut() {
        // PlaybackMode::Despawn may already have queued this one
        if life.0.tick(time.delta()).finished() {
            cmd.entity(entity).try_despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8_000;

    #[test]
    fn cue_shapes() {
        assert_eq!(Cue::Evade.tones().len(), 2);

        let success = Cue::Success.tones();
        assert_eq!(success.len(), 12);
        let starts: Vec<f32> = success.chunks(4).map(|c| c[0].start).collect();
        assert_eq!(starts, vec![0.0, 0.35, 0.7]);
        assert!(success.chunks(4).all(|c| c.iter().all(|t| t.start == c[0].start)));

        let cheer = Cue::Cheer.tones();
        assert_eq!(cheer.len(), 7);
        assert!(cheer[..4].windows(2).all(|w| w[1].freq > w[0].freq && w[1].start > w[0].start));
        assert!(cheer[4..].iter().all(|t| t.start >= cheer[3].start));
    }

    #[test]
    fn every_cue_renders() {
        for cue in [Cue::Evade, Cue::Success, Cue::Cheer] {
            let buf = render(&cue.tones(), 0.0, RATE).unwrap();
            assert_eq!(buf.len(), (cue.length() * RATE as f32).ceil() as usize);
            assert!(buf.iter().all(|s| (-1.0..=1.0).contains(s)));
            assert!(buf.iter().any(|s| s.abs() > 0.01), "{cue:?} is silent");
        }
    }

    #[test]
    fn delay_prepends_silence() {
        let tones = Cue::Evade.tones();
        let buf = render(&tones, 0.5, RATE).unwrap();
        let lead = (0.5 * RATE as f32) as usize;
        assert!(buf[..lead].iter().all(|s| *s == 0.0));
        assert!(buf[lead..].iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn envelope_decays() {
        let tone = Tone::note(440.0, 0.0, 1.0, 0.5);
        let buf = render(&[tone], 0.0, RATE).unwrap();
        let peak = |s: &[f32]| s.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
        let head = peak(&buf[..800]);
        let tail = peak(&buf[buf.len() - 800..]);
        assert!(head > 0.4);
        assert!(tail < 0.02);
    }

    #[test]
    fn bad_input_is_rejected() {
        assert_eq!(render(&[], 0.0, RATE), Err(SynthError::Empty));
        assert_eq!(render(&Cue::Evade.tones(), 0.0, 0), Err(SynthError::SampleRate));

        let silent = Tone {
            floor: 0.0,
            ..Tone::note(440.0, 0.0, 0.1, 0.2)
        };
        assert_eq!(render(&[silent], 0.0, RATE), Err(SynthError::Gain(0.0)));

        let backwards = Tone::note(440.0, -1.0, 0.1, 0.2);
        assert!(matches!(
            render(&[backwards], 0.0, RATE),
            Err(SynthError::Timing { .. })
        ));

        let sub = Tone::note(-20.0, 0.0, 0.1, 0.2);
        assert_eq!(render(&[sub], 0.0, RATE), Err(SynthError::Frequency(-20.0)));
    }

    #[test]
    fn decoder_drains_the_buffer_once() {
        let chime = Chime::synthesize(Cue::Evade, 0.0, RATE).unwrap();
        let mut decoder = chime.decoder();
        assert_eq!(decoder.channels(), 1);
        assert_eq!(decoder.sample_rate(), RATE);

        let played: Vec<f32> = decoder.by_ref().collect();
        assert_eq!(played.as_slice(), chime.samples());
        assert_eq!(decoder.next(), None);
    }

    fn cue_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(bevy::time::TimeUpdateStrategy::ManualDuration(
                Duration::from_millis(100),
            ))
            .add_systems(Update, expire_cues);
        app
    }

    #[test]
    fn cue_players_are_cleaned_up_after_their_lifetime() {
        let mut app = cue_app();
        let player = app
            .world_mut()
            .spawn(CueLifetime(Timer::from_seconds(0.25, TimerMode::Once)))
            .id();

        // first frame has no delta, then 100ms each
        for _ in 0..3 {
            app.update();
        }
        assert!(app.world().get_entity(player).is_ok());

        app.update();
        assert!(app.world().get_entity(player).is_err());
    }

    #[test]
    fn finished_playback_and_expiry_in_the_same_frame() {
        fn playback_done(mut cmd: Commands, players: Query<Entity, With<CueLifetime>>) {
            for entity in &players {
                cmd.entity(entity).despawn();
            }
        }

        let mut app = cue_app();
        app.add_systems(Update, playback_done.before(expire_cues));
        let player = app
            .world_mut()
            .spawn(CueLifetime(Timer::from_seconds(0.0, TimerMode::Once)))
            .id();

        app.update();
        assert!(app.world().get_entity(player).is_err());
    }
}
