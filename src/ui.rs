//! The two screens and the buttons on them.

use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use bevy::ui::IsDefaultUiCamera;
use bevy::window::PrimaryWindow;

use crate::config::ProposalConfig;
use crate::effects::{Reactions, PARTICLE_LAYER};
use crate::env::{FrameEnv, Viewport};
use crate::proposal::{Proposal, ProposalState, TouchGesture};
use crate::RandomSource;

pub const BG_COLOR: Color = Color::srgb(0.99, 0.91, 0.95);
const TITLE_RED: Color = Color::srgb(0.86, 0.15, 0.15);
const HEART_PINK: Color = Color::srgb(0.93, 0.28, 0.6);
const BODY_GRAY: Color = Color::srgb(0.22, 0.25, 0.32);
const HINT_GRAY: Color = Color::srgb(0.29, 0.33, 0.39);
const YES_IDLE: Color = Color::srgb(0.93, 0.27, 0.45);
const YES_HOVER: Color = Color::srgb(1.0, 0.36, 0.55);
const NO_IDLE: Color = Color::srgb(0.61, 0.64, 0.69);
const NO_HOVER: Color = Color::srgb(0.55, 0.58, 0.63);

const FADE_SECS: f32 = 0.6;
const ENTRY_SCALE: f32 = 0.8;
const TITLE_RISE: f32 = 20.0;
const PRESSED_SCALE: f32 = 0.95;

// Spring the floating No button uses to chase its target
const SPRING_STIFFNESS: f32 = 300.0;
const SPRING_DAMPING: f32 = 10.0;
const SPRING_MAX_STEP: f32 = 1.0 / 120.0;

#[derive(Component)]
pub struct PendingScreen;

#[derive(Component)]
pub struct AcceptedScreen;

#[derive(Component)]
pub struct YesButton;

#[derive(Component)]
pub struct ResetButton;

/// The No button. The inline one sits next to Yes until the first dodge,
/// after which the floating one takes over.
#[derive(Component)]
pub struct DeclineButton {
    floating: bool,
}

#[derive(Component)]
pub struct ButtonTint {
    idle: Color,
    hover: Color,
    hover_scale: f32,
}

/// Vertical hop, one up-and-down per period.
#[derive(Component)]
pub struct Bob {
    amplitude: f32,
    period: f32,
    delay: f32,
}

/// Fades text in some time after its screen appears, optionally sliding it
/// down from `rise` pixels above its place.
#[derive(Component, Default)]
pub struct Reveal {
    delay: f32,
    rise: f32,
}

/// When the current screen was shown, in seconds since startup.
#[derive(Resource, Default)]
pub struct ShownAt(f32);

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
pub struct SpringFollow {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl SpringFollow {
    pub fn step(&mut self, target: Vec2, dt: f32) {
        let mut left = dt.max(0.0);
        while left > 0.0 {
            let h = left.min(SPRING_MAX_STEP);
            let accel = SPRING_STIFFNESS * (target - self.position) - SPRING_DAMPING * self.velocity;
            self.velocity += accel * h;
            self.position += self.velocity * h;
            left -= h;
        }
    }
}

fn pill(color: Color, hover: Color, hover_scale: f32) -> impl Bundle {
    (
        Button,
        Node {
            padding: UiRect::axes(Val::Px(32.0), Val::Px(16.0)),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        BackgroundColor(color),
        BorderRadius::MAX,
        ButtonTint {
            idle: color,
            hover,
            hover_scale,
        },
    )
}

fn label(text: &str, size: f32, color: Color) -> impl Bundle {
    (
        Text::new(text),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(color),
        TextLayout::new_with_justify(JustifyText::Center),
    )
}

pub fn setup(mut cmd: Commands) {
    cmd.spawn((Camera2d, IsDefaultUiCamera));
    cmd.spawn((
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        RenderLayers::layer(PARTICLE_LAYER),
    ));

    cmd.spawn(Node {
        width: Val::Percent(100.0),
        height: Val::Percent(100.0),
        justify_content: JustifyContent::Center,
        align_items: AlignItems::Center,
        ..default()
    })
    .with_children(|root| {
        root.spawn((
            Node {
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                row_gap: Val::Px(32.0),
                padding: UiRect::all(Val::Px(32.0)),
                ..default()
            },
            PendingScreen,
        ))
        .with_children(|screen| {
            screen.spawn((
                label("Will you be my Valentine?", 48.0, TITLE_RED),
                Reveal {
                    delay: 0.2,
                    rise: TITLE_RISE,
                },
            ));
            screen.spawn((
                label("<3 <3", 40.0, HEART_PINK),
                Bob {
                    amplitude: 10.0,
                    period: 2.0,
                    delay: 0.0,
                },
            ));
            screen
                .spawn(Node {
                    flex_direction: FlexDirection::Row,
                    column_gap: Val::Px(24.0),
                    ..default()
                })
                .with_children(|row| {
                    row.spawn((pill(YES_IDLE, YES_HOVER, 1.1), YesButton))
                        .with_children(|b| {
                            b.spawn(label("Yes", 20.0, Color::WHITE));
                        });
                    row.spawn((pill(NO_IDLE, NO_HOVER, 1.05), DeclineButton { floating: false }))
                        .with_children(|b| {
                            b.spawn(label("No", 20.0, Color::WHITE));
                        });
                });
            screen.spawn((
                label("(Try to click the No button ;))", 14.0, HINT_GRAY),
                Reveal {
                    delay: 0.8,
                    ..default()
                },
            ));
        });

        root.spawn((
            Node {
                display: Display::None,
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                row_gap: Val::Px(24.0),
                padding: UiRect::all(Val::Px(32.0)),
                max_width: Val::Px(672.0),
                ..default()
            },
            AcceptedScreen,
        ))
        .with_children(|screen| {
            screen.spawn((
                label("Happy Valentine's Day <3", 48.0, TITLE_RED),
                Reveal {
                    delay: 0.2,
                    rise: TITLE_RISE,
                },
            ));
            screen.spawn((
                label(
                    "Thank you for saying yes. You make my world brighter and my days warmer. \
                     Every moment with you is special, and I'm grateful for you today and always.",
                    20.0,
                    BODY_GRAY,
                ),
                Reveal {
                    delay: 0.4,
                    ..default()
                },
            ));
            screen
                .spawn(Node {
                    flex_direction: FlexDirection::Row,
                    column_gap: Val::Px(16.0),
                    ..default()
                })
                .with_children(|hearts| {
                    for i in 0..3 {
                        hearts.spawn((
                            label("<3", 36.0, HEART_PINK),
                            Reveal {
                                delay: 0.6,
                                ..default()
                            },
                            Bob {
                                amplitude: 15.0,
                                period: 1.5,
                                delay: i as f32 * 0.2,
                            },
                        ));
                    }
                });
            screen.spawn((
                label("Forever yours", 20.0, TITLE_RED),
                Reveal {
                    delay: 0.8,
                    ..default()
                },
            ));
            screen
                .spawn((pill(NO_IDLE, NO_HOVER, 1.05), ResetButton))
                .insert(Node {
                    justify_content: JustifyContent::Center,
                    margin: UiRect::top(Val::Px(48.0)),
                    padding: UiRect::axes(Val::Px(24.0), Val::Px(8.0)),
                    ..default()
                })
                .with_children(|b| {
                    b.spawn(label("Ask again?", 14.0, Color::WHITE));
                });
        });

        root.spawn((
            pill(NO_IDLE, NO_HOVER, 1.05),
            DeclineButton { floating: true },
            SpringFollow::default(),
        ))
        .insert(Node {
            display: Display::None,
            position_type: PositionType::Absolute,
            left: Val::Px(0.0),
            top: Val::Px(0.0),
            padding: UiRect::axes(Val::Px(32.0), Val::Px(16.0)),
            ..default()
        })
        .with_children(|b| {
            b.spawn(label("No", 20.0, Color::WHITE));
        });
    });
}

pub fn press_yes(
    buttons: Query<&Interaction, (Changed<Interaction>, With<YesButton>)>,
    mut proposal: ResMut<Proposal>,
    config: Res<ProposalConfig>,
    mut reactions: Reactions,
) {
    if !buttons.iter().any(|i| *i == Interaction::Pressed) {
        return;
    }
    let reaction = proposal.accept(&config);
    if reaction.is_empty() {
        debug!("Yes pressed again, already accepted");
        return;
    }
    reactions.apply(reaction);
}

pub fn press_reset(
    buttons: Query<&Interaction, (Changed<Interaction>, With<ResetButton>)>,
    mut proposal: ResMut<Proposal>,
    mut reactions: Reactions,
) {
    if buttons.iter().any(|i| *i == Interaction::Pressed) {
        reactions.apply(proposal.reset());
    }
}

fn touch_in_progress(touches: &Touches) -> bool {
    touches.iter().next().is_some() || touches.any_just_released() || touches.any_just_canceled()
}

/// Mouse: dodge as soon as the pointer lands on the No button.
#[allow(clippy::too_many_arguments)]
pub fn dodge_on_pointer(
    buttons: Query<&Interaction, (Changed<Interaction>, With<DeclineButton>)>,
    touches: Res<Touches>,
    mut proposal: ResMut<Proposal>,
    mut rng: ResMut<RandomSource>,
    config: Res<ProposalConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
    mut reactions: Reactions,
) {
    if config.touch_hold_evasion && touch_in_progress(&touches) {
        return;
    }
    let entered = buttons
        .iter()
        .any(|i| matches!(i, Interaction::Hovered | Interaction::Pressed));
    if !entered {
        return;
    }
    let Some(env) = FrameEnv::capture(&windows, &time) else {
        return;
    };
    reactions.apply(proposal.trigger_evade(&env, &mut rng.0, &config));
}

/// Touch: a quick tap does nothing, a long press makes the button run.
#[allow(clippy::too_many_arguments)]
pub fn dodge_on_touch_hold(
    buttons: Query<&Interaction, (Changed<Interaction>, With<DeclineButton>)>,
    touches: Res<Touches>,
    mut gesture: ResMut<TouchGesture>,
    mut proposal: ResMut<Proposal>,
    mut rng: ResMut<RandomSource>,
    config: Res<ProposalConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
    mut reactions: Reactions,
) {
    if !config.touch_hold_evasion {
        return;
    }
    let now = time.elapsed();

    if touches.iter().next().is_some() && buttons.iter().any(|i| *i == Interaction::Pressed) {
        gesture.begin(now);
    }
    if !(touches.any_just_released() || touches.any_just_canceled()) {
        return;
    }

    match gesture.finish(now, config.hold_threshold) {
        Some(true) => {
            let Some(env) = FrameEnv::capture(&windows, &time) else {
                return;
            };
            reactions.apply(proposal.trigger_evade(&env, &mut rng.0, &config));
        }
        Some(false) => debug!("tap on No too short to count"),
        None => {}
    }
}

/// Shows the screen and No button variant matching the proposal state.
pub fn sync_screens(
    proposal: Res<Proposal>,
    time: Res<Time>,
    mut shown: ResMut<ShownAt>,
    mut last_state: Local<Option<ProposalState>>,
    mut nodes: Query<
        (
            &mut Node,
            Has<PendingScreen>,
            Has<AcceptedScreen>,
            Option<&DeclineButton>,
            Option<&mut SpringFollow>,
        ),
        Or<(With<PendingScreen>, With<AcceptedScreen>, With<DeclineButton>)>,
    >,
) {
    let state = proposal.state();
    if *last_state != Some(state) {
        *last_state = Some(state);
        shown.0 = time.elapsed_secs();
    }

    let show = |visible: bool| if visible { Display::Flex } else { Display::None };
    let pending = state == ProposalState::Pending;
    let moved = proposal.decline_position().is_some();

    for (mut node, is_pending, is_accepted, decline, spring) in nodes.iter_mut() {
        let display = if is_pending {
            show(pending)
        } else if is_accepted {
            show(!pending)
        } else if let Some(decline) = decline {
            if decline.floating {
                show(pending && moved)
            } else {
                show(!moved)
            }
        } else {
            continue;
        };
        node.display = display;

        if let Some(mut spring) = spring.filter(|_| !moved) {
            *spring = SpringFollow::default();
        }
    }
}

pub fn spring_decline(
    time: Res<Time>,
    proposal: Res<Proposal>,
    config: Res<ProposalConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut buttons: Query<(&mut Node, &mut SpringFollow)>,
) {
    if proposal.state() != ProposalState::Pending {
        return;
    }
    let Some(target) = proposal.decline_position() else {
        return;
    };
    let Ok(win) = windows.get_single() else {
        return;
    };
    let room = Viewport::new(win.width(), win.height()).room_for(config.control_size);

    for (mut node, mut spring) in buttons.iter_mut() {
        spring.step(target, time.delta_secs());
        let shown = spring.position.clamp(Vec2::ZERO, room);
        node.left = Val::Px(shown.x);
        node.top = Val::Px(shown.y);
    }
}

/// Offset for a hop at time `t`: 0 at rest, `-amplitude` at the top.
pub fn bob_offset(t: f32, amplitude: f32, period: f32, delay: f32) -> f32 {
    if period <= 0.0 || t < delay {
        return 0.0;
    }
    let phase = ((t - delay) / period).fract();
    -amplitude * (std::f32::consts::PI * phase).sin()
}

pub fn bob(time: Res<Time>, mut nodes: Query<(&Bob, &mut Node)>) {
    let t = time.elapsed_secs();
    for (b, mut node) in nodes.iter_mut() {
        node.top = Val::Px(bob_offset(t, b.amplitude, b.period, b.delay));
    }
}

fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Opacity of an element `since` seconds after its screen was shown.
pub fn fade_in(since: f32, delay: f32) -> f32 {
    ((since - delay) / FADE_SECS).clamp(0.0, 1.0)
}

/// Scale of a screen `since` seconds after it was shown.
pub fn entry_scale(since: f32) -> f32 {
    ENTRY_SCALE + (1.0 - ENTRY_SCALE) * ease_out(since / FADE_SECS)
}

pub fn reveal(
    time: Res<Time>,
    shown: Res<ShownAt>,
    mut texts: Query<(&Reveal, &mut TextColor, &mut Node)>,
) {
    let since = time.elapsed_secs() - shown.0;
    for (r, mut color, mut node) in texts.iter_mut() {
        let alpha = fade_in(since, r.delay);
        if color.0.alpha() != alpha {
            color.0.set_alpha(alpha);
        }
        if r.rise > 0.0 {
            let top = Val::Px(-r.rise * (1.0 - ease_out(alpha)));
            if node.top != top {
                node.top = top;
            }
        }
    }
}

pub fn grow_screens(
    time: Res<Time>,
    shown: Res<ShownAt>,
    mut screens: Query<&mut Transform, Or<(With<PendingScreen>, With<AcceptedScreen>)>>,
) {
    let scale = Vec3::splat(entry_scale(time.elapsed_secs() - shown.0));
    for mut transform in screens.iter_mut() {
        if transform.scale != scale {
            transform.scale = scale;
        }
    }
}

/// Colour and scale a button shows for `interaction`.
pub fn button_look(tint: &ButtonTint, interaction: Interaction) -> (Color, f32) {
    match interaction {
        Interaction::Pressed => (tint.hover, PRESSED_SCALE),
        Interaction::Hovered => (tint.hover, tint.hover_scale),
        Interaction::None => (tint.idle, 1.0),
    }
}

pub fn tint_buttons(
    mut buttons: Query<
        (&Interaction, &ButtonTint, &mut BackgroundColor, &mut Transform),
        Changed<Interaction>,
    >,
) {
    for (interaction, tint, mut bg, mut transform) in buttons.iter_mut() {
        let (color, scale) = button_look(tint, *interaction);
        bg.0 = color;
        transform.scale = Vec3::splat(scale);
    }
}
