//! WILL YOU BE MY VALENTINE?
//! (the No button is shy)

use bevy::prelude::*;
use valentine::ValentinePlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Will you be my Valentine?".into(),
                resolution: (1024.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(ValentinePlugin::default())
        .run();
}
