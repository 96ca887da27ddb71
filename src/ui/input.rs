use egui::{Context, Key};

use trackside::{PlaybackCommand, replay::clock::SPEED_PRESETS};

pub(crate) fn command_for_key(key: Key) -> Option<PlaybackCommand> {
    let command = match key {
        Key::Space => PlaybackCommand::TogglePause,
        Key::ArrowLeft => PlaybackCommand::Rewind,
        Key::ArrowRight => PlaybackCommand::FastForward,
        Key::ArrowUp => PlaybackCommand::IncreaseSpeed,
        Key::ArrowDown => PlaybackCommand::DecreaseSpeed,
        Key::R => PlaybackCommand::Restart,
        Key::Num1 => PlaybackCommand::SetSpeed(SPEED_PRESETS[0]),
        Key::Num2 => PlaybackCommand::SetSpeed(SPEED_PRESETS[1]),
        Key::Num3 => PlaybackCommand::SetSpeed(SPEED_PRESETS[2]),
        Key::Num4 => PlaybackCommand::SetSpeed(SPEED_PRESETS[3]),
        _ => return None,
    };
    Some(command)
}

/// Commands for the keys pressed since the last frame, in press order.
pub(crate) fn pressed_commands(ctx: &Context) -> Vec<PlaybackCommand> {
    ctx.input(|i| {
        i.events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    ..
                } => command_for_key(*key),
                _ => None,
            })
            .collect()
    })
}
