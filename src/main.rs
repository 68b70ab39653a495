use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use farmhost::config::ConfigPlugin;
use farmhost::host::HostPlugin;
use farmhost::lifecycle::LifecyclePlugin;
use farmhost::save::SavePlugin;
use farmhost::shared::*;
use farmhost::stage::StagePlugin;

const TICKS_PER_SECOND: f64 = 60.0;

/// Runs the dedicated host until it is shut down. A fatal config error
/// exits with `CONFIG_ERROR_EXIT_CODE`.
fn main() -> AppExit {
    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
            Duration::from_secs_f64(1.0 / TICKS_PER_SECOND),
        )))
        .add_plugins(LogPlugin::default())
        .add_plugins(StatesPlugin)
        // Host state
        .init_state::<HostScreen>()
        .insert_resource(HostPaths::beside_executable())
        // Events
        .add_event::<SaveLoadedEvent>()
        .add_event::<LoadFailedEvent>()
        .add_event::<ReturnedToTitleEvent>()
        // Domain plugins
        .add_plugins(ConfigPlugin)
        .add_plugins(SavePlugin)
        .add_plugins(HostPlugin)
        .add_plugins(StagePlugin)
        .add_plugins(LifecyclePlugin)
        .run()
}
