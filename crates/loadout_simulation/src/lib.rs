//! LOADOUT Simulation Core
//!
//! ECS-ядро weapon-системы на Bevy 0.16: carry-список, animation-gated
//! переключение оружия, fire/reload/aim input и репликация.
//!
//! HYBRID ARCHITECTURE:
//! - ECS = strategic layer (weapon state machine, gates, identity)
//! - Host engine = tactical layer (анимации, звук, сцена, транспорт)
//!
//! Границы к host-у узкие: `SequencePlayer`, `AudioSystem`,
//! `RemoteWeaponAgent` traits + `MountPointRegistry`, а обратно — named
//! completion markers и outbound events.

use bevy::prelude::*;

// Публичные модули
pub mod audio;
pub mod error;
pub mod logger;
pub mod manager;
pub mod mounts;
pub mod remote;
pub mod timeline;
pub mod weapon;

// Re-export основных типов для удобства
pub use audio::{AudioSystem, CueHandle, CueQueue, EffectConfig};
pub use error::WeaponError;
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel};
pub use manager::events::*;
pub use manager::systems::{WeaponAgent, WeaponSystemPlugin};
pub use manager::{WeaponManager, WeaponManagerState, WeaponNotification};
pub use mounts::{MountPointRegistry, MountTarget};
pub use remote::{RemoteCallQueue, RemoteWeaponAgent, RemoteWeaponCall};
pub use timeline::{
    CompletionSignal, MarkerAction, MarkerBus, SequencePlayer, SequenceQueue, SequenceRef,
};
pub use weapon::data::{
    WeaponConfigData, WeaponData, WeaponDataKind, WeaponId, WeaponRuntimeData, WeaponUsingStatus,
};
pub use weapon::templates::{WeaponTemplate, WeaponTemplates};
pub use weapon::{HostQueues, Weapon, WeaponArchetype, WeaponContext};

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app() -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins);
    app
}
