//! Weapon system implementations
//!
//! # Systems
//!
//! **Inbound:**
//! - `process_sequence_markers` — completion markers от animation engine
//! - `process_inbound_remote_calls` — реплицированные вызовы от peer-ов
//! - `process_put_out_intents` / `process_put_in_intents` — async переключение
//! - `process_trigger_intents` / `process_reload_intents` / `process_aim_intents` — input edges
//! - `process_gate_intents` — capability gates
//!
//! **Tick / outbound:**
//! - `apply_weapon_updates` — per-frame tick текущего оружия
//! - `drain_host_queues` — очереди collaborator-ов + notifications → outbound events

use bevy::prelude::*;

use crate::logger::{log_error, log_warning};
use crate::manager::events::*;
use crate::manager::{WeaponManager, WeaponNotification};
use crate::mounts::MountPointRegistry;
use crate::weapon::HostQueues;

// ============================================================================
// Agent component
// ============================================================================

/// Агент с weapon-системой: core manager + queue-backed collaborators
#[derive(Component)]
pub struct WeaponAgent {
    pub manager: WeaponManager,
    pub host: HostQueues,
    pub mounts: MountPointRegistry,
}

impl WeaponAgent {
    pub fn new(is_local: bool, mounts: MountPointRegistry) -> Self {
        Self {
            manager: WeaponManager::new(is_local),
            host: HostQueues::default(),
            mounts,
        }
    }
}

// ============================================================================
// Inbound: markers / remote calls
// ============================================================================

/// Process completion markers от animation engine
pub fn process_sequence_markers(
    mut events: EventReader<SequenceMarker>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for event in events.read() {
        let Ok(mut agent) = agents.get_mut(event.entity) else {
            log_error(&format!("Entity {:?} missing WeaponAgent", event.entity));
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        manager.handle_marker(&event.marker, &mut host.ctx(mounts));
    }
}

/// Process входящих реплицированных вызовов
pub fn process_inbound_remote_calls(
    mut events: EventReader<InboundRemoteCall>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for event in events.read() {
        let Ok(mut agent) = agents.get_mut(event.entity) else {
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        if let Err(e) = manager.apply_remote_call(event.call.clone(), &mut host.ctx(mounts)) {
            log_warning(&format!(
                "⚠️ remote call {:?} rejected: {e}",
                event.call
            ));
        }
    }
}

// ============================================================================
// Inbound: switch intents
// ============================================================================

/// Process put-out intents (async equip)
pub fn process_put_out_intents(
    mut events: EventReader<PutOutIntent>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for intent in events.read() {
        let Ok(mut agent) = agents.get_mut(intent.entity) else {
            log_error(&format!("Entity {:?} missing WeaponAgent", intent.entity));
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        let result = match &intent.target {
            WeaponTarget::Index(index) => manager.begin_put_out(*index, &mut host.ctx(mounts)),
            WeaponTarget::Id(id) => manager.begin_put_out_by_id(id, &mut host.ctx(mounts)),
        };

        if let Err(e) = result {
            match e {
                // Race-prone input timing: деградация до warning + no-op
                crate::error::WeaponError::AlreadyEquipped(_)
                | crate::error::WeaponError::Busy(_) => {
                    log_warning(&format!("⚠️ put-out skipped: {e}"));
                }
                other => log_error(&format!("put-out failed: {other}")),
            }
        }
    }
}

/// Process put-in intents (async unequip)
pub fn process_put_in_intents(
    mut events: EventReader<PutInIntent>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for intent in events.read() {
        let Ok(mut agent) = agents.get_mut(intent.entity) else {
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        if let Err(e) = manager.begin_put_in(&mut host.ctx(mounts)) {
            log_warning(&format!("⚠️ put-in skipped: {e}"));
        }
    }
}

// ============================================================================
// Inbound: input edges
// ============================================================================

/// Process trigger edges
pub fn process_trigger_intents(
    mut events: EventReader<TriggerIntent>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for intent in events.read() {
        let Ok(mut agent) = agents.get_mut(intent.entity) else {
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        if intent.pressed {
            manager.trigger_down(&mut host.ctx(mounts));
        } else {
            manager.trigger_up(&mut host.ctx(mounts));
        }
    }
}

/// Process reload edges
pub fn process_reload_intents(
    mut events: EventReader<ReloadIntent>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for intent in events.read() {
        let Ok(mut agent) = agents.get_mut(intent.entity) else {
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        if intent.pressed {
            manager.reload_down(&mut host.ctx(mounts));
        } else {
            manager.reload_up(&mut host.ctx(mounts));
        }
    }
}

/// Process aim edges
pub fn process_aim_intents(
    mut events: EventReader<AimIntent>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for intent in events.read() {
        let Ok(mut agent) = agents.get_mut(intent.entity) else {
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        if intent.pressed {
            manager.aim_down(&mut host.ctx(mounts));
        } else {
            manager.aim_up(&mut host.ctx(mounts));
        }
    }
}

/// Process gate toggles (стан, cutscene, safe zones)
pub fn process_gate_intents(
    mut events: EventReader<SetGateIntent>,
    mut agents: Query<&mut WeaponAgent>,
) {
    for intent in events.read() {
        let Ok(mut agent) = agents.get_mut(intent.entity) else {
            continue;
        };

        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        let mut ctx = host.ctx(mounts);
        match intent.gate {
            CapabilityGate::Shoot => manager.set_can_shoot(intent.enabled, &mut ctx),
            CapabilityGate::Aim => manager.set_can_aim(intent.enabled, &mut ctx),
            CapabilityGate::Reload => manager.set_can_reload(intent.enabled, &mut ctx),
        }
    }
}

// ============================================================================
// Tick / outbound drain
// ============================================================================

/// Per-frame tick manager-а (форвардится текущему оружию)
pub fn apply_weapon_updates(time: Res<Time>, mut agents: Query<&mut WeaponAgent>) {
    for mut agent in agents.iter_mut() {
        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut *agent;
        manager.update(time.delta_secs(), &mut host.ctx(mounts));
    }
}

/// Дренаж очередей collaborator-ов и notifications в outbound events
pub fn drain_host_queues(
    mut agents: Query<(Entity, &mut WeaponAgent)>,
    mut sequence_events: EventWriter<SequencePlayRequest>,
    mut audio_events: EventWriter<AudioCueRequest>,
    mut remote_events: EventWriter<OutboundRemoteCall>,
    mut equipped_events: EventWriter<WeaponEquipped>,
    mut holstered_events: EventWriter<WeaponHolstered>,
) {
    for (entity, mut agent) in agents.iter_mut() {
        for sequence in agent.host.sequences.requested.drain(..) {
            sequence_events.write(SequencePlayRequest { entity, sequence });
        }
        for handle in agent.host.audio.played.drain(..) {
            audio_events.write(AudioCueRequest { entity, handle });
        }
        for (weapon_index, call) in agent.host.remote.calls.drain(..) {
            remote_events.write(OutboundRemoteCall {
                entity,
                weapon_index,
                call,
            });
        }

        for notification in agent.manager.drain_notifications() {
            match notification {
                WeaponNotification::Equipped { index, id, mount } => {
                    equipped_events.write(WeaponEquipped {
                        entity,
                        index,
                        id,
                        mount,
                    });
                }
                WeaponNotification::Holstered { id } => {
                    holstered_events.write(WeaponHolstered { entity, id });
                }
                // Initialize-пара интересна только локальным подписчикам manager-а
                WeaponNotification::InitializeStarted
                | WeaponNotification::InitializeFinished => {}
            }
        }
    }
}

// ============================================================================
// Plugin
// ============================================================================

/// Weapon system plugin (carry-список + переключение + input forwarding)
pub struct WeaponSystemPlugin;

impl Plugin for WeaponSystemPlugin {
    fn build(&self, app: &mut App) {
        app
            // Inbound events
            .add_event::<PutOutIntent>()
            .add_event::<PutInIntent>()
            .add_event::<TriggerIntent>()
            .add_event::<ReloadIntent>()
            .add_event::<AimIntent>()
            .add_event::<SetGateIntent>()
            .add_event::<SequenceMarker>()
            .add_event::<InboundRemoteCall>()
            // Outbound events
            .add_event::<SequencePlayRequest>()
            .add_event::<AudioCueRequest>()
            .add_event::<OutboundRemoteCall>()
            .add_event::<WeaponEquipped>()
            .add_event::<WeaponHolstered>()
            // Каталог пресетов
            .init_resource::<crate::weapon::templates::WeaponTemplates>()
            // Systems: markers/remote до intents, drain строго последним
            .add_systems(
                Update,
                (
                    process_sequence_markers,
                    process_inbound_remote_calls,
                    process_put_out_intents,
                    process_put_in_intents,
                    process_trigger_intents,
                    process_reload_intents,
                    process_aim_intents,
                    process_gate_intents,
                    apply_weapon_updates,
                    drain_host_queues,
                )
                    .chain(),
            );
    }
}
