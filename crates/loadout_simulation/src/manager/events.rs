//! Weapon system events
//!
//! # Architecture
//!
//! **Inbound (host/input → core):**
//! - `PutOutIntent` / `PutInIntent` → начать async equip/unequip
//! - `TriggerIntent` / `ReloadIntent` / `AimIntent` → input edges (pressed/released)
//! - `SetGateIntent` → host включает/выключает capability gate
//! - `SequenceMarker` → completion marker от animation engine
//! - `InboundRemoteCall` → реплицированный вызов от сетевого peer-а
//!
//! **Outbound (core → host):**
//! - `SequencePlayRequest` → host проигрывает timeline sequence
//! - `AudioCueRequest` → host проигрывает привязанный cue
//! - `OutboundRemoteCall` → host шлёт вызов на remote peer-ов
//! - `WeaponEquipped` / `WeaponHolstered` → attach/detach визуала

use bevy::prelude::*;

use crate::audio::CueHandle;
use crate::mounts::MountTarget;
use crate::remote::RemoteWeaponCall;
use crate::timeline::SequenceRef;
use crate::weapon::data::WeaponId;

// ============================================================================
// Addressing
// ============================================================================

/// Адресация оружия в intent-ах: по слоту или по identity
#[derive(Clone, Debug)]
pub enum WeaponTarget {
    Index(usize),
    Id(WeaponId),
}

/// Какой capability gate переключает SetGateIntent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityGate {
    Shoot,
    Aim,
    Reload,
}

// ============================================================================
// Inbound intents
// ============================================================================

/// Начать async equip оружия
///
/// # Flow
/// 1. Если другое оружие в руках → PuttingIn, цель отложена
/// 2. PuttingOut, играет put-out sequence
/// 3. Finish-put-out marker → Ready + WeaponEquipped
#[derive(Event, Clone, Debug)]
pub struct PutOutIntent {
    pub entity: Entity,
    pub target: WeaponTarget,
}

/// Начать async unequip текущего оружия
#[derive(Event, Clone, Debug)]
pub struct PutInIntent {
    pub entity: Entity,
}

/// Trigger edge (pressed = down, released = up)
#[derive(Event, Clone, Debug)]
pub struct TriggerIntent {
    pub entity: Entity,
    pub pressed: bool,
}

/// Reload edge
#[derive(Event, Clone, Debug)]
pub struct ReloadIntent {
    pub entity: Entity,
    pub pressed: bool,
}

/// Aim edge
#[derive(Event, Clone, Debug)]
pub struct AimIntent {
    pub entity: Entity,
    pub pressed: bool,
}

/// Переключить capability gate (стан, cutscene, зоны без оружия)
#[derive(Event, Clone, Debug)]
pub struct SetGateIntent {
    pub entity: Entity,
    pub gate: CapabilityGate,
    pub enabled: bool,
}

/// Completion marker от animation/timeline engine
#[derive(Event, Clone, Debug)]
pub struct SequenceMarker {
    pub entity: Entity,
    pub marker: String,
}

/// Входящий реплицированный вызов (транспорт — забота host-а)
#[derive(Event, Clone, Debug)]
pub struct InboundRemoteCall {
    pub entity: Entity,
    pub call: RemoteWeaponCall,
}

// ============================================================================
// Outbound events
// ============================================================================

/// Host должен проиграть timeline sequence
#[derive(Event, Clone, Debug)]
pub struct SequencePlayRequest {
    pub entity: Entity,
    pub sequence: SequenceRef,
}

/// Host должен проиграть привязанный audio cue
#[derive(Event, Clone, Debug)]
pub struct AudioCueRequest {
    pub entity: Entity,
    pub handle: CueHandle,
}

/// Host должен отправить вызов на remote peer-ов
#[derive(Event, Clone, Debug)]
pub struct OutboundRemoteCall {
    pub entity: Entity,
    pub weapon_index: usize,
    pub call: RemoteWeaponCall,
}

/// Переход equip завершён: attach визуала к mount point
#[derive(Event, Clone, Debug)]
pub struct WeaponEquipped {
    pub entity: Entity,
    pub index: usize,
    pub id: WeaponId,
    pub mount: MountTarget,
}

/// Переход unequip завершён: detach визуала
#[derive(Event, Clone, Debug)]
pub struct WeaponHolstered {
    pub entity: Entity,
    pub id: WeaponId,
}
