//! WeaponData — Config/Runtime варианты данных одного оружия
//!
//! # Архитектура
//!
//! **WeaponConfigData** — authoring-time blueprint (immutable после attach
//! к живому Weapon): id, sequence refs, marker имена, mount point, audio cues.
//!
//! **WeaponRuntimeData** — mutable runtime state, выводится из config через
//! `to_runtime` ровно один раз при инициализации: using status, ammo,
//! reload/aim флаги.
//!
//! Конверсия односторонняя: Config → Runtime. `to_runtime` на Runtime —
//! `InvalidState`. Deep copy всегда успешен и не делит mutable state
//! с оригиналом.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::audio::EffectConfig;
use crate::error::WeaponError;
use crate::timeline::SequenceRef;

// ============================================================================
// WeaponId
// ============================================================================

/// Уникальный string id оружия
///
/// # Examples
/// - "pistol_basic"
/// - "rifle_basic"
/// - "blade"
#[derive(Clone, Debug, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub struct WeaponId(pub String);

impl From<&str> for WeaponId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for WeaponId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Using status
// ============================================================================

/// Статус использования оружия
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum WeaponUsingStatus {
    /// Оружие сейчас в руках
    Using,
    /// Оружие носится manager-ом, но не в руках
    Background,
    /// Оружие не принадлежит ни одному manager-у, callbacks больше не приходят
    Abandoned,
}

/// Тип WeaponData (какие операции легальны)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum WeaponDataKind {
    /// Authoring-time config
    Config,
    /// Runtime state для weapon-системы
    Runtime,
}

// ============================================================================
// Config data
// ============================================================================

/// Authoring-time данные оружия (blueprint)
///
/// `id` настраивается при авторинге; после attach к живому Weapon данные
/// эффективно read-only (Weapon отдаёт только `&WeaponConfigData`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponConfigData {
    pub id: WeaponId,

    // === Sequences ===
    /// Timeline при put-out (equip)
    pub put_out_sequence: SequenceRef,
    /// Timeline при put-in (unequip)
    pub put_in_sequence: SequenceRef,
    /// Timeline выстрела
    pub fire_sequence: SequenceRef,
    /// Timeline перезарядки
    pub reload_sequence: SequenceRef,

    // === Completion markers ===
    /// Marker окончания put-out анимации
    pub finish_put_out_marker: String,
    /// Marker окончания put-in анимации
    pub finish_put_in_marker: String,
    /// Marker окончания reload анимации
    pub finish_reload_marker: String,

    /// Имя mount point для визуального instance
    pub mount_point: String,

    /// Ёмкость магазина (0 для melee)
    pub magazine_size: u32,

    /// Audio cues: marker → effect, биндятся при инициализации оружия
    pub audio_cues: Vec<(String, EffectConfig)>,
}

impl WeaponConfigData {
    /// Вывести runtime data из config (полный магазин, Background, без флагов)
    pub fn to_runtime(&self) -> WeaponRuntimeData {
        WeaponRuntimeData {
            id: self.id.clone(),
            put_out_sequence: self.put_out_sequence.clone(),
            put_in_sequence: self.put_in_sequence.clone(),
            fire_sequence: self.fire_sequence.clone(),
            reload_sequence: self.reload_sequence.clone(),
            using_status: WeaponUsingStatus::Background,
            ammo: self.magazine_size,
            magazine_size: self.magazine_size,
            reloading: false,
            aiming: false,
        }
    }
}

// ============================================================================
// Runtime data
// ============================================================================

/// Runtime state оружия (mutable, serde-ready для снапшотов/сейвов)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponRuntimeData {
    pub id: WeaponId,

    pub put_out_sequence: SequenceRef,
    pub put_in_sequence: SequenceRef,
    pub fire_sequence: SequenceRef,
    pub reload_sequence: SequenceRef,

    /// Текущий using status
    pub using_status: WeaponUsingStatus,

    /// Патроны в магазине
    pub ammo: u32,
    pub magazine_size: u32,

    /// Идёт перезарядка (сбрасывается marker-ом или отключением gate-а)
    pub reloading: bool,
    /// Прицеливание активно
    pub aiming: bool,
}

// ============================================================================
// WeaponData (унифицированный view)
// ============================================================================

/// WeaponData: закрытый набор из двух вариантов
#[derive(Clone, Debug, PartialEq)]
pub enum WeaponData {
    Config(WeaponConfigData),
    Runtime(WeaponRuntimeData),
}

impl WeaponData {
    pub fn id(&self) -> &WeaponId {
        match self {
            WeaponData::Config(config) => &config.id,
            WeaponData::Runtime(runtime) => &runtime.id,
        }
    }

    pub fn kind(&self) -> WeaponDataKind {
        match self {
            WeaponData::Config(_) => WeaponDataKind::Config,
            WeaponData::Runtime(_) => WeaponDataKind::Runtime,
        }
    }

    /// Независимая полная копия (Config-копии не делят mutable state)
    pub fn deep_copy(&self) -> WeaponData {
        self.clone()
    }

    /// Конверсия Config → Runtime. На Runtime-варианте — `InvalidState`.
    pub fn to_runtime(&self) -> Result<WeaponData, WeaponError> {
        match self {
            WeaponData::Config(config) => Ok(WeaponData::Runtime(config.to_runtime())),
            WeaponData::Runtime(_) => Err(WeaponError::InvalidState(
                "weapon data is already runtime data".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pistol_config() -> WeaponConfigData {
        WeaponConfigData {
            id: "pistol_basic".into(),
            put_out_sequence: "pistol/put_out".into(),
            put_in_sequence: "pistol/put_in".into(),
            fire_sequence: "pistol/fire".into(),
            reload_sequence: "pistol/reload".into(),
            finish_put_out_marker: "pistol/finish_put_out".into(),
            finish_put_in_marker: "pistol/finish_put_in".into(),
            finish_reload_marker: "pistol/finish_reload".into(),
            mount_point: "right_hand".into(),
            magazine_size: 12,
            audio_cues: vec![("pistol/finish_put_out".into(), EffectConfig::new("draw_click"))],
        }
    }

    #[test]
    fn test_to_runtime_from_config() {
        let data = WeaponData::Config(pistol_config());
        assert_eq!(data.kind(), WeaponDataKind::Config);

        let runtime = data.to_runtime().unwrap();
        assert_eq!(runtime.kind(), WeaponDataKind::Runtime);
        // id сохраняется при конверсии
        assert_eq!(runtime.id(), data.id());

        let WeaponData::Runtime(rt) = runtime else {
            panic!("expected runtime variant");
        };
        assert_eq!(rt.using_status, WeaponUsingStatus::Background);
        assert_eq!(rt.ammo, 12);
        assert!(!rt.reloading);
        assert!(!rt.aiming);
    }

    #[test]
    fn test_to_runtime_on_runtime_fails() {
        let runtime = WeaponData::Config(pistol_config()).to_runtime().unwrap();
        let err = runtime.to_runtime().unwrap_err();
        assert!(matches!(err, WeaponError::InvalidState(_)));
    }

    #[test]
    fn test_runtime_data_serialization_round_trip() {
        let mut rt = pistol_config().to_runtime();
        // Потрёпанное состояние, не свежий to_runtime
        rt.ammo = 4;
        rt.reloading = true;
        rt.aiming = true;
        rt.using_status = WeaponUsingStatus::Using;

        let json = serde_json::to_string(&rt).unwrap();
        let restored: WeaponRuntimeData = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, rt);
        assert_eq!(restored.ammo, 4);
        assert_eq!(restored.using_status, WeaponUsingStatus::Using);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let original = WeaponData::Config(pistol_config());
        let copy = original.deep_copy();
        assert_eq!(original, copy);

        // Мутация копии не трогает оригинал
        let WeaponData::Config(mut config) = copy else {
            panic!("expected config variant");
        };
        config.id = "pistol_mk2".into();
        config.magazine_size = 15;

        assert_eq!(original.id(), &WeaponId::from("pistol_basic"));
        let WeaponData::Config(orig) = &original else {
            panic!("expected config variant");
        };
        assert_eq!(orig.magazine_size, 12);
    }
}
