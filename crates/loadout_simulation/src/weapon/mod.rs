//! Weapon — один носимый item с lifecycle callbacks
//!
//! # State machine
//!
//! Uninitialized → Background ⇄ Using, причём Using достижим только через
//! put-out переход, Background обратно — только через put-in. Оба перехода
//! gated анимацией: completion marker от host-а удовлетворяет one-shot
//! сигнал оружия, manager завершает переход.
//!
//! # Archetypes
//!
//! Вместо открытой иерархии подклассов (и runtime downcast-ов) — закрытый
//! набор `WeaponArchetype` с match-dispatch в fire-хуках: Hitscan, Projectile,
//! Melee. Melee игнорирует ammo/reload.

use crate::audio::{AudioSystem, CueHandle};
use crate::error::WeaponError;
use crate::logger::{log, log_warning};
use crate::mounts::{MountPointRegistry, MountTarget};
use crate::remote::RemoteWeaponAgent;
use crate::timeline::{CompletionSignal, MarkerAction, MarkerBus, SequencePlayer};

pub mod data;
pub mod templates;

use data::{WeaponConfigData, WeaponId, WeaponRuntimeData, WeaponUsingStatus};

// ============================================================================
// Collaborator context
// ============================================================================

/// Узкие интерфейсы host-а, передаются в операции по ссылке
///
/// Core никогда не владеет collaborator-ами: playback, audio, сеть и сцена —
/// забота host-а. Всё, что core делает — вызовы через эти trait-объекты.
pub struct WeaponContext<'a> {
    pub sequences: &'a mut dyn SequencePlayer,
    pub audio: &'a mut dyn AudioSystem,
    pub remote: &'a mut dyn RemoteWeaponAgent,
    pub mounts: &'a MountPointRegistry,
}

/// Queue-backed bundle collaborator-ов (ECS-слой дренирует, тесты читают)
#[derive(Debug, Default)]
pub struct HostQueues {
    pub sequences: crate::timeline::SequenceQueue,
    pub audio: crate::audio::CueQueue,
    pub remote: crate::remote::RemoteCallQueue,
}

impl HostQueues {
    /// Собрать `WeaponContext` поверх очередей
    pub fn ctx<'a>(&'a mut self, mounts: &'a MountPointRegistry) -> WeaponContext<'a> {
        WeaponContext {
            sequences: &mut self.sequences,
            audio: &mut self.audio,
            remote: &mut self.remote,
            mounts,
        }
    }
}

// ============================================================================
// Archetype
// ============================================================================

/// Закрытый набор weapon-вариантов (общий capability set, без downcast-ов)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeaponArchetype {
    /// Мгновенное попадание (пистолеты, винтовки)
    Hitscan,
    /// Снаряд со скоростью полёта (гранатомёты, луки)
    Projectile,
    /// Ближний бой — без ammo и reload
    Melee,
}

// ============================================================================
// Weapon
// ============================================================================

/// Одно носимое оружие: config + runtime data + transition signals
///
/// Identity — `id` из config. `index` переназначается manager-ом при каждой
/// мутации carry-списка и НЕ является identity.
#[derive(Debug)]
pub struct Weapon {
    /// Позиция в carry-списке владеющего manager-а
    index: usize,

    archetype: WeaponArchetype,

    /// Immutable на всё время жизни оружия
    config: WeaponConfigData,

    /// Выводится из config при on_initialize (None = Uninitialized)
    runtime: Option<WeaponRuntimeData>,

    /// One-shot сигналы переходов (replace-after-consume)
    put_out_signal: CompletionSignal,
    put_in_signal: CompletionSignal,

    /// Audio cues, забинденные при инициализации (marker → handle)
    cues: Vec<(String, CueHandle)>,
}

impl Weapon {
    pub fn new(config: WeaponConfigData, archetype: WeaponArchetype) -> Self {
        Self {
            index: 0,
            archetype,
            config,
            runtime: None,
            put_out_signal: CompletionSignal::new(),
            put_in_signal: CompletionSignal::new(),
            cues: Vec::new(),
        }
    }

    pub fn id(&self) -> &WeaponId {
        &self.config.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn archetype(&self) -> WeaponArchetype {
        self.archetype
    }

    pub fn config_data(&self) -> &WeaponConfigData {
        &self.config
    }

    pub fn runtime_data(&self) -> Option<&WeaponRuntimeData> {
        self.runtime.as_ref()
    }

    pub fn runtime_data_mut(&mut self) -> Option<&mut WeaponRuntimeData> {
        self.runtime.as_mut()
    }

    /// None = ещё не инициализировано
    pub fn using_status(&self) -> Option<WeaponUsingStatus> {
        self.runtime.as_ref().map(|rt| rt.using_status)
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime.is_some()
    }

    pub(crate) fn put_out_signal_mut(&mut self) -> &mut CompletionSignal {
        &mut self.put_out_signal
    }

    pub(crate) fn put_in_signal_mut(&mut self) -> &mut CompletionSignal {
        &mut self.put_in_signal
    }

    // ========================================================================
    // Lifecycle callbacks
    // ========================================================================

    /// Инициализация: config → runtime data, status Background, bind audio cues.
    /// Вызывается ровно один раз (повторный вызов — InvalidState).
    pub fn on_initialize(
        &mut self,
        markers: &mut MarkerBus,
        ctx: &mut WeaponContext,
    ) -> Result<(), WeaponError> {
        if self.runtime.is_some() {
            return Err(WeaponError::InvalidState(format!(
                "weapon '{}' is already initialized",
                self.config.id
            )));
        }

        self.runtime = Some(self.config.to_runtime());

        // Bind audio cues на их маркеры (живут до abandon)
        for (marker, effect) in &self.config.audio_cues {
            let handle = ctx.audio.bind(marker, effect);
            markers.register(marker.clone(), MarkerAction::PlayCue(handle));
            self.cues.push((marker.clone(), handle));
        }

        Ok(())
    }

    /// Начать equip: резолв mount point, регистрация переходных маркеров,
    /// status Using СРАЗУ, старт put-out sequence. Не ждёт анимацию
    /// (sync-вариант — replication path).
    pub fn on_put_out(
        &mut self,
        markers: &mut MarkerBus,
        ctx: &mut WeaponContext,
    ) -> Result<MountTarget, WeaponError> {
        let Some(rt) = self.runtime.as_mut() else {
            return Err(WeaponError::InvalidState(format!(
                "weapon '{}' is not initialized",
                self.config.id
            )));
        };

        // Mount резолвим до любых мутаций: NotFound не должен оставить
        // полуперехода
        let mount = ctx.mounts.resolve(&self.config.mount_point)?.clone();

        markers.register(
            self.config.finish_put_out_marker.clone(),
            MarkerAction::FinishPutOut(self.config.id.clone()),
        );
        markers.register(
            self.config.finish_put_in_marker.clone(),
            MarkerAction::FinishPutIn(self.config.id.clone()),
        );

        rt.using_status = WeaponUsingStatus::Using;
        ctx.sequences.play(&rt.put_out_sequence);

        Ok(mount)
    }

    /// Equip-анимация доиграла: восстановить fire readiness
    pub fn on_finish_put_out(&mut self) {
        if let Some(rt) = self.runtime.as_mut() {
            rt.reloading = false;
            rt.aiming = false;
        }
    }

    /// Начать unequip: старт put-in sequence. Status остаётся Using до finish.
    pub fn on_put_in(&mut self, ctx: &mut WeaponContext) -> Result<(), WeaponError> {
        let Some(rt) = self.runtime.as_ref() else {
            return Err(WeaponError::InvalidState(format!(
                "weapon '{}' is not initialized",
                self.config.id
            )));
        };
        ctx.sequences.play(&rt.put_in_sequence);
        Ok(())
    }

    /// Unequip-анимация доиграла: status Background, переходные маркеры сняты
    pub fn on_finish_put_in(&mut self, markers: &mut MarkerBus) {
        if let Some(rt) = self.runtime.as_mut() {
            rt.using_status = WeaponUsingStatus::Background;
            rt.aiming = false;
            if rt.reloading {
                rt.reloading = false;
                markers.unregister(
                    &self.config.finish_reload_marker,
                    &MarkerAction::FinishReload(self.config.id.clone()),
                );
            }
        }

        markers.unregister(
            &self.config.finish_put_out_marker,
            &MarkerAction::FinishPutOut(self.config.id.clone()),
        );
        markers.unregister(
            &self.config.finish_put_in_marker,
            &MarkerAction::FinishPutIn(self.config.id.clone()),
        );
    }

    /// Убрано из carry-списка: status Abandoned, все подписки сняты,
    /// callbacks больше не приходят
    pub fn on_abandon(&mut self, markers: &mut MarkerBus) {
        for (marker, handle) in self.cues.drain(..) {
            markers.unregister(&marker, &MarkerAction::PlayCue(handle));
        }
        markers.unregister_weapon(&self.config.id);

        if let Some(rt) = self.runtime.as_mut() {
            rt.using_status = WeaponUsingStatus::Abandoned;
        }
    }

    // ========================================================================
    // Fire / reload / aim hooks (archetype dispatch)
    // ========================================================================

    pub fn on_trigger_down(&mut self, ctx: &mut WeaponContext) {
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };

        match self.archetype {
            WeaponArchetype::Melee => {
                // Melee: просто swing, без ammo
                ctx.sequences.play(&rt.fire_sequence);
            }
            WeaponArchetype::Hitscan | WeaponArchetype::Projectile => {
                if rt.reloading {
                    log(&format!("🔫 '{}': trigger during reload ignored", self.config.id));
                    return;
                }
                if rt.ammo == 0 {
                    log(&format!("🔫 '{}': magazine empty", self.config.id));
                    return;
                }
                rt.ammo -= 1;
                ctx.sequences.play(&rt.fire_sequence);
            }
        }
    }

    /// Базовый hook — no-op (автоматический огонь останавливает host
    /// по отсутствию новых fire sequences)
    pub fn on_trigger_up(&mut self, _ctx: &mut WeaponContext) {}

    pub fn on_reload_down(&mut self, markers: &mut MarkerBus, ctx: &mut WeaponContext) {
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };

        if matches!(self.archetype, WeaponArchetype::Melee) {
            log(&format!("'{}': melee weapon, reload ignored", self.config.id));
            return;
        }
        if rt.reloading {
            return;
        }
        if rt.ammo == rt.magazine_size {
            log(&format!("'{}': magazine already full", self.config.id));
            return;
        }

        rt.reloading = true;
        markers.register(
            self.config.finish_reload_marker.clone(),
            MarkerAction::FinishReload(self.config.id.clone()),
        );
        ctx.sequences.play(&rt.reload_sequence);
    }

    /// Базовый hook — no-op (shotgun-style прерывание перезарядки — вариант
    /// поверх этого hook-а)
    pub fn on_reload_up(&mut self, _ctx: &mut WeaponContext) {}

    pub fn on_aim_down(&mut self, _ctx: &mut WeaponContext) {
        if let Some(rt) = self.runtime.as_mut() {
            rt.aiming = true;
        }
    }

    pub fn on_aim_up(&mut self, _ctx: &mut WeaponContext) {
        if let Some(rt) = self.runtime.as_mut() {
            rt.aiming = false;
        }
    }

    /// Reload-анимация доиграла: полный магазин, подписка снята
    pub fn finish_reload(&mut self, markers: &mut MarkerBus) {
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };
        if !rt.reloading {
            log_warning(&format!(
                "'{}': finish-reload marker without reload in progress",
                self.config.id
            ));
            return;
        }
        rt.ammo = rt.magazine_size;
        rt.reloading = false;
        markers.unregister(
            &self.config.finish_reload_marker,
            &MarkerAction::FinishReload(self.config.id.clone()),
        );
    }

    // ========================================================================
    // Gate-change notifications
    // ========================================================================

    pub fn on_shoot_enable_changed(&mut self, enabled: bool) {
        log(&format!("'{}': shoot gate → {}", self.config.id, enabled));
    }

    pub fn on_aim_enable_changed(&mut self, enabled: bool) {
        if !enabled {
            if let Some(rt) = self.runtime.as_mut() {
                rt.aiming = false;
            }
        }
    }

    /// Отключение reload gate отменяет перезарядку в процессе
    pub fn on_reload_enable_changed(&mut self, enabled: bool, markers: &mut MarkerBus) {
        if enabled {
            return;
        }
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };
        if rt.reloading {
            rt.reloading = false;
            markers.unregister(
                &self.config.finish_reload_marker,
                &MarkerAction::FinishReload(self.config.id.clone()),
            );
            log(&format!("'{}': reload cancelled (gate disabled)", self.config.id));
        }
    }

    /// Per-frame hook: dispatch только текущему оружию (manager::update)
    pub fn on_update(&mut self, _delta_time: f32) {}
}
