//! WeaponManager — carry-список + state machine переключения оружия
//!
//! # State machine
//!
//! Empty → PuttingOut → Ready → PuttingIn → Empty. Переходы gated
//! анимацией: async begin-* операции ставят state и ждут completion marker
//! от host-а; sync варианты (репликация, сейвы) завершают переход немедленно.
//!
//! Пока переход в полёте, структурные мутации и новые переходы — `Busy`:
//! запрос отбрасывается, state не трогается, caller может повторить.
//!
//! # Identity
//!
//! Текущее оружие трекается по id, не по индексу: insert/remove других
//! слотов не меняет "что у меня в руках". Индексы переназначаются после
//! каждой мутации carry-списка.

use crate::error::WeaponError;
use crate::logger::{log, log_warning};
use crate::mounts::MountTarget;
use crate::remote::RemoteWeaponCall;
use crate::timeline::{MarkerAction, MarkerBus};
use crate::weapon::data::{WeaponId, WeaponUsingStatus};
use crate::weapon::{Weapon, WeaponContext};

pub mod events;
pub mod systems;

// ============================================================================
// State / notifications
// ============================================================================

/// Состояние weapon-системы агента
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeaponManagerState {
    /// Ничего не в руках
    Empty,
    /// Equip-переход в полёте (ждём finish-put-out marker)
    PuttingOut,
    /// Unequip-переход в полёте (ждём finish-put-in marker)
    PuttingIn,
    /// Оружие в руках, fire/reload/aim доступны
    Ready,
}

/// Исходящие уведомления для host-а (visuals, HUD), дренируются ECS-слоем
#[derive(Clone, Debug, PartialEq)]
pub enum WeaponNotification {
    /// Начало инициализации оружия (attach к manager-у)
    InitializeStarted,
    /// Оружие инициализировано и готово к ношению
    InitializeFinished,
    /// Переход equip завершён: attach визуала к mount point
    Equipped {
        index: usize,
        id: WeaponId,
        mount: MountTarget,
    },
    /// Переход unequip завершён: detach визуала
    Holstered { id: WeaponId },
}

// ============================================================================
// WeaponManager
// ============================================================================

/// Carry-список оружия одного агента + state machine переключения
#[derive(Debug)]
pub struct WeaponManager {
    carry_weapons: Vec<Weapon>,

    /// Identity текущего оружия (None вне Ready/PuttingOut)
    current: Option<WeaponId>,

    /// Цель отложенного put-out: ставится когда switch начинается с put-in
    /// текущего оружия, consume-ится в finish-put-in callback-е
    pending_switch: Option<WeaponId>,

    /// Mount текущего put-out перехода (для Equipped notification на finish)
    pending_mount: Option<MountTarget>,

    state: WeaponManagerState,

    /// Completion-marker bus этого manager-а (один bus = один агент)
    markers: MarkerBus,

    /// Локально управляемый агент: принятые действия зеркалятся на remote
    is_local: bool,

    // === Capability gates (host-управляемые) ===
    can_shoot: bool,
    can_aim: bool,
    can_reload: bool,

    // === Held flags (ставятся только на ПРИНЯТЫЙ down) ===
    trigger_held: bool,
    aim_held: bool,
    reload_held: bool,

    notifications: Vec<WeaponNotification>,
}

impl WeaponManager {
    pub fn new(is_local: bool) -> Self {
        Self {
            carry_weapons: Vec::new(),
            current: None,
            pending_switch: None,
            pending_mount: None,
            state: WeaponManagerState::Empty,
            markers: MarkerBus::new(),
            is_local,
            can_shoot: true,
            can_aim: true,
            can_reload: true,
            trigger_held: false,
            aim_held: false,
            reload_held: false,
            notifications: Vec::new(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> WeaponManagerState {
        self.state
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn weapon_count(&self) -> usize {
        self.carry_weapons.len()
    }

    pub fn weapon_at(&self, index: usize) -> Option<&Weapon> {
        self.carry_weapons.get(index)
    }

    pub fn find_index(&self, id: &WeaponId) -> Option<usize> {
        self.carry_weapons.iter().position(|w| w.id() == id)
    }

    /// Индекс текущего оружия, пересчитанный от identity
    pub fn current_index(&self) -> Option<usize> {
        let id = self.current.as_ref()?;
        self.find_index(id)
    }

    pub fn current_weapon(&self) -> Option<&Weapon> {
        self.current_index().map(|i| &self.carry_weapons[i])
    }

    pub fn can_shoot(&self) -> bool {
        self.can_shoot
    }

    pub fn can_aim(&self) -> bool {
        self.can_aim
    }

    pub fn can_reload(&self) -> bool {
        self.can_reload
    }

    pub fn trigger_held(&self) -> bool {
        self.trigger_held
    }

    pub fn aim_held(&self) -> bool {
        self.aim_held
    }

    pub fn reload_held(&self) -> bool {
        self.reload_held
    }

    /// Забрать накопленные notifications (очередь очищается)
    pub fn drain_notifications(&mut self) -> Vec<WeaponNotification> {
        std::mem::take(&mut self.notifications)
    }

    fn ensure_not_busy(&self) -> Result<(), WeaponError> {
        match self.state {
            WeaponManagerState::PuttingOut | WeaponManagerState::PuttingIn => {
                Err(WeaponError::Busy(self.state))
            }
            _ => Ok(()),
        }
    }

    fn reindex(&mut self) {
        for (i, weapon) in self.carry_weapons.iter_mut().enumerate() {
            weapon.set_index(i);
        }
    }

    // ========================================================================
    // Carry-список
    // ========================================================================

    /// Добавить оружие в конец carry-списка и инициализировать его.
    /// Во время переходов — `Busy`. Возвращает индекс нового слота.
    pub fn add_weapon(
        &mut self,
        weapon: Weapon,
        ctx: &mut WeaponContext,
    ) -> Result<usize, WeaponError> {
        let at = self.carry_weapons.len();
        self.add_weapon_at(weapon, at, ctx)
    }

    /// Вставить оружие в конкретный слот (существующие сдвигаются вправо,
    /// текущее оружие переживает сдвиг по identity)
    pub fn add_weapon_at(
        &mut self,
        mut weapon: Weapon,
        at: usize,
        ctx: &mut WeaponContext,
    ) -> Result<usize, WeaponError> {
        self.ensure_not_busy()?;

        let len = self.carry_weapons.len();
        if at > len {
            return Err(WeaponError::OutOfRange { index: at, len });
        }
        if self.find_index(weapon.id()).is_some() {
            log_warning(&format!(
                "⚠️ carry list already contains weapon id '{}'",
                weapon.id()
            ));
        }

        self.notifications
            .push(WeaponNotification::InitializeStarted);

        if weapon.is_initialized() {
            // Re-adoption ранее abandoned оружия: снова носимое
            if let Some(rt) = weapon.runtime_data_mut() {
                rt.using_status = WeaponUsingStatus::Background;
            }
        } else {
            weapon.on_initialize(&mut self.markers, ctx)?;
        }

        self.carry_weapons.insert(at, weapon);
        self.reindex();
        self.notifications
            .push(WeaponNotification::InitializeFinished);

        Ok(at)
    }

    /// Убрать оружие из carry-списка. Текущее оружие убрать нельзя —
    /// сначала put-in. Возвращает abandoned Weapon (caller может выбросить
    /// в мир или передать другому manager-у).
    pub fn remove_weapon(&mut self, index: usize) -> Result<Weapon, WeaponError> {
        self.ensure_not_busy()?;

        let len = self.carry_weapons.len();
        if index >= len {
            return Err(WeaponError::OutOfRange { index, len });
        }
        if self.current_index() == Some(index) {
            return Err(WeaponError::InvalidState(format!(
                "weapon '{}' is equipped, put it in before removing",
                self.carry_weapons[index].id()
            )));
        }

        let mut weapon = self.carry_weapons.remove(index);
        weapon.on_abandon(&mut self.markers);
        self.reindex();
        Ok(weapon)
    }

    pub fn remove_weapon_by_id(&mut self, id: &WeaponId) -> Result<Weapon, WeaponError> {
        let index = self
            .find_index(id)
            .ok_or_else(|| WeaponError::NotFound(id.clone()))?;
        self.remove_weapon(index)
    }

    // ========================================================================
    // Put-out (equip)
    // ========================================================================

    /// Sync equip: переход завершается немедленно, без ожидания анимации.
    /// Используется репликацией и восстановлением из сейва; уже equipped
    /// target — ошибка `AlreadyEquipped`.
    pub fn put_out(&mut self, index: usize, ctx: &mut WeaponContext) -> Result<(), WeaponError> {
        self.put_out_inner(index, ctx, true)
    }

    pub fn put_out_by_id(
        &mut self,
        id: &WeaponId,
        ctx: &mut WeaponContext,
    ) -> Result<(), WeaponError> {
        let index = self
            .find_index(id)
            .ok_or_else(|| WeaponError::NotFound(id.clone()))?;
        self.put_out_inner(index, ctx, true)
    }

    /// Equip по ссылке на Weapon: identity-проверка принадлежности
    pub fn put_out_weapon(
        &mut self,
        weapon: &Weapon,
        ctx: &mut WeaponContext,
    ) -> Result<(), WeaponError> {
        let index = self
            .find_index(weapon.id())
            .ok_or_else(|| WeaponError::NotCarried(weapon.id().clone()))?;
        self.put_out_inner(index, ctx, true)
    }

    fn put_out_inner(
        &mut self,
        index: usize,
        ctx: &mut WeaponContext,
        replicate: bool,
    ) -> Result<(), WeaponError> {
        self.ensure_not_busy()?;

        let len = self.carry_weapons.len();
        if index >= len {
            return Err(WeaponError::OutOfRange { index, len });
        }
        let target_id = self.carry_weapons[index].id().clone();
        if self.current.as_ref() == Some(&target_id) {
            return Err(WeaponError::AlreadyEquipped(target_id));
        }

        // Mount резолвим ДО убирания текущего оружия: fail-fast без полуперехода
        ctx.mounts
            .resolve(&self.carry_weapons[index].config_data().mount_point)?;

        // Убрать текущее (sync: finish немедленно)
        if let Some(cur) = self.current_index() {
            self.release_held_inputs(ctx);
            let Self {
                carry_weapons,
                markers,
                notifications,
                ..
            } = self;
            let weapon = &mut carry_weapons[cur];
            weapon.on_put_in(ctx)?;
            weapon.on_finish_put_in(markers);
            notifications.push(WeaponNotification::Holstered {
                id: weapon.id().clone(),
            });
            self.current = None;
        }

        // Достать новое (sync: finish немедленно)
        let Self {
            carry_weapons,
            markers,
            notifications,
            ..
        } = self;
        let weapon = &mut carry_weapons[index];
        let mount = weapon.on_put_out(markers, ctx)?;
        weapon.on_finish_put_out();
        notifications.push(WeaponNotification::Equipped {
            index,
            id: target_id.clone(),
            mount,
        });

        self.current = Some(target_id);
        self.state = WeaponManagerState::Ready;

        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::PutOut { index });
        }
        Ok(())
    }

    /// Async equip: переход завершается когда host поднимет completion marker.
    /// Если другое оружие в руках — сначала PuttingIn, цель достаётся после
    /// его finish-put-in (chained switch).
    pub fn begin_put_out(
        &mut self,
        index: usize,
        ctx: &mut WeaponContext,
    ) -> Result<(), WeaponError> {
        self.ensure_not_busy()?;

        let len = self.carry_weapons.len();
        if index >= len {
            return Err(WeaponError::OutOfRange { index, len });
        }
        let target_id = self.carry_weapons[index].id().clone();
        if self.current.as_ref() == Some(&target_id) {
            return Err(WeaponError::AlreadyEquipped(target_id));
        }

        ctx.mounts
            .resolve(&self.carry_weapons[index].config_data().mount_point)?;

        if self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::PutOut { index });
        }

        if let Some(cur) = self.current_index() {
            // Сначала убрать текущее; цель достаём в finish-put-in callback-е.
            // State ставим после fallible вызова — провал не оставляет Busy.
            self.release_held_inputs(ctx);
            self.carry_weapons[cur].on_put_in(ctx)?;
            self.pending_switch = Some(target_id);
            self.state = WeaponManagerState::PuttingIn;
            Ok(())
        } else {
            self.start_put_out(index, ctx)
        }
    }

    pub fn begin_put_out_by_id(
        &mut self,
        id: &WeaponId,
        ctx: &mut WeaponContext,
    ) -> Result<(), WeaponError> {
        let index = self
            .find_index(id)
            .ok_or_else(|| WeaponError::NotFound(id.clone()))?;
        self.begin_put_out(index, ctx)
    }

    /// Общий хвост put-out перехода: status Using, sequence играет, state
    /// PuttingOut, Equipped notification отложен до finish-marker-а
    fn start_put_out(&mut self, index: usize, ctx: &mut WeaponContext) -> Result<(), WeaponError> {
        let Self {
            carry_weapons,
            markers,
            current,
            pending_mount,
            state,
            ..
        } = self;

        let weapon = &mut carry_weapons[index];
        let mount = weapon.on_put_out(markers, ctx)?;

        *current = Some(weapon.id().clone());
        *pending_mount = Some(mount);
        *state = WeaponManagerState::PuttingOut;
        Ok(())
    }

    // ========================================================================
    // Put-in (unequip)
    // ========================================================================

    /// Sync unequip. Пустые руки — warning + no-op (не ошибка).
    pub fn put_in(&mut self, ctx: &mut WeaponContext) -> Result<(), WeaponError> {
        self.put_in_inner(ctx, true)
    }

    fn put_in_inner(
        &mut self,
        ctx: &mut WeaponContext,
        replicate: bool,
    ) -> Result<(), WeaponError> {
        self.ensure_not_busy()?;

        let Some(index) = self.current_index() else {
            log_warning("⚠️ put-in requested with no weapon equipped");
            return Ok(());
        };

        self.release_held_inputs(ctx);
        let Self {
            carry_weapons,
            markers,
            notifications,
            ..
        } = self;
        let weapon = &mut carry_weapons[index];
        weapon.on_put_in(ctx)?;
        weapon.on_finish_put_in(markers);
        notifications.push(WeaponNotification::Holstered {
            id: weapon.id().clone(),
        });

        self.current = None;
        self.state = WeaponManagerState::Empty;

        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::PutIn);
        }
        Ok(())
    }

    /// Async unequip: завершается по finish-put-in marker-у
    pub fn begin_put_in(&mut self, ctx: &mut WeaponContext) -> Result<(), WeaponError> {
        self.ensure_not_busy()?;

        let Some(index) = self.current_index() else {
            log_warning("⚠️ put-in requested with no weapon equipped");
            return Ok(());
        };

        if self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::PutIn);
        }

        self.release_held_inputs(ctx);
        self.carry_weapons[index].on_put_in(ctx)?;
        self.state = WeaponManagerState::PuttingIn;
        Ok(())
    }

    // ========================================================================
    // Completion markers
    // ========================================================================

    /// Обработать completion marker от host-а: snapshot подписок bus-а,
    /// dispatch каждого action. Маркеры вне активного перехода — warning.
    pub fn handle_marker(&mut self, marker: &str, ctx: &mut WeaponContext) {
        let actions = self.markers.raise(marker);
        for action in actions {
            match action {
                MarkerAction::PlayCue(handle) => ctx.audio.play(handle),
                MarkerAction::FinishPutOut(id) => self.finish_put_out_transition(&id),
                MarkerAction::FinishPutIn(id) => self.finish_put_in_transition(&id, ctx),
                MarkerAction::FinishReload(id) => self.finish_reload_transition(&id),
            }
        }
    }

    fn finish_put_out_transition(&mut self, id: &WeaponId) {
        if self.state != WeaponManagerState::PuttingOut || self.current.as_ref() != Some(id) {
            log_warning(&format!(
                "⚠️ finish-put-out marker for '{id}' outside an active put-out transition"
            ));
            return;
        }
        let Some(index) = self.find_index(id) else {
            log_warning(&format!("⚠️ finish-put-out marker for unknown weapon '{id}'"));
            return;
        };

        let weapon = &mut self.carry_weapons[index];
        // One-shot discipline: satisfy → consume → сигнал снова свежий
        if let Err(e) = weapon.put_out_signal_mut().satisfy() {
            log_warning(&format!("⚠️ put-out signal for '{id}': {e}"));
            return;
        }
        weapon.put_out_signal_mut().consume();
        weapon.on_finish_put_out();

        self.state = WeaponManagerState::Ready;
        if let Some(mount) = self.pending_mount.take() {
            self.notifications.push(WeaponNotification::Equipped {
                index,
                id: id.clone(),
                mount,
            });
        }
        log(&format!("🔫 weapon '{id}' equipped"));
    }

    fn finish_put_in_transition(&mut self, id: &WeaponId, ctx: &mut WeaponContext) {
        if self.state != WeaponManagerState::PuttingIn || self.current.as_ref() != Some(id) {
            log_warning(&format!(
                "⚠️ finish-put-in marker for '{id}' outside an active put-in transition"
            ));
            return;
        }
        let Some(index) = self.find_index(id) else {
            log_warning(&format!("⚠️ finish-put-in marker for unknown weapon '{id}'"));
            return;
        };

        {
            let Self {
                carry_weapons,
                markers,
                notifications,
                ..
            } = self;
            let weapon = &mut carry_weapons[index];
            if let Err(e) = weapon.put_in_signal_mut().satisfy() {
                log_warning(&format!("⚠️ put-in signal for '{id}': {e}"));
                return;
            }
            weapon.put_in_signal_mut().consume();
            weapon.on_finish_put_in(markers);
            notifications.push(WeaponNotification::Holstered { id: id.clone() });
        }
        self.current = None;
        log(&format!("🔫 weapon '{id}' holstered"));

        // Chained switch: достаём отложенную цель
        if let Some(next) = self.pending_switch.take() {
            match self.find_index(&next) {
                Some(next_index) => {
                    if let Err(e) = self.start_put_out(next_index, ctx) {
                        log_warning(&format!("⚠️ chained put-out of '{next}' failed: {e}"));
                        self.state = WeaponManagerState::Empty;
                    }
                }
                None => {
                    log_warning(&format!(
                        "⚠️ chained switch target '{next}' is no longer carried"
                    ));
                    self.state = WeaponManagerState::Empty;
                }
            }
        } else {
            self.state = WeaponManagerState::Empty;
        }
    }

    fn finish_reload_transition(&mut self, id: &WeaponId) {
        let Some(index) = self.find_index(id) else {
            log_warning(&format!("⚠️ finish-reload marker for unknown weapon '{id}'"));
            return;
        };
        let Self {
            carry_weapons,
            markers,
            ..
        } = self;
        carry_weapons[index].finish_reload(markers);
    }

    // ========================================================================
    // Fire / reload / aim input
    // ========================================================================

    pub fn trigger_down(&mut self, ctx: &mut WeaponContext) {
        self.trigger_down_inner(ctx, true);
    }

    fn trigger_down_inner(&mut self, ctx: &mut WeaponContext, replicate: bool) {
        if self.state != WeaponManagerState::Ready {
            return;
        }
        if !self.can_shoot {
            log("🔒 trigger ignored: shoot gate disabled");
            return;
        }
        let Some(index) = self.current_index() else {
            return;
        };

        self.trigger_held = true;
        self.carry_weapons[index].on_trigger_down(ctx);
        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::TriggerDown);
        }
    }

    pub fn trigger_up(&mut self, ctx: &mut WeaponContext) {
        self.trigger_up_inner(ctx, true);
    }

    fn trigger_up_inner(&mut self, ctx: &mut WeaponContext, replicate: bool) {
        // Up форвардится только если down был принят
        if !self.trigger_held {
            return;
        }
        self.trigger_held = false;
        let Some(index) = self.current_index() else {
            return;
        };
        self.carry_weapons[index].on_trigger_up(ctx);
        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::TriggerUp);
        }
    }

    pub fn reload_down(&mut self, ctx: &mut WeaponContext) {
        self.reload_down_inner(ctx, true);
    }

    fn reload_down_inner(&mut self, ctx: &mut WeaponContext, replicate: bool) {
        if self.state != WeaponManagerState::Ready {
            return;
        }
        if !self.can_reload {
            log("🔒 reload ignored: reload gate disabled");
            return;
        }
        let Some(index) = self.current_index() else {
            return;
        };

        self.reload_held = true;
        {
            let Self {
                carry_weapons,
                markers,
                ..
            } = self;
            carry_weapons[index].on_reload_down(markers, ctx);
        }
        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::ReloadDown);
        }
    }

    pub fn reload_up(&mut self, ctx: &mut WeaponContext) {
        self.reload_up_inner(ctx, true);
    }

    fn reload_up_inner(&mut self, ctx: &mut WeaponContext, replicate: bool) {
        if !self.reload_held {
            return;
        }
        self.reload_held = false;
        let Some(index) = self.current_index() else {
            return;
        };
        self.carry_weapons[index].on_reload_up(ctx);
        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::ReloadUp);
        }
    }

    pub fn aim_down(&mut self, ctx: &mut WeaponContext) {
        self.aim_down_inner(ctx, true);
    }

    fn aim_down_inner(&mut self, ctx: &mut WeaponContext, replicate: bool) {
        if self.state != WeaponManagerState::Ready {
            return;
        }
        if !self.can_aim {
            log("🔒 aim ignored: aim gate disabled");
            return;
        }
        let Some(index) = self.current_index() else {
            return;
        };

        self.aim_held = true;
        self.carry_weapons[index].on_aim_down(ctx);
        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::AimDown);
        }
    }

    pub fn aim_up(&mut self, ctx: &mut WeaponContext) {
        self.aim_up_inner(ctx, true);
    }

    fn aim_up_inner(&mut self, ctx: &mut WeaponContext, replicate: bool) {
        if !self.aim_held {
            return;
        }
        self.aim_held = false;
        let Some(index) = self.current_index() else {
            return;
        };
        self.carry_weapons[index].on_aim_up(ctx);
        if replicate && self.is_local {
            ctx.remote.invoke(index, RemoteWeaponCall::AimUp);
        }
    }

    /// Принудительно отпустить все held inputs (перед unequip / сменой)
    fn release_held_inputs(&mut self, ctx: &mut WeaponContext) {
        self.trigger_up_inner(ctx, true);
        self.reload_up_inner(ctx, true);
        self.aim_up_inner(ctx, true);
    }

    // ========================================================================
    // Capability gates
    // ========================================================================

    pub fn set_can_shoot(&mut self, enabled: bool, ctx: &mut WeaponContext) {
        if self.can_shoot == enabled {
            return;
        }
        // Отключение gate-а принудительно отпускает held input
        if !enabled {
            self.trigger_up_inner(ctx, true);
        }
        self.can_shoot = enabled;
        // Hook видит только текущее оружие; пустые руки — тихий flag-set
        if let Some(index) = self.current_index() {
            self.carry_weapons[index].on_shoot_enable_changed(enabled);
        }
    }

    pub fn set_can_aim(&mut self, enabled: bool, ctx: &mut WeaponContext) {
        if self.can_aim == enabled {
            return;
        }
        if !enabled {
            self.aim_up_inner(ctx, true);
        }
        self.can_aim = enabled;
        if let Some(index) = self.current_index() {
            self.carry_weapons[index].on_aim_enable_changed(enabled);
        }
    }

    pub fn set_can_reload(&mut self, enabled: bool, ctx: &mut WeaponContext) {
        if self.can_reload == enabled {
            return;
        }
        if !enabled {
            self.reload_up_inner(ctx, true);
        }
        self.can_reload = enabled;
        if let Some(index) = self.current_index() {
            let Self {
                carry_weapons,
                markers,
                ..
            } = self;
            carry_weapons[index].on_reload_enable_changed(enabled, markers);
        }
    }

    // ========================================================================
    // Tick / репликация
    // ========================================================================

    /// Per-frame tick: форвардится только текущему оружию
    pub fn update(&mut self, delta_time: f32, _ctx: &mut WeaponContext) {
        if let Some(index) = self.current_index() {
            self.carry_weapons[index].on_update(delta_time);
        }
    }

    /// Входящий реплицированный вызов: та же operation surface, но без
    /// re-replication (иначе эхо). Переходы — sync (remote не ждёт анимацию).
    pub fn apply_remote_call(
        &mut self,
        call: RemoteWeaponCall,
        ctx: &mut WeaponContext,
    ) -> Result<(), WeaponError> {
        match call {
            RemoteWeaponCall::PutOut { index } => self.put_out_inner(index, ctx, false),
            RemoteWeaponCall::PutIn => self.put_in_inner(ctx, false),
            RemoteWeaponCall::TriggerDown => {
                self.trigger_down_inner(ctx, false);
                Ok(())
            }
            RemoteWeaponCall::TriggerUp => {
                self.trigger_up_inner(ctx, false);
                Ok(())
            }
            RemoteWeaponCall::ReloadDown => {
                self.reload_down_inner(ctx, false);
                Ok(())
            }
            RemoteWeaponCall::ReloadUp => {
                self.reload_up_inner(ctx, false);
                Ok(())
            }
            RemoteWeaponCall::AimDown => {
                self.aim_down_inner(ctx, false);
                Ok(())
            }
            RemoteWeaponCall::AimUp => {
                self.aim_up_inner(ctx, false);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mounts::MountPointRegistry;
    use crate::weapon::templates::WeaponTemplates;
    use crate::weapon::HostQueues;

    fn fixture(is_local: bool) -> (WeaponManager, HostQueues, MountPointRegistry) {
        let mut mounts = MountPointRegistry::new();
        mounts.insert("right_hand", "%RightHandAttachment".into());
        (WeaponManager::new(is_local), HostQueues::default(), mounts)
    }

    fn add_preset(
        manager: &mut WeaponManager,
        host: &mut HostQueues,
        mounts: &MountPointRegistry,
        id: &str,
    ) -> usize {
        let templates = WeaponTemplates::default();
        let weapon = templates.get(&id.into()).unwrap().instantiate();
        manager.add_weapon(weapon, &mut host.ctx(mounts)).unwrap()
    }

    fn loaded_fixture(is_local: bool) -> (WeaponManager, HostQueues, MountPointRegistry) {
        let (mut manager, mut host, mounts) = fixture(is_local);
        add_preset(&mut manager, &mut host, &mounts, "pistol_basic");
        add_preset(&mut manager, &mut host, &mounts, "rifle_basic");
        manager.drain_notifications();
        host.remote.calls.clear();
        (manager, host, mounts)
    }

    // ========================================================================
    // Sync put-out / put-in
    // ========================================================================

    #[test]
    fn test_sync_put_out_equips_immediately() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);

        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();

        assert_eq!(manager.state(), WeaponManagerState::Ready);
        assert_eq!(manager.current_index(), Some(0));
        assert_eq!(
            manager.current_weapon().unwrap().using_status(),
            Some(WeaponUsingStatus::Using)
        );

        let notifications = manager.drain_notifications();
        assert!(matches!(
            notifications.as_slice(),
            [WeaponNotification::Equipped { index: 0, .. }]
        ));
    }

    #[test]
    fn test_sync_put_out_same_weapon_twice_fails() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();

        let err = manager.put_out(0, &mut host.ctx(&mounts)).unwrap_err();
        assert!(matches!(err, WeaponError::AlreadyEquipped(_)));
        // State не тронут
        assert_eq!(manager.state(), WeaponManagerState::Ready);
        assert_eq!(manager.current_index(), Some(0));
    }

    #[test]
    fn test_sync_switch_holsters_previous_weapon() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.drain_notifications();

        manager.put_out(1, &mut host.ctx(&mounts)).unwrap();

        assert_eq!(manager.current_index(), Some(1));
        assert_eq!(
            manager.weapon_at(0).unwrap().using_status(),
            Some(WeaponUsingStatus::Background)
        );
        assert_eq!(
            manager.weapon_at(1).unwrap().using_status(),
            Some(WeaponUsingStatus::Using)
        );

        let notifications = manager.drain_notifications();
        assert!(matches!(
            notifications.as_slice(),
            [
                WeaponNotification::Holstered { .. },
                WeaponNotification::Equipped { index: 1, .. }
            ]
        ));
    }

    #[test]
    fn test_sync_put_in_returns_to_empty() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();

        manager.put_in(&mut host.ctx(&mounts)).unwrap();

        assert_eq!(manager.state(), WeaponManagerState::Empty);
        assert_eq!(manager.current_index(), None);
        assert_eq!(
            manager.weapon_at(0).unwrap().using_status(),
            Some(WeaponUsingStatus::Background)
        );
    }

    #[test]
    fn test_put_in_with_empty_hands_is_noop() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        // Warning + no-op, не ошибка
        manager.put_in(&mut host.ctx(&mounts)).unwrap();
        assert_eq!(manager.state(), WeaponManagerState::Empty);
    }

    #[test]
    fn test_put_out_out_of_range() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        let err = manager.put_out(5, &mut host.ctx(&mounts)).unwrap_err();
        assert_eq!(err, WeaponError::OutOfRange { index: 5, len: 2 });
    }

    #[test]
    fn test_put_out_unresolvable_mount_leaves_state_untouched() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.drain_notifications();

        let empty_mounts = MountPointRegistry::new();
        let err = manager.put_out(1, &mut host.ctx(&empty_mounts)).unwrap_err();

        assert!(matches!(err, WeaponError::MountNotFound(_)));
        // Текущее оружие осталось в руках: fail-fast до put-in
        assert_eq!(manager.current_index(), Some(0));
        assert_eq!(manager.state(), WeaponManagerState::Ready);
        assert!(manager.drain_notifications().is_empty());
    }

    // ========================================================================
    // Async transitions
    // ========================================================================

    #[test]
    fn test_async_put_out_waits_for_marker() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);

        manager.begin_put_out(0, &mut host.ctx(&mounts)).unwrap();
        assert_eq!(manager.state(), WeaponManagerState::PuttingOut);
        // Equipped notification отложен до finish
        assert!(manager.drain_notifications().is_empty());

        manager.handle_marker("pistol_basic/finish_put_out", &mut host.ctx(&mounts));

        assert_eq!(manager.state(), WeaponManagerState::Ready);
        assert_eq!(manager.current_index(), Some(0));
        let notifications = manager.drain_notifications();
        assert!(matches!(
            notifications.as_slice(),
            [WeaponNotification::Equipped { index: 0, .. }]
        ));
    }

    #[test]
    fn test_busy_rejects_everything_mid_transition() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.begin_put_out(0, &mut host.ctx(&mounts)).unwrap();

        let templates = WeaponTemplates::default();
        let blade = templates.get(&"blade".into()).unwrap().instantiate();

        assert!(matches!(
            manager.add_weapon(blade, &mut host.ctx(&mounts)),
            Err(WeaponError::Busy(WeaponManagerState::PuttingOut))
        ));
        assert!(matches!(
            manager.remove_weapon(1),
            Err(WeaponError::Busy(_))
        ));
        assert!(matches!(
            manager.begin_put_out(1, &mut host.ctx(&mounts)),
            Err(WeaponError::Busy(_))
        ));
        assert!(matches!(
            manager.put_in(&mut host.ctx(&mounts)),
            Err(WeaponError::Busy(_))
        ));
    }

    #[test]
    fn test_chained_switch_put_in_then_put_out() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.drain_notifications();

        // Switch на rifle: сначала put-in пистолета
        manager.begin_put_out(1, &mut host.ctx(&mounts)).unwrap();
        assert_eq!(manager.state(), WeaponManagerState::PuttingIn);
        assert_eq!(manager.current_index(), Some(0));

        manager.handle_marker("pistol_basic/finish_put_in", &mut host.ctx(&mounts));
        assert_eq!(manager.state(), WeaponManagerState::PuttingOut);
        assert_eq!(manager.current_index(), Some(1));

        manager.handle_marker("rifle_basic/finish_put_out", &mut host.ctx(&mounts));
        assert_eq!(manager.state(), WeaponManagerState::Ready);
        assert_eq!(manager.current_index(), Some(1));

        let notifications = manager.drain_notifications();
        assert!(matches!(
            notifications.as_slice(),
            [
                WeaponNotification::Holstered { .. },
                WeaponNotification::Equipped { index: 1, .. }
            ]
        ));
    }

    #[test]
    fn test_stray_marker_is_ignored() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.drain_notifications();

        // Ready, перехода нет: маркер — warning + no-op
        manager.handle_marker("pistol_basic/finish_put_out", &mut host.ctx(&mounts));

        assert_eq!(manager.state(), WeaponManagerState::Ready);
        assert!(manager.drain_notifications().is_empty());
    }

    #[test]
    fn test_signal_survives_repeated_cycles() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);

        for _ in 0..3 {
            manager.begin_put_out(0, &mut host.ctx(&mounts)).unwrap();
            manager.handle_marker("pistol_basic/finish_put_out", &mut host.ctx(&mounts));
            assert_eq!(manager.state(), WeaponManagerState::Ready);

            manager.begin_put_in(&mut host.ctx(&mounts)).unwrap();
            manager.handle_marker("pistol_basic/finish_put_in", &mut host.ctx(&mounts));
            assert_eq!(manager.state(), WeaponManagerState::Empty);
        }
    }

    // ========================================================================
    // Identity при мутациях carry-списка
    // ========================================================================

    #[test]
    fn test_remove_equipped_weapon_is_forbidden() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();

        let err = manager.remove_weapon(0).unwrap_err();
        assert!(matches!(err, WeaponError::InvalidState(_)));
        assert_eq!(manager.weapon_count(), 2);
    }

    #[test]
    fn test_remove_other_weapon_keeps_current_identity() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(1, &mut host.ctx(&mounts)).unwrap();
        assert_eq!(manager.current_index(), Some(1));

        // Убираем слот 0: rifle сдвигается в 0, но остаётся текущим
        let removed = manager.remove_weapon(0).unwrap();
        assert_eq!(removed.id(), &WeaponId::from("pistol_basic"));
        assert_eq!(removed.using_status(), Some(WeaponUsingStatus::Abandoned));

        assert_eq!(manager.current_index(), Some(0));
        assert_eq!(
            manager.current_weapon().unwrap().id(),
            &WeaponId::from("rifle_basic")
        );
        assert_eq!(manager.weapon_at(0).unwrap().index(), 0);
    }

    #[test]
    fn test_insert_before_current_keeps_identity() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(1, &mut host.ctx(&mounts)).unwrap();
        assert_eq!(manager.current_index(), Some(1));

        let templates = WeaponTemplates::default();
        let blade = templates.get(&"blade".into()).unwrap().instantiate();
        let at = manager
            .add_weapon_at(blade, 0, &mut host.ctx(&mounts))
            .unwrap();
        assert_eq!(at, 0);

        // Rifle сдвинулась в слот 2, но осталась текущей
        assert_eq!(manager.current_index(), Some(2));
        assert_eq!(
            manager.current_weapon().unwrap().id(),
            &WeaponId::from("rifle_basic")
        );
        assert_eq!(manager.weapon_at(2).unwrap().index(), 2);
    }

    #[test]
    fn test_removed_weapon_can_be_readopted() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        let removed = manager.remove_weapon(1).unwrap();

        let index = manager
            .add_weapon(removed, &mut host.ctx(&mounts))
            .unwrap();
        assert_eq!(
            manager.weapon_at(index).unwrap().using_status(),
            Some(WeaponUsingStatus::Background)
        );
    }

    // ========================================================================
    // Gates / held flags
    // ========================================================================

    #[test]
    fn test_trigger_requires_ready_state_and_gate() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);

        // Empty: не принимается
        manager.trigger_down(&mut host.ctx(&mounts));
        assert!(!manager.trigger_held());

        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.set_can_shoot(false, &mut host.ctx(&mounts));
        let ammo_before = manager.current_weapon().unwrap().runtime_data().unwrap().ammo;

        manager.trigger_down(&mut host.ctx(&mounts));
        assert!(!manager.trigger_held());
        assert_eq!(
            manager.current_weapon().unwrap().runtime_data().unwrap().ammo,
            ammo_before
        );

        manager.set_can_shoot(true, &mut host.ctx(&mounts));
        manager.trigger_down(&mut host.ctx(&mounts));
        assert!(manager.trigger_held());
        assert_eq!(
            manager.current_weapon().unwrap().runtime_data().unwrap().ammo,
            ammo_before - 1
        );
    }

    #[test]
    fn test_up_without_accepted_down_is_noop() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        host.remote.calls.clear();

        manager.trigger_up(&mut host.ctx(&mounts));
        manager.aim_up(&mut host.ctx(&mounts));

        // Ничего не реплицировано
        assert!(host.remote.calls.is_empty());
    }

    #[test]
    fn test_disabling_gate_releases_held_input() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();

        manager.aim_down(&mut host.ctx(&mounts));
        assert!(manager.aim_held());
        assert!(manager.current_weapon().unwrap().runtime_data().unwrap().aiming);

        manager.set_can_aim(false, &mut host.ctx(&mounts));
        assert!(!manager.aim_held());
        assert!(!manager.current_weapon().unwrap().runtime_data().unwrap().aiming);
    }

    #[test]
    fn test_gate_change_notifies_only_current_weapon() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);

        // Пустые руки: flag меняется, hooks не ходят ни к одному оружию
        manager.carry_weapons[1].runtime_data_mut().unwrap().aiming = true;
        manager.set_can_aim(false, &mut host.ctx(&mounts));
        assert!(!manager.can_aim());
        assert!(manager.weapon_at(1).unwrap().runtime_data().unwrap().aiming);
        manager.set_can_aim(true, &mut host.ctx(&mounts));

        // С пистолетом в руках: hook чистит только его, background rifle не трогаем
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.aim_down(&mut host.ctx(&mounts));
        manager.set_can_aim(false, &mut host.ctx(&mounts));

        assert!(!manager.weapon_at(0).unwrap().runtime_data().unwrap().aiming);
        assert!(manager.weapon_at(1).unwrap().runtime_data().unwrap().aiming);
    }

    #[test]
    fn test_failed_begin_put_out_leaves_manager_idle() {
        let (mut manager, mut host, mounts) = fixture(true);

        // Неинициализированное оружие в обход add_weapon
        let templates = WeaponTemplates::default();
        let weapon = templates.get(&"pistol_basic".into()).unwrap().instantiate();
        manager.carry_weapons.push(weapon);
        manager.reindex();

        let err = manager.begin_put_out(0, &mut host.ctx(&mounts)).unwrap_err();
        assert!(matches!(err, WeaponError::InvalidState(_)));
        // Провал не оставил manager в Busy
        assert_eq!(manager.state(), WeaponManagerState::Empty);
        assert_eq!(manager.current_index(), None);

        // Следующий запрос проходит как обычно
        add_preset(&mut manager, &mut host, &mounts, "rifle_basic");
        manager.begin_put_out(1, &mut host.ctx(&mounts)).unwrap();
        assert_eq!(manager.state(), WeaponManagerState::PuttingOut);
    }

    #[test]
    fn test_chained_switch_to_broken_target_recovers() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();

        // Цель испорчена: неинициализированный клинок в обход add_weapon
        let templates = WeaponTemplates::default();
        let blade = templates.get(&"blade".into()).unwrap().instantiate();
        manager.carry_weapons.push(blade);
        manager.reindex();

        manager.begin_put_out(2, &mut host.ctx(&mounts)).unwrap();
        assert_eq!(manager.state(), WeaponManagerState::PuttingIn);

        // Chained put-out цели проваливается: откат в Empty, не Busy навсегда
        manager.handle_marker("pistol_basic/finish_put_in", &mut host.ctx(&mounts));
        assert_eq!(manager.state(), WeaponManagerState::Empty);
        assert_eq!(manager.current_index(), None);
    }

    #[test]
    fn test_put_in_releases_held_inputs() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.trigger_down(&mut host.ctx(&mounts));
        manager.aim_down(&mut host.ctx(&mounts));

        manager.put_in(&mut host.ctx(&mounts)).unwrap();

        assert!(!manager.trigger_held());
        assert!(!manager.aim_held());
    }

    #[test]
    fn test_reload_flow_through_marker() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(1, &mut host.ctx(&mounts)).unwrap();

        // Отстрелять пару патронов
        manager.trigger_down(&mut host.ctx(&mounts));
        manager.trigger_up(&mut host.ctx(&mounts));
        manager.trigger_down(&mut host.ctx(&mounts));
        manager.trigger_up(&mut host.ctx(&mounts));

        manager.reload_down(&mut host.ctx(&mounts));
        assert!(manager.current_weapon().unwrap().runtime_data().unwrap().reloading);

        manager.handle_marker("rifle_basic/finish_reload", &mut host.ctx(&mounts));
        let rt = manager.current_weapon().unwrap().runtime_data().unwrap();
        assert!(!rt.reloading);
        assert_eq!(rt.ammo, rt.magazine_size);
    }

    // ========================================================================
    // Репликация
    // ========================================================================

    #[test]
    fn test_local_manager_replicates_accepted_actions() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);

        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.trigger_down(&mut host.ctx(&mounts));

        assert_eq!(
            host.remote.calls,
            vec![
                (0, RemoteWeaponCall::PutOut { index: 0 }),
                (0, RemoteWeaponCall::TriggerDown),
            ]
        );
    }

    #[test]
    fn test_rejected_actions_are_not_replicated() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);
        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.set_can_shoot(false, &mut host.ctx(&mounts));
        host.remote.calls.clear();

        manager.trigger_down(&mut host.ctx(&mounts));
        assert!(host.remote.calls.is_empty());
    }

    #[test]
    fn test_non_local_manager_never_replicates() {
        let (mut manager, mut host, mounts) = loaded_fixture(false);

        manager.put_out(0, &mut host.ctx(&mounts)).unwrap();
        manager.trigger_down(&mut host.ctx(&mounts));

        assert!(host.remote.calls.is_empty());
    }

    #[test]
    fn test_apply_remote_call_does_not_echo() {
        let (mut manager, mut host, mounts) = loaded_fixture(true);

        manager
            .apply_remote_call(RemoteWeaponCall::PutOut { index: 1 }, &mut host.ctx(&mounts))
            .unwrap();

        assert_eq!(manager.current_index(), Some(1));
        assert_eq!(manager.state(), WeaponManagerState::Ready);
        // Входящий вызов не зеркалится обратно
        assert!(host.remote.calls.is_empty());
    }
}
