//! Timeline collaborator boundary — sequence playback + completion markers
//!
//! # Архитектура
//!
//! Core НЕ проигрывает анимации сам. Host (animation/timeline engine) получает
//! `play` через узкий `SequencePlayer` trait и отдаёт обратно named completion
//! markers ("pistol/finish_put_out" и т.д.).
//!
//! **MarkerBus** — broadcast/subscribe по имени маркера. Вместо callback-ов
//! (delegate-стиль) используем закрытый набор `MarkerAction`: никакого
//! downcast-а, dispatch полностью типизирован. Core регистрирует
//! finish-put-out/finish-put-in маркеры ДО старта соответствующего sequence
//! и снимает их когда переход consumed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::audio::CueHandle;
use crate::weapon::data::WeaponId;

pub mod signal;

pub use signal::CompletionSignal;

/// Ссылка на host-side timeline sequence (по имени)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRef(pub String);

impl From<&str> for SequenceRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Узкий интерфейс к animation/timeline engine (fire-and-forget)
pub trait SequencePlayer {
    fn play(&mut self, sequence: &SequenceRef);
}

/// Queue-backed `SequencePlayer`: ECS-слой дренирует в события, тесты читают напрямую
#[derive(Debug, Default)]
pub struct SequenceQueue {
    pub requested: Vec<SequenceRef>,
}

impl SequencePlayer for SequenceQueue {
    fn play(&mut self, sequence: &SequenceRef) {
        self.requested.push(sequence.clone());
    }
}

// ============================================================================
// MarkerBus
// ============================================================================

/// Закрытый набор действий, привязываемых к completion marker-у
#[derive(Clone, Debug, PartialEq)]
pub enum MarkerAction {
    /// Equip-анимация оружия доиграла
    FinishPutOut(WeaponId),
    /// Unequip-анимация оружия доиграла
    FinishPutIn(WeaponId),
    /// Reload-анимация оружия доиграла
    FinishReload(WeaponId),
    /// Проиграть привязанный audio cue
    PlayCue(CueHandle),
}

impl MarkerAction {
    /// Id оружия, которому принадлежит action (PlayCue не привязан к id)
    fn weapon_id(&self) -> Option<&WeaponId> {
        match self {
            MarkerAction::FinishPutOut(id)
            | MarkerAction::FinishPutIn(id)
            | MarkerAction::FinishReload(id) => Some(id),
            MarkerAction::PlayCue(_) => None,
        }
    }
}

/// Named completion-marker broadcast/subscribe
///
/// Один manager = один bus. Weapons регистрируют свои маркеры при put-out /
/// initialize, снимают при finish-put-in / abandon.
#[derive(Debug, Default)]
pub struct MarkerBus {
    bindings: HashMap<String, Vec<MarkerAction>>,
}

impl MarkerBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Подписать action на маркер
    pub fn register(&mut self, marker: impl Into<String>, action: MarkerAction) {
        self.bindings.entry(marker.into()).or_default().push(action);
    }

    /// Снять конкретный action с маркера. Возвращает false если его не было.
    pub fn unregister(&mut self, marker: &str, action: &MarkerAction) -> bool {
        let Some(actions) = self.bindings.get_mut(marker) else {
            return false;
        };
        let Some(pos) = actions.iter().position(|a| a == action) else {
            return false;
        };
        actions.remove(pos);
        if actions.is_empty() {
            self.bindings.remove(marker);
        }
        true
    }

    /// Снять все подписки оружия (abandon path). PlayCue снимается отдельно
    /// через `unregister`, так как handle не несёт weapon id.
    pub fn unregister_weapon(&mut self, id: &WeaponId) {
        self.bindings
            .retain(|_, actions| {
                actions.retain(|a| a.weapon_id() != Some(id));
                !actions.is_empty()
            });
    }

    /// Поднять маркер: вернуть снимок подписанных actions (подписки остаются,
    /// снятие — ответственность consumer-а)
    pub fn raise(&self, marker: &str) -> Vec<MarkerAction> {
        self.bindings.get(marker).cloned().unwrap_or_default()
    }

    pub fn is_registered(&self, marker: &str) -> bool {
        self.bindings.contains_key(marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_raise_unregister() {
        let mut bus = MarkerBus::new();
        let id: WeaponId = "pistol_basic".into();

        bus.register("pistol/finish_put_out", MarkerAction::FinishPutOut(id.clone()));
        assert!(bus.is_registered("pistol/finish_put_out"));

        let actions = bus.raise("pistol/finish_put_out");
        assert_eq!(actions, vec![MarkerAction::FinishPutOut(id.clone())]);

        // Подписка остаётся до явного unregister
        assert!(!bus.raise("pistol/finish_put_out").is_empty());

        assert!(bus.unregister("pistol/finish_put_out", &MarkerAction::FinishPutOut(id.clone())));
        assert!(!bus.is_registered("pistol/finish_put_out"));
        assert!(!bus.unregister("pistol/finish_put_out", &MarkerAction::FinishPutOut(id)));
    }

    #[test]
    fn test_raise_unknown_marker_is_empty() {
        let bus = MarkerBus::new();
        assert!(bus.raise("no_such_marker").is_empty());
    }

    #[test]
    fn test_unregister_weapon_removes_all_its_bindings() {
        let mut bus = MarkerBus::new();
        let pistol: WeaponId = "pistol_basic".into();
        let rifle: WeaponId = "rifle_basic".into();

        bus.register("pistol/finish_put_out", MarkerAction::FinishPutOut(pistol.clone()));
        bus.register("pistol/finish_put_in", MarkerAction::FinishPutIn(pistol.clone()));
        bus.register("rifle/finish_put_out", MarkerAction::FinishPutOut(rifle.clone()));

        bus.unregister_weapon(&pistol);

        assert!(!bus.is_registered("pistol/finish_put_out"));
        assert!(!bus.is_registered("pistol/finish_put_in"));
        assert!(bus.is_registered("rifle/finish_put_out"));
    }

    #[test]
    fn test_sequence_queue_records_plays() {
        let mut queue = SequenceQueue::default();
        queue.play(&"pistol/put_out".into());
        queue.play(&"pistol/put_in".into());
        assert_eq!(queue.requested.len(), 2);
        assert_eq!(queue.requested[0], "pistol/put_out".into());
    }
}
