//! Audio collaborator boundary — cue binding по marker-ам
//!
//! Core не проигрывает звук: при инициализации оружия он делает
//! `bind(marker, effect) -> CueHandle`, а когда marker срабатывает —
//! `play(handle)`. Полностью fire-and-forget с точки зрения core.

use serde::{Deserialize, Serialize};

/// Конфигурация звукового эффекта (имя + громкость)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    pub effect: String,
    pub volume: f32,
}

impl EffectConfig {
    pub fn new(effect: impl Into<String>) -> Self {
        Self {
            effect: effect.into(),
            volume: 1.0,
        }
    }
}

/// Opaque handle на привязанный cue (выдаётся host-ом при bind)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CueHandle(pub u32);

/// Узкий интерфейс к audio engine
pub trait AudioSystem {
    /// Привязать effect к маркеру, получить playable handle
    fn bind(&mut self, marker: &str, effect: &EffectConfig) -> CueHandle;

    /// Проиграть ранее привязанный cue
    fn play(&mut self, handle: CueHandle);
}

/// Queue-backed `AudioSystem`: handles выдаются последовательно,
/// played-очередь дренируется ECS-слоем в события
#[derive(Debug, Default)]
pub struct CueQueue {
    next_handle: u32,
    pub bound: Vec<(String, EffectConfig)>,
    pub played: Vec<CueHandle>,
}

impl AudioSystem for CueQueue {
    fn bind(&mut self, marker: &str, effect: &EffectConfig) -> CueHandle {
        let handle = CueHandle(self.next_handle);
        self.next_handle += 1;
        self.bound.push((marker.to_string(), effect.clone()));
        handle
    }

    fn play(&mut self, handle: CueHandle) {
        self.played.push(handle);
    }
}
