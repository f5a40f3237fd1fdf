//! One-shot completion signal (аналог TaskCompletionSource)
//!
//! Каждый async-переход владеет ровно одним сигналом. Marker-callback
//! удовлетворяет его ровно один раз, переход consume-ит результат, и сигнал
//! немедленно заменяется свежим — чтобы оружие можно было equip/unequip снова.
//! Повторный satisfy без consume — ошибка (replace-after-consume discipline).

use crate::error::WeaponError;

#[derive(Debug, Default)]
pub struct CompletionSignal {
    satisfied: bool,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Удовлетворить сигнал. Err если он уже satisfied и ещё не consumed.
    pub fn satisfy(&mut self) -> Result<(), WeaponError> {
        if self.satisfied {
            return Err(WeaponError::SignalAlreadySatisfied);
        }
        self.satisfied = true;
        Ok(())
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Consume результата: если satisfied — сбрасывает в свежее состояние и
    /// возвращает true. Сигнал после этого готов к следующему переходу.
    pub fn consume(&mut self) -> bool {
        if self.satisfied {
            self.satisfied = false;
            true
        } else {
            false
        }
    }
}
