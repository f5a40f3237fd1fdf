//! Error taxonomy weapon-системы
//!
//! Структурные/lookup ошибки (OutOfRange, NotFound, NotCarried, InvalidState)
//! поднимаются к вызывающему и НЕ оставляют state machine в полупереходе.
//! Gating-ошибки (Busy, AlreadyEquipped) на ECS-слое деградируют до warning
//! + no-op: они возникают из race-prone input timing и не фатальны.

use thiserror::Error;

use crate::manager::WeaponManagerState;
use crate::weapon::data::WeaponId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeaponError {
    /// Числовой индекс вне carry-списка
    #[error("weapon index {index} out of range (carrying {len})")]
    OutOfRange { index: usize, len: usize },

    /// Lookup по id не нашёл оружие
    #[error("no weapon with id '{0}' in the carry list")]
    NotFound(WeaponId),

    /// Переданный weapon не принадлежит этому manager-у
    #[error("weapon '{0}' is not carried by this manager")]
    NotCarried(WeaponId),

    /// Redundant equip: target уже в руках
    #[error("weapon '{0}' is already equipped")]
    AlreadyEquipped(WeaponId),

    /// Операция нелегальна для текущего состояния (например ToRuntime на Runtime data)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Переход уже в полёте — запрос отбрасывается, caller должен retry
    #[error("manager is busy ({0:?}): transition already in flight")]
    Busy(WeaponManagerState),

    /// Mount point не зарегистрирован в registry
    #[error("mount point '{0}' is not registered")]
    MountNotFound(String),

    /// One-shot completion signal удовлетворён повторно (нарушение replace-after-consume)
    #[error("completion signal already satisfied")]
    SignalAlreadySatisfied,
}
