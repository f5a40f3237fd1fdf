//! Remote-call boundary — репликация действий на сетевых peer-ов
//!
//! # Архитектура
//!
//! Локально управляемый агент (`is_local`) зеркалит ПРИНЯТЫЕ действия через
//! `RemoteWeaponAgent::invoke`; отклонённые gate-ом действия не реплицируются.
//! Входящие вызовы заходят обратно через `WeaponManager::apply_remote_call`
//! и проходят ту же operation surface (sync-пути: remote-у не нужно ждать
//! анимацию). Транспорт и сериализация параметров — забота host-а,
//! payload уже serde-ready.

use serde::{Deserialize, Serialize};

/// Закрытый набор реплицируемых методов (вместо stringly-typed RPC имени)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RemoteWeaponCall {
    PutOut { index: usize },
    PutIn,
    TriggerDown,
    TriggerUp,
    ReloadDown,
    ReloadUp,
    AimDown,
    AimUp,
}

/// Узкий outbound-интерфейс к сетевому слою
pub trait RemoteWeaponAgent {
    /// Вызвать реплицированный метод на remote-копиях оружия.
    /// `weapon_index` — индекс оружия в carry-списке на момент вызова.
    fn invoke(&mut self, weapon_index: usize, call: RemoteWeaponCall);
}

/// Queue-backed `RemoteWeaponAgent` (ECS дренирует в OutboundRemoteCall events)
#[derive(Debug, Default)]
pub struct RemoteCallQueue {
    pub calls: Vec<(usize, RemoteWeaponCall)>,
}

impl RemoteWeaponAgent for RemoteCallQueue {
    fn invoke(&mut self, weapon_index: usize, call: RemoteWeaponCall) {
        self.calls.push((weapon_index, call));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_records_calls_in_order() {
        let mut remote = RemoteCallQueue::default();
        remote.invoke(0, RemoteWeaponCall::PutOut { index: 0 });
        remote.invoke(0, RemoteWeaponCall::TriggerDown);
        remote.invoke(0, RemoteWeaponCall::TriggerUp);

        assert_eq!(remote.calls.len(), 3);
        assert_eq!(remote.calls[1], (0, RemoteWeaponCall::TriggerDown));
    }

    #[test]
    fn test_put_out_call_carries_target_index() {
        let call = RemoteWeaponCall::PutOut { index: 2 };
        assert_eq!(call, RemoteWeaponCall::PutOut { index: 2 });
        assert_ne!(call, RemoteWeaponCall::PutOut { index: 0 });
    }
}
