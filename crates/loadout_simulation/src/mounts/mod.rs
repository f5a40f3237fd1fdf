//! Mount-point resolution — куда цеплять визуальный instance оружия
//!
//! Host регистрирует именованные attachment targets (пути узлов сцены),
//! core резолвит имя из weapon config при put-out. Незарегистрированное имя —
//! `MountNotFound`, и put-out не стартует (никакого полуперехода).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::WeaponError;

/// Host-side attachment target (например "%RightHandAttachment")
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountTarget(pub String);

impl From<&str> for MountTarget {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Registry именованных mount points одного агента
#[derive(Debug, Default)]
pub struct MountPointRegistry {
    points: HashMap<String, MountTarget>,
}

impl MountPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, target: MountTarget) {
        self.points.insert(name.into(), target);
    }

    pub fn resolve(&self, name: &str) -> Result<&MountTarget, WeaponError> {
        self.points
            .get(name)
            .ok_or_else(|| WeaponError::MountNotFound(name.to_string()))
    }
}
