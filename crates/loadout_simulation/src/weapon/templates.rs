//! Каталог weapon-пресетов (clone-on-add)
//!
//! Шаблон хранит config blueprint; `instantiate` каждый раз выдаёт свежий
//! `Weapon` с независимой копией данных — два агента с одним пресетом
//! никогда не делят mutable state.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::audio::EffectConfig;
use crate::weapon::data::{WeaponConfigData, WeaponId};
use crate::weapon::{Weapon, WeaponArchetype};

/// Один пресет: blueprint + archetype
#[derive(Clone, Debug)]
pub struct WeaponTemplate {
    pub config: WeaponConfigData,
    pub archetype: WeaponArchetype,
}

impl WeaponTemplate {
    /// Свежий uninitialized Weapon с deep copy данных пресета
    pub fn instantiate(&self) -> Weapon {
        Weapon::new(self.config.clone(), self.archetype)
    }
}

/// Каталог доступных оружий
#[derive(Resource, Debug)]
pub struct WeaponTemplates {
    templates: HashMap<WeaponId, WeaponTemplate>,
}

impl WeaponTemplates {
    pub fn get(&self, id: &WeaponId) -> Option<&WeaponTemplate> {
        self.templates.get(id)
    }

    pub fn add(&mut self, template: WeaponTemplate) {
        self.templates
            .insert(template.config.id.clone(), template);
    }

    pub fn all_ids(&self) -> Vec<&WeaponId> {
        self.templates.keys().collect()
    }
}

/// Конвенция имён: все sequences и markers пресета живут в namespace "{id}/..."
fn preset_config(id: &str, magazine_size: u32) -> WeaponConfigData {
    WeaponConfigData {
        id: id.into(),
        put_out_sequence: format!("{id}/put_out").as_str().into(),
        put_in_sequence: format!("{id}/put_in").as_str().into(),
        fire_sequence: format!("{id}/fire").as_str().into(),
        reload_sequence: format!("{id}/reload").as_str().into(),
        finish_put_out_marker: format!("{id}/finish_put_out"),
        finish_put_in_marker: format!("{id}/finish_put_in"),
        finish_reload_marker: format!("{id}/finish_reload"),
        mount_point: "right_hand".into(),
        magazine_size,
        audio_cues: vec![(
            format!("{id}/finish_put_out"),
            EffectConfig::new("draw_click"),
        )],
    }
}

impl Default for WeaponTemplates {
    fn default() -> Self {
        let mut catalog = Self {
            templates: HashMap::new(),
        };

        catalog.add(WeaponTemplate {
            config: preset_config("pistol_basic", 12),
            archetype: WeaponArchetype::Hitscan,
        });
        catalog.add(WeaponTemplate {
            config: preset_config("rifle_basic", 30),
            archetype: WeaponArchetype::Projectile,
        });
        catalog.add(WeaponTemplate {
            config: preset_config("blade", 0),
            archetype: WeaponArchetype::Melee,
        });

        catalog
    }
}
