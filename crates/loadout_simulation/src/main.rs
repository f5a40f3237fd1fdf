//! Headless демо weapon-системы
//!
//! Гоняет Bevy App без рендера: агент с пистолетом и винтовкой, async
//! переключение через completion markers, пара выстрелов и перезарядка.

use loadout_simulation::{
    create_headless_app, MountPointRegistry, PutOutIntent, ReloadIntent, SequenceMarker,
    SequencePlayRequest, TriggerIntent, WeaponAgent, WeaponSystemPlugin, WeaponTarget,
    WeaponTemplates,
};

fn main() {
    let mut app = create_headless_app();
    app.add_plugins(WeaponSystemPlugin);

    // Агент с двумя стволами
    let mut mounts = MountPointRegistry::new();
    mounts.insert("right_hand", "%RightHandAttachment".into());
    let mut agent = WeaponAgent::new(true, mounts);

    let templates = WeaponTemplates::default();
    {
        let WeaponAgent {
            manager,
            host,
            mounts,
        } = &mut agent;
        let mut ctx = host.ctx(mounts);
        for id in ["pistol_basic", "rifle_basic"] {
            let weapon = templates.get(&id.into()).unwrap().instantiate();
            manager.add_weapon(weapon, &mut ctx).unwrap();
        }
    }
    let carried = agent.manager.weapon_count();
    let entity = app.world_mut().spawn(agent).id();

    println!("Starting headless weapon demo ({carried} weapons carried)");

    // Достаём пистолет
    app.world_mut()
        .send_event(PutOutIntent {
            entity,
            target: WeaponTarget::Index(0),
        });
    app.update();
    app.world_mut().send_event(SequenceMarker {
        entity,
        marker: "pistol_basic/finish_put_out".into(),
    });
    app.update();

    // Пара выстрелов
    for _ in 0..2 {
        app.world_mut().send_event(TriggerIntent {
            entity,
            pressed: true,
        });
        app.update();
        app.world_mut().send_event(TriggerIntent {
            entity,
            pressed: false,
        });
        app.update();
    }

    // Перезарядка
    app.world_mut().send_event(ReloadIntent {
        entity,
        pressed: true,
    });
    app.update();
    app.world_mut().send_event(SequenceMarker {
        entity,
        marker: "pistol_basic/finish_reload".into(),
    });
    app.update();

    let agent = app.world().get::<WeaponAgent>(entity).unwrap();
    let weapon = agent.manager.current_weapon().unwrap();
    let rt = weapon.runtime_data().unwrap();
    println!(
        "Current weapon: {} (state {:?}, ammo {}/{})",
        weapon.id(),
        agent.manager.state(),
        rt.ammo,
        rt.magazine_size
    );

    // Сколько sequences запросили у host-а за сессию
    let plays = app
        .world()
        .resource::<bevy::ecs::event::Events<SequencePlayRequest>>()
        .len();
    println!("Sequence play requests emitted: {plays}");
    println!("Demo complete!");
}
