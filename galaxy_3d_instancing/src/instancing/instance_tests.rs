use glam::{Mat4, Quat, Vec3};
use slotmap::SlotMap;
use super::*;
use crate::instancing::attribute_buffer::{AttributeBuffers, AttributeDesc, COLOR_ATTRIBUTE, MATRIX_ATTRIBUTE};

#[test]
fn test_new_entity_defaults() {
    let entity = InstanceEntity::new(7);
    assert_eq!(entity.index(), 7);
    assert_eq!(entity.slot(), 7);
    assert!(entity.is_visible());
    assert!(entity.is_in_frustum());
    assert!(entity.is_matrix_dirty());
    assert_eq!(entity.compose_matrix(), Mat4::IDENTITY);
}

#[test]
fn test_renderable_rule() {
    let mut entity = InstanceEntity::new(0);
    entity.set_flag(InstanceFlags::IN_FRUSTUM, false);
    assert!(!entity.is_renderable(true));
    assert!(entity.is_renderable(false));

    entity.set_flag(InstanceFlags::VISIBLE, false);
    assert!(!entity.is_renderable(false));

    entity.set_flag(InstanceFlags::IN_FRUSTUM, true);
    assert!(!entity.is_renderable(true));
}

#[test]
fn test_refresh_matrix_writes_slot_and_clears_dirty() {
    let mut buffers = AttributeBuffers::new(4, None, &[]).unwrap();
    let mut entity = InstanceEntity::new(0);
    entity.set_slot(2);
    entity.set_position(Vec3::new(1.0, 2.0, 3.0));
    entity.set_scale(Vec3::splat(2.0));
    entity.refresh_matrix(&mut buffers);

    assert!(!entity.is_matrix_dirty());
    let expected = Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(buffers.matrix_at(2), expected);
    assert_eq!(buffers.matrix_at(0), Mat4::IDENTITY);

    entity.set_rotation(Quat::from_rotation_y(1.0));
    assert!(entity.is_matrix_dirty());
}

#[test]
fn test_instance_init_writes_through() {
    let mut keys: SlotMap<InstanceKey, ()> = SlotMap::with_key();
    let key = keys.insert(());
    let mut buffers = AttributeBuffers::new(
        2,
        Some(Vec3::ONE),
        &[AttributeDesc::new("instanceOpacity", 1, vec![1.0])],
    ).unwrap();
    let mut entity = InstanceEntity::new(1);

    {
        let mut init = InstanceInit::new(key, &mut entity, &mut buffers);
        assert_eq!(init.key(), key);
        init.set_position(Vec3::X);
        init.set_visible(false);
        assert!(init.set_color(Vec3::new(0.2, 0.4, 0.6)));
        init.set_attribute("instanceOpacity", &[0.25]).unwrap();
        assert!(init.set_attribute("missing", &[0.0]).is_err());
        assert!(init.set_attribute(MATRIX_ATTRIBUTE, &[0.0; 16]).is_err());
        assert!(init.set_attribute(COLOR_ATTRIBUTE, &[0.0; 3]).is_err());
        assert_eq!(init.entity().position(), Vec3::X);
    }

    assert!(!entity.is_visible());
    assert_eq!(buffers.color().unwrap().item(1), &[0.2, 0.4, 0.6]);
    assert_eq!(buffers.get("instanceOpacity").unwrap().item(1), &[0.25]);
}

#[test]
fn test_instance_init_color_without_buffer() {
    let mut keys: SlotMap<InstanceKey, ()> = SlotMap::with_key();
    let key = keys.insert(());
    let mut buffers = AttributeBuffers::new(1, None, &[]).unwrap();
    let mut entity = InstanceEntity::new(0);
    let mut init = InstanceInit::new(key, &mut entity, &mut buffers);
    assert!(!init.set_color(Vec3::ONE));
}
