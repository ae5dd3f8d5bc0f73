//! State Frame Tests
//!
//! Tests for:
//! - StateFrame push / pop: stack depths, underflow, insert / remove
//! - Override resolution: OVERRIDE parents, PROTECTED children
//! - Change suppression: identity checks, restoring after pops
//! - apply_state_set: one-off layering and restoring on the next apply
//! - Direct application: apply_attribute, have_applied_attribute
//! - Draw ids, texture unit limits, vertex attribute arrays

use std::rc::Rc;

use glam::Vec4;

use myth_state::attribute::{AttributeRef, OverrideMask};
use myth_state::attributes::{
    BLEND_FUNC_TYPE, BlendFunc, CULL_FACE_TYPE, CullFace, MATERIAL_TYPE, Material, TEXTURE_TYPE,
    Texture,
};
use myth_state::driver::{
    BlendFactor, DriverCall, FixedState, RecordingDriver, TextureHandle,
};
use myth_state::{StateError, StateFrame, StateSet, StateSetRef, StateSettings, UniformValue};

fn frame() -> StateFrame<RecordingDriver> {
    StateFrame::new(RecordingDriver::new())
}

fn set_with(attribute: &AttributeRef, mask: OverrideMask) -> StateSetRef {
    let mut ss = StateSet::new();
    ss.set_attribute_with_mask(Rc::clone(attribute), mask);
    ss.into_ref()
}

fn blend_calls(driver: &RecordingDriver) -> Vec<FixedState> {
    driver
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::FixedState(state @ FixedState::Blend(_)) => Some(*state),
            _ => None,
        })
        .collect()
}

const ALPHA: FixedState = FixedState::Blend(Some((BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)));

// ============================================================================
// Push / Pop
// ============================================================================

#[test]
fn push_pop_restores_stack_depths() {
    let mut frame = frame();
    let blend = BlendFunc::alpha().into_ref();

    let mut ss = StateSet::new();
    ss.set_attribute(Rc::clone(&blend));
    ss.add_uniform(myth_state::Uniform::float("uOpacity", 0.5));
    ss.set_shader_generator_name("default");
    let ss = ss.into_ref();

    frame.push_state_set(Rc::clone(&ss));
    frame.push_state_set(Rc::clone(&ss));
    assert_eq!(frame.state_set_depth(), 2);
    assert_eq!(frame.attribute_stack(&BLEND_FUNC_TYPE).unwrap().depth(), 2);
    assert_eq!(frame.uniform_stack("uOpacity").unwrap().depth(), 2);

    frame.pop_state_set().unwrap();
    frame.pop_state_set().unwrap();
    assert_eq!(frame.state_set_depth(), 0);
    assert_eq!(frame.attribute_stack(&BLEND_FUNC_TYPE).unwrap().depth(), 0);
    assert_eq!(frame.uniform_stack("uOpacity").unwrap().depth(), 0);
}

#[test]
fn push_pop_without_apply_issues_no_calls() {
    let mut frame = frame();
    frame.push_state_set(set_with(&BlendFunc::alpha().into_ref(), OverrideMask::ON));
    frame.pop_state_set().unwrap();

    assert!(frame.driver().calls().is_empty());
    assert!(frame.last_applied_attribute(&BLEND_FUNC_TYPE).is_none());
}

#[test]
fn pop_on_empty_frame_underflows() {
    let mut frame = frame();
    let err = frame.pop_state_set().unwrap_err();
    assert!(matches!(err, StateError::StackUnderflow { .. }));
}

#[test]
fn pop_all_empties_every_stack() {
    let mut frame = frame();
    let blend = BlendFunc::alpha().into_ref();
    for _ in 0..3 {
        frame.push_state_set(set_with(&blend, OverrideMask::ON));
    }

    frame.pop_all_state_sets();
    assert_eq!(frame.state_set_depth(), 0);
    assert!(frame.attribute_stack(&BLEND_FUNC_TYPE).unwrap().is_empty());
}

#[test]
fn insert_at_bottom_reresolves_overrides() {
    let mut frame = frame();
    let child = BlendFunc::disabled().into_ref();
    let parent = BlendFunc::alpha().into_ref();

    frame.push_state_set(set_with(&child, OverrideMask::ON));
    frame
        .insert_state_set(0, set_with(&parent, OverrideMask::ON | OverrideMask::OVERRIDE))
        .unwrap();

    let current = frame.current_attribute(&BLEND_FUNC_TYPE).unwrap();
    assert!(Rc::ptr_eq(&current, &parent));
    assert_eq!(frame.attribute_stack(&BLEND_FUNC_TYPE).unwrap().depth(), 2);
}

#[test]
fn remove_middle_state_set_keeps_the_rest() {
    let mut frame = frame();
    let a = BlendFunc::alpha().into_ref();
    let b = BlendFunc::disabled().into_ref();
    let c = BlendFunc::new(BlendFactor::One, BlendFactor::One).into_ref();

    frame.push_state_set(set_with(&a, OverrideMask::ON));
    let middle = set_with(&b, OverrideMask::ON | OverrideMask::OVERRIDE);
    frame.push_state_set(Rc::clone(&middle));
    frame.push_state_set(set_with(&c, OverrideMask::ON));

    // the middle set forces its value onto the top one
    assert!(Rc::ptr_eq(&frame.current_attribute(&BLEND_FUNC_TYPE).unwrap(), &b));

    let removed = frame.remove_state_set(1).unwrap();
    assert!(Rc::ptr_eq(&removed, &middle));
    assert_eq!(frame.state_set_depth(), 2);
    assert!(Rc::ptr_eq(&frame.current_attribute(&BLEND_FUNC_TYPE).unwrap(), &c));
}

#[test]
fn remove_out_of_range_is_an_error() {
    let mut frame = frame();
    let err = frame.remove_state_set(0).unwrap_err();
    assert_eq!(err, StateError::PositionOutOfRange { position: 0, depth: 0 });
}

// ============================================================================
// Override Resolution
// ============================================================================

#[test]
fn override_parent_wins_over_plain_child() {
    let mut frame = frame();
    frame.push_state_set(set_with(
        &BlendFunc::alpha().into_ref(),
        OverrideMask::ON | OverrideMask::OVERRIDE,
    ));
    frame.push_state_set(set_with(&BlendFunc::disabled().into_ref(), OverrideMask::ON));
    frame.apply().unwrap();

    assert_eq!(blend_calls(frame.driver()), vec![ALPHA]);
}

#[test]
fn protected_child_beats_override_parent() {
    let mut frame = frame();
    frame.push_state_set(set_with(
        &BlendFunc::alpha().into_ref(),
        OverrideMask::ON | OverrideMask::OVERRIDE,
    ));
    frame.push_state_set(set_with(
        &BlendFunc::disabled().into_ref(),
        OverrideMask::ON | OverrideMask::PROTECTED,
    ));
    frame.apply().unwrap();

    assert_eq!(blend_calls(frame.driver()), vec![FixedState::Blend(None)]);
}

#[test]
fn override_uniform_wins_over_child_uniform() {
    let mut frame = frame();
    let mut parent = StateSet::new();
    parent.add_uniform_with_mask(
        myth_state::Uniform::float("uOpacity", 0.25),
        OverrideMask::ON | OverrideMask::OVERRIDE,
    );
    let mut child = StateSet::new();
    child.add_uniform(myth_state::Uniform::float("uOpacity", 1.0));

    frame.push_state_set(parent.into_ref());
    frame.push_state_set(child.into_ref());

    let top = frame.uniform_stack("uOpacity").unwrap().current().unwrap().get();
    assert_eq!(top, UniformValue::Float(0.25));
}

// ============================================================================
// Change Suppression
// ============================================================================

#[test]
fn second_apply_issues_no_calls() {
    let mut frame = frame();
    let mut ss = StateSet::new();
    ss.set_attribute(BlendFunc::alpha().into_ref());
    ss.set_attribute(Material::new().into_ref());
    frame.push_state_set(ss.into_ref());

    frame.apply().unwrap();
    frame.driver_mut().clear();
    frame.apply().unwrap();

    assert!(frame.driver().calls().is_empty());
}

#[test]
fn override_material_survives_child_pop_without_calls() {
    let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let green = Vec4::new(0.0, 1.0, 0.0, 1.0);
    let mut frame = frame();

    frame.push_state_set(set_with(
        &Material::new().with_ambient(red).into_ref(),
        OverrideMask::ON | OverrideMask::OVERRIDE,
    ));
    frame.push_state_set(set_with(
        &Material::new().with_ambient(green).into_ref(),
        OverrideMask::ON,
    ));
    frame.apply().unwrap();
    assert_eq!(
        frame.driver().uploads_of("uMaterialAmbient"),
        vec![UniformValue::Vec4(red)]
    );

    frame.pop_state_set().unwrap();
    frame.driver_mut().clear();
    frame.apply().unwrap();
    assert!(frame.driver().calls().is_empty());
}

#[test]
fn popping_restores_the_global_default() {
    let mut frame = frame();
    frame.push_state_set(set_with(&BlendFunc::alpha().into_ref(), OverrideMask::ON));
    frame.apply().unwrap();
    frame.pop_state_set().unwrap();
    frame.driver_mut().clear();

    frame.apply().unwrap();
    assert_eq!(blend_calls(frame.driver()), vec![FixedState::Blend(None)]);
}

#[test]
fn replaced_global_default_is_applied_on_empty_stack() {
    let mut frame = frame();
    frame
        .set_global_default_attribute(CullFace::disabled().into_ref())
        .unwrap();
    frame.apply().unwrap();

    assert!(
        frame
            .driver()
            .calls()
            .contains(&DriverCall::FixedState(FixedState::CullFace(None)))
    );
    assert!(frame.global_default_attribute(&CULL_FACE_TYPE).is_some());
}

#[test]
fn global_default_rejects_texture_kind() {
    let mut frame = frame();
    let err = frame
        .set_global_default_attribute(Texture::null().into_ref())
        .unwrap_err();
    assert!(matches!(err, StateError::AttributeKindMismatch { .. }));
}

#[test]
fn apply_default_pops_and_applies_defaults() {
    let mut frame = frame();
    frame.push_state_set(set_with(&BlendFunc::alpha().into_ref(), OverrideMask::ON));
    frame.apply().unwrap();
    frame.driver_mut().clear();

    frame.apply_default().unwrap();
    assert_eq!(frame.state_set_depth(), 0);
    assert_eq!(blend_calls(frame.driver()), vec![FixedState::Blend(None)]);
}

// ============================================================================
// apply_state_set
// ============================================================================

#[test]
fn apply_state_set_layers_without_pushing() {
    let mut frame = frame();
    frame.push_state_set(set_with(&BlendFunc::alpha().into_ref(), OverrideMask::ON));
    frame.apply().unwrap();
    frame.driver_mut().clear();

    let mut extra = StateSet::new();
    extra.set_attribute(BlendFunc::disabled().into_ref());
    frame.apply_state_set(&extra).unwrap();
    assert_eq!(blend_calls(frame.driver()), vec![FixedState::Blend(None)]);
    assert_eq!(frame.state_set_depth(), 1);

    frame.driver_mut().clear();
    frame.apply().unwrap();
    assert_eq!(blend_calls(frame.driver()), vec![ALPHA]);
}

#[test]
fn apply_state_set_respects_override_on_stack() {
    let mut frame = frame();
    frame.push_state_set(set_with(
        &BlendFunc::alpha().into_ref(),
        OverrideMask::ON | OverrideMask::OVERRIDE,
    ));
    frame.apply().unwrap();
    frame.driver_mut().clear();

    let mut extra = StateSet::new();
    extra.set_attribute(BlendFunc::disabled().into_ref());
    frame.apply_state_set(&extra).unwrap();

    assert!(blend_calls(frame.driver()).is_empty());
}

#[test]
fn apply_state_set_leaves_uniform_stacks_balanced() {
    let mut frame = frame();
    let mut extra = StateSet::new();
    extra.add_uniform(myth_state::Uniform::float("uOpacity", 0.5));

    frame.apply_state_set(&extra).unwrap();
    assert_eq!(frame.uniform_stack("uOpacity").unwrap().depth(), 0);
    assert_eq!(frame.stats().apply_state_set, 1);
}

// ============================================================================
// Direct Application
// ============================================================================

#[test]
fn apply_attribute_is_undone_by_next_apply() {
    let mut frame = frame();
    frame.push_state_set(set_with(&BlendFunc::alpha().into_ref(), OverrideMask::ON));
    frame.apply().unwrap();
    frame.driver_mut().clear();

    frame.apply_attribute(BlendFunc::disabled().into_ref()).unwrap();
    frame.apply().unwrap();

    assert_eq!(
        blend_calls(frame.driver()),
        vec![FixedState::Blend(None), ALPHA]
    );
}

#[test]
fn have_applied_attribute_suppresses_the_call() {
    let mut frame = frame();
    let blend = BlendFunc::alpha().into_ref();
    frame.have_applied_attribute(Rc::clone(&blend)).unwrap();
    frame.push_state_set(set_with(&blend, OverrideMask::ON));
    frame.apply().unwrap();

    assert!(blend_calls(frame.driver()).is_empty());
    assert!(Rc::ptr_eq(
        &frame.last_applied_attribute(&BLEND_FUNC_TYPE).unwrap(),
        &blend
    ));
}

#[test]
fn apply_texture_attribute_activates_its_unit() {
    let mut frame = frame();
    frame
        .apply_texture_attribute(2, Texture::new(TextureHandle(9)).into_ref())
        .unwrap();

    assert_eq!(
        frame.driver().calls(),
        &[
            DriverCall::ActiveTexture(2),
            DriverCall::BindTexture(Some(TextureHandle(9)))
        ]
    );
    assert!(frame.last_applied_texture_attribute(2, &TEXTURE_TYPE).is_some());
}

// ============================================================================
// Textures
// ============================================================================

#[test]
fn texture_kind_mismatch_is_rejected() {
    let mut ss = StateSet::new();
    let err = ss
        .set_texture_attribute(0, Material::new().into_ref())
        .unwrap_err();
    assert!(matches!(err, StateError::AttributeKindMismatch { .. }));
}

#[test]
fn texture_units_past_the_limit_are_ignored() {
    let settings = StateSettings {
        max_texture_units: 2,
        ..Default::default()
    };
    let mut frame = StateFrame::with_settings(RecordingDriver::new(), settings);
    let mut ss = StateSet::new();
    ss.set_texture_attribute(5, Texture::new(TextureHandle(1)).into_ref())
        .unwrap();
    let ss = ss.into_ref();

    frame.push_state_set(Rc::clone(&ss));
    assert!(frame.texture_attribute_stack(5, &TEXTURE_TYPE).is_none());
    frame.apply().unwrap();
    frame.pop_state_set().unwrap();

    assert!(
        !frame
            .driver()
            .calls()
            .contains(&DriverCall::BindTexture(Some(TextureHandle(1))))
    );
}

#[test]
fn far_texture_unit_is_stored_sparsely_and_ignored() {
    let mut frame = frame();
    let mut ss = StateSet::new();
    ss.set_texture_attribute(u32::MAX, Texture::new(TextureHandle(9)).into_ref())
        .unwrap();
    assert!(ss.texture_units().eq([u32::MAX]));
    assert!(ss.texture_attribute(u32::MAX, &TEXTURE_TYPE).is_some());
    assert_eq!(ss.texture_attribute_capacity(u32::MAX - 1), 0);

    let ss = ss.into_ref();
    frame.push_state_set(Rc::clone(&ss));
    frame.apply().unwrap();
    frame.apply_state_set(&ss).unwrap();
    frame.pop_state_set().unwrap();

    assert!(frame.texture_attribute_stack(u32::MAX, &TEXTURE_TYPE).is_none());
    assert!(
        !frame
            .driver()
            .calls()
            .contains(&DriverCall::BindTexture(Some(TextureHandle(9))))
    );
}

#[test]
fn textures_bind_per_unit() {
    let mut frame = frame();
    let mut ss = StateSet::new();
    ss.set_texture_attribute(0, Texture::new(TextureHandle(3)).into_ref())
        .unwrap();
    ss.set_texture_attribute(1, Texture::new(TextureHandle(4)).into_ref())
        .unwrap();
    frame.push_state_set(ss.into_ref());
    frame.apply().unwrap();

    let calls = frame.driver().calls();
    let bind0 = calls
        .iter()
        .position(|c| *c == DriverCall::BindTexture(Some(TextureHandle(3))))
        .unwrap();
    let bind1 = calls
        .iter()
        .position(|c| *c == DriverCall::BindTexture(Some(TextureHandle(4))))
        .unwrap();
    assert_eq!(calls[bind0 - 1], DriverCall::ActiveTexture(0));
    assert_eq!(calls[bind1 - 1], DriverCall::ActiveTexture(1));
}

// ============================================================================
// Draw Id
// ============================================================================

#[test]
fn draw_id_tracks_the_pushed_sets() {
    let mut frame = frame();
    let ss = set_with(&BlendFunc::alpha().into_ref(), OverrideMask::ON);
    frame.push_state_set(Rc::clone(&ss));
    frame.set_state_sets_draw_id(1);
    assert_eq!(ss.draw_id(), Some(1));
    assert!(!frame.state_set_stack_changed(1, 1));

    frame.pop_state_set().unwrap();
    frame.push_state_set(set_with(&BlendFunc::alpha().into_ref(), OverrideMask::ON));
    assert!(frame.state_set_stack_changed(1, 1));
}

// ============================================================================
// Vertex Attribute Arrays
// ============================================================================

#[test]
fn vertex_attributes_disable_lazily() {
    let mut frame = frame();
    frame.set_vertex_attrib_array(0);
    frame.set_vertex_attrib_array(1);
    frame.driver_mut().clear();

    frame.lazy_disabling_of_vertex_attributes();
    frame.set_vertex_attrib_array(1);
    frame.apply_disabling_of_vertex_attributes();

    assert_eq!(
        frame.driver().calls(),
        &[DriverCall::DisableVertexAttribArray(0)]
    );
    assert!(frame.is_vertex_attrib_enabled(1));

    frame.clear_vertex_attrib_cache();
    assert!(!frame.is_vertex_attrib_enabled(1));
}

// ============================================================================
// Stats
// ============================================================================

#[test]
fn stats_count_calls() {
    let mut frame = frame();
    frame.push_state_set(set_with(&Material::new().into_ref(), OverrideMask::ON));
    frame.apply().unwrap();
    frame.apply().unwrap();

    let stats = frame.stats();
    assert_eq!(stats.push_state_set, 1);
    assert_eq!(stats.apply, 2);
    assert_eq!(stats.program_switches, 1);

    frame.reset_stats();
    assert_eq!(frame.stats().apply, 0);
    assert!(frame.current_attribute(&MATERIAL_TYPE).is_some());
}
