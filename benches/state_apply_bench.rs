//! State apply benchmarks.
//!
//! Measures the per-draw cost of reconciling a frame with a recording driver:
//! - unchanged frames (the identity fast path)
//! - alternating materials that share one generated program
//! - a scene-like traversal with lights and textures

use std::hint::black_box;
use std::rc::Rc;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::{Mat4, Vec3, Vec4};

use myth_state::attributes::{BlendFunc, Light, Material, Texture};
use myth_state::driver::{RecordingDriver, TextureHandle};
use myth_state::{StateFrame, StateSet, StateSetRef};

fn material_set(diffuse: Vec4) -> StateSetRef {
    let mut ss = StateSet::new();
    ss.set_attribute(Material::new().with_diffuse(diffuse).into_ref());
    ss.into_ref()
}

fn bench_unchanged_apply(c: &mut Criterion) {
    let mut frame = StateFrame::new(RecordingDriver::new());
    frame.push_state_set(material_set(Vec4::ONE));
    frame.apply().unwrap();

    c.bench_function("apply_unchanged", |b| {
        b.iter(|| {
            frame.apply().unwrap();
            frame.driver_mut().clear();
        });
    });
}

fn bench_material_switch(c: &mut Criterion) {
    let mut frame = StateFrame::new(RecordingDriver::new());
    let sets = [
        material_set(Vec4::new(1.0, 0.0, 0.0, 1.0)),
        material_set(Vec4::new(0.0, 1.0, 0.0, 1.0)),
    ];

    c.bench_function("apply_material_switch", |b| {
        let mut i = 0;
        b.iter(|| {
            frame.push_state_set(Rc::clone(&sets[i & 1]));
            frame.apply().unwrap();
            frame.pop_state_set().unwrap();
            frame.driver_mut().clear();
            i += 1;
        });
    });
}

fn bench_scene_traversal(c: &mut Criterion) {
    let mut frame = StateFrame::new(RecordingDriver::new());

    let mut root = StateSet::named("root");
    root.set_attribute(Light::new(0).into_ref());
    root.set_attribute(Light::new(1).with_position(Vec4::new(1.0, 2.0, 3.0, 1.0)).into_ref());
    let root = root.into_ref();

    let leaves: Vec<StateSetRef> = (0..16u32)
        .map(|i| {
            let mut ss = StateSet::named(format!("leaf{i}"));
            ss.set_attribute(Material::new().with_diffuse(Vec4::splat(i as f32 / 16.0)).into_ref());
            if i % 4 == 0 {
                ss.set_attribute(BlendFunc::alpha().into_ref());
            }
            if i % 2 == 0 {
                ss.set_texture_attribute(0, Texture::new(TextureHandle(i)).into_ref())
                    .unwrap();
            }
            ss.into_ref()
        })
        .collect();

    c.bench_function("apply_scene_traversal", |b| {
        b.iter(|| {
            frame.push_state_set(Rc::clone(&root));
            for (i, leaf) in leaves.iter().enumerate() {
                frame.push_state_set(Rc::clone(leaf));
                frame.apply().unwrap();
                frame.apply_model_view_matrix(Mat4::from_translation(Vec3::X * i as f32));
                frame.pop_state_set().unwrap();
            }
            frame.pop_state_set().unwrap();
            black_box(frame.driver().calls().len());
            frame.driver_mut().clear();
        });
    });
}

criterion_group!(
    benches,
    bench_unchanged_apply,
    bench_material_switch,
    bench_scene_traversal
);
criterion_main!(benches);
