//! Draw-side types: appearance, instance transforms and the renderer seam.

use bevy_ecs::prelude::*;
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3, Vec4};
use tempest_config::AppearanceConfig;

/// Anything that can serve as the viewpoint for distance and normal math.
pub trait ViewPoint {
    /// Eye position in world space.
    fn position(&self) -> Vec3;
    /// World-to-view transform.
    fn view_matrix(&self) -> Mat4;
}

/// Blend state requested for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// `src * src_alpha + dst * (1 - src_alpha)`.
    Alpha,
}

/// One particle to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawInstance {
    /// Pool slot the instance came from.
    pub slot: usize,
    /// Model transform.
    pub model: Mat4,
    /// Inverse transpose of the upper 3x3 of `view * model`.
    pub normal: Mat3,
}

/// Receives the draw calls of a particle system.
///
/// Every frame's instances arrive between one `begin_batch` and one
/// `end_batch`, farthest first.
pub trait ParticleRenderer {
    /// Binds the color uniform and enables blending.
    fn begin_batch(&mut self, color: Vec4, blend: BlendMode);
    /// Draws one instance with the mesh bound by the implementation.
    fn draw_instance(&mut self, instance: &DrawInstance);
    /// Restores the blend state.
    fn end_batch(&mut self);
}

/// Random per-particle rotation range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomRotation {
    pub min_deg: f32,
    pub max_deg: f32,
    pub axis: Vec3,
}

/// Per-system draw parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    /// RGBA color uniform.
    pub color: Vec4,
    /// Fixed mesh rotation.
    pub model_rotation: Quat,
    /// Non-uniform mesh scale.
    pub scale: Vec3,
    /// Rotation sampled per particle at spawn.
    pub random_rotation: Option<RandomRotation>,
}

impl Appearance {
    /// Converts the configuration section. Zero-length axes fall back to +Y.
    pub fn from_config(config: &AppearanceConfig) -> Self {
        let axis = |a: [f32; 3]| Vec3::from_array(a).try_normalize().unwrap_or(Vec3::Y);
        Self {
            color: Vec4::from_array(config.color),
            model_rotation: Quat::from_axis_angle(
                axis(config.model_rotation_axis),
                config.model_rotation_deg.to_radians(),
            ),
            scale: Vec3::from_array(config.scale),
            random_rotation: config.random_rotation.as_ref().map(|r| RandomRotation {
                min_deg: r.min_deg,
                max_deg: r.max_deg,
                axis: axis(r.axis),
            }),
        }
    }

    /// `translate(position) * rotate(model) * [rotate(random)] * scale`.
    pub fn model_matrix(&self, position: Vec3, rotation_deg: f32) -> Mat4 {
        let mut model = Mat4::from_translation(position) * Mat4::from_quat(self.model_rotation);
        if let Some(random) = &self.random_rotation {
            model *= Mat4::from_axis_angle(random.axis, rotation_deg.to_radians());
        }
        model * Mat4::from_scale(self.scale)
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self::from_config(&AppearanceConfig::default())
    }
}

/// Normal matrix for lighting in view space.
pub fn normal_matrix(view: Mat4, model: Mat4) -> Mat3 {
    Mat3::from_mat4(view * model).inverse().transpose()
}

/// GPU layout of one instance: model matrix, padded normal matrix, color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],     // 64 bytes, mat4x4
    pub normal: [[f32; 4]; 3],    // 48 bytes, mat3x3 with std140 padding
    pub color: [f32; 4],          // 16 bytes
}

impl InstanceData {
    pub fn new(instance: &DrawInstance, color: Vec4) -> Self {
        let n = instance.normal;
        Self {
            model: instance.model.to_cols_array_2d(),
            normal: [
                n.x_axis.extend(0.0).to_array(),
                n.y_axis.extend(0.0).to_array(),
                n.z_axis.extend(0.0).to_array(),
            ],
            color: color.to_array(),
        }
    }
}

/// Instances recorded between one `begin_batch`/`end_batch` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub color: Vec4,
    pub blend: BlendMode,
    pub instances: Vec<DrawInstance>,
}

impl DrawBatch {
    /// Instance buffer contents for this batch.
    pub fn instance_data(&self) -> Vec<InstanceData> {
        self.instances
            .iter()
            .map(|i| InstanceData::new(i, self.color))
            .collect()
    }
}

/// Renderer that records draw commands instead of issuing them.
///
/// Used by the headless binary and by tests; a GPU backend would upload
/// [`DrawBatch::instance_data`] as an instance buffer.
#[derive(Debug, Default, Resource)]
pub struct DrawList {
    batches: Vec<DrawBatch>,
    open: Option<DrawBatch>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed batches, in submission order.
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    /// Whether a batch was begun and not yet ended.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Total instances across completed batches.
    pub fn instance_count(&self) -> usize {
        self.batches.iter().map(|b| b.instances.len()).sum()
    }

    /// Raw bytes of every completed batch's instance data.
    pub fn instance_bytes(&self) -> Vec<u8> {
        let data: Vec<InstanceData> = self.batches.iter().flat_map(|b| b.instance_data()).collect();
        bytemuck::cast_slice(&data).to_vec()
    }

    /// Drops all recorded batches.
    pub fn clear(&mut self) {
        self.batches.clear();
        self.open = None;
    }
}

impl ParticleRenderer for DrawList {
    fn begin_batch(&mut self, color: Vec4, blend: BlendMode) {
        if let Some(unfinished) = self.open.take() {
            tracing::warn!("begin_batch without end_batch, closing previous batch");
            self.batches.push(unfinished);
        }
        self.open = Some(DrawBatch {
            color,
            blend,
            instances: Vec::new(),
        });
    }

    fn draw_instance(&mut self, instance: &DrawInstance) {
        match &mut self.open {
            Some(batch) => batch.instances.push(*instance),
            None => tracing::warn!(slot = instance.slot, "draw_instance outside a batch"),
        }
    }

    fn end_batch(&mut self) {
        if let Some(batch) = self.open.take() {
            self.batches.push(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempest_config::{ParticleConfig, RandomRotationConfig};

    fn approx(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn test_rain_model_matrix_order() {
        let appearance = Appearance::from_config(&ParticleConfig::rain().appearance);
        let pos = Vec3::new(1.0, 2.0, 3.0);
        let expected = Mat4::from_translation(pos)
            * Mat4::from_rotation_x(-90f32.to_radians())
            * Mat4::from_scale(Vec3::new(0.0009, 0.0009, 0.002));
        assert!(approx(appearance.model_matrix(pos, 45.0), expected));
    }

    #[test]
    fn test_snow_model_matrix_applies_random_rotation() {
        let appearance = Appearance::from_config(&ParticleConfig::snow().appearance);
        let pos = Vec3::new(-4.0, 20.0, 9.0);
        let expected = Mat4::from_translation(pos)
            * Mat4::from_rotation_y(90f32.to_radians())
            * Mat4::from_scale(Vec3::splat(0.8));
        assert!(approx(appearance.model_matrix(pos, 90.0), expected));
    }

    #[test]
    fn test_zero_axis_falls_back_to_y() {
        let mut config = ParticleConfig::snow().appearance;
        config.random_rotation = Some(RandomRotationConfig {
            axis: [0.0, 0.0, 0.0],
            ..RandomRotationConfig::default()
        });
        let appearance = Appearance::from_config(&config);
        assert_eq!(appearance.random_rotation.unwrap().axis, Vec3::Y);
    }

    #[test]
    fn test_normal_matrix_of_rigid_transform_is_rotation() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y);
        let model = Mat4::from_rotation_translation(Quat::from_rotation_y(0.7), Vec3::X);
        let n = normal_matrix(view, model);
        let rot = Mat3::from_mat4(view * model);
        assert!(n.abs_diff_eq(rot, 1e-4));
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(Mat4::IDENTITY, model);
        assert!((n.x_axis.x - 0.5).abs() < 1e-6);
        assert!((n.y_axis.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_draw_list_records_batches() {
        let mut list = DrawList::new();
        let color = Vec4::new(0.1, 0.2, 0.3, 0.4);
        list.begin_batch(color, BlendMode::Alpha);
        assert!(list.is_open());
        for slot in 0..3 {
            list.draw_instance(&DrawInstance {
                slot,
                model: Mat4::IDENTITY,
                normal: Mat3::IDENTITY,
            });
        }
        list.end_batch();

        assert!(!list.is_open());
        assert_eq!(list.batches().len(), 1);
        assert_eq!(list.instance_count(), 3);
        assert_eq!(list.batches()[0].blend, BlendMode::Alpha);
        assert_eq!(list.instance_bytes().len(), 3 * std::mem::size_of::<InstanceData>());

        list.clear();
        assert_eq!(list.instance_count(), 0);
    }

    #[test]
    fn test_draw_outside_batch_is_dropped() {
        let mut list = DrawList::new();
        list.draw_instance(&DrawInstance {
            slot: 0,
            model: Mat4::IDENTITY,
            normal: Mat3::IDENTITY,
        });
        list.end_batch();
        assert_eq!(list.instance_count(), 0);
    }

    #[test]
    fn test_instance_data_layout() {
        assert_eq!(std::mem::size_of::<InstanceData>(), 128);
        let data = InstanceData::new(
            &DrawInstance {
                slot: 0,
                model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
                normal: Mat3::IDENTITY,
            },
            Vec4::ONE,
        );
        assert_eq!(data.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(data.normal[1], [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(data.color, [1.0; 4]);
    }
}
