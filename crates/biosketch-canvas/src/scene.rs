//! 3D illustrations as a flat scene graph of primitive meshes.
//!
//! Nodes carry a rest pose plus a list of motions evaluated per frame
//! (bob, spin, sway, pulse). Rendering is left to whoever consumes the JSON
//! export; [`Scene::pose_at`] samples the animation at any time.

use crate::error::CanvasResult;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;

/// Camera position shared by every scene.
pub const CAMERA: [f64; 3] = [0.0, 0.0, 8.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Capsule { radius: f64, length: f64 },
    RoundedBox { width: f64, height: f64, depth: f64, radius: f64 },
    TorusKnot { radius: f64, tube: f64 },
    Torus { radius: f64, tube: f64 },
    Sphere { radius: f64 },
    Cone { radius: f64, height: f64, segments: u32 },
    Ring { inner: f64, outer: f64 },
    /// Billboard text or emoji.
    Label { text: String, size: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Per-frame offset applied on top of a node's rest pose. `t` is seconds since the scene appeared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Motion {
    /// rotation[axis] += t * speed
    Spin { axis: Axis, speed: f64 },
    /// position.y += sin(t * speed) * amplitude
    Bob { amplitude: f64, speed: f64 },
    /// rotation[axis] += sin(t * speed) * amplitude
    Sway { axis: Axis, amplitude: f64, speed: f64 },
    /// scale.x = 1 + sin(t * speed) * amplitude, scale.y = 1 + cos(t * speed) * amplitude
    Pulse { amplitude: f64, speed: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub primitive: Primitive,
    pub color: String,
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: f64,
    pub motions: Vec<Motion>,
    /// Seconds after the scene starts before this node shows up.
    pub appear_at: f64,
}

impl Node {
    fn new(name: &str, primitive: Primitive, color: &str, position: [f64; 3]) -> Self {
        Self {
            name: name.to_string(),
            primitive,
            color: color.to_string(),
            position,
            rotation: [0.0; 3],
            scale: 1.0,
            motions: Vec::new(),
            appear_at: 0.0,
        }
    }

    fn rotated(mut self, rotation: [f64; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    fn moving(mut self, motion: Motion) -> Self {
        self.motions.push(motion);
        self
    }

    fn appearing_at(mut self, at: f64) -> Self {
        self.appear_at = at;
        self
    }

    /// Pose of this node at `t` seconds into the scene.
    pub fn pose_at(&self, t: f64) -> Pose {
        let visible = t >= self.appear_at;
        let local = (t - self.appear_at).max(0.0);
        let mut position = self.position;
        let mut rotation = self.rotation;
        let mut scale = [self.scale; 3];
        for motion in &self.motions {
            match *motion {
                Motion::Spin { axis, speed } => rotation[axis.index()] += local * speed,
                Motion::Bob { amplitude, speed } => position[1] += (local * speed).sin() * amplitude,
                Motion::Sway { axis, amplitude, speed } => {
                    rotation[axis.index()] += (local * speed).sin() * amplitude
                }
                Motion::Pulse { amplitude, speed } => {
                    scale[0] *= 1.0 + (local * speed).sin() * amplitude;
                    scale[1] *= 1.0 + (local * speed).cos() * amplitude;
                }
            }
        }
        Pose {
            name: self.name.clone(),
            position,
            rotation,
            scale,
            visible,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub name: String,
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
    pub visible: bool,
}

/// Sampled poses of every node at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub poses: Vec<Pose>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub key: String,
    pub camera: [f64; 3],
    pub nodes: Vec<Node>,
}

impl Scene {
    fn new(key: &str, nodes: Vec<Node>) -> Self {
        Self {
            key: key.to_string(),
            camera: CAMERA,
            nodes,
        }
    }

    pub fn pose_at(&self, t: f64) -> Vec<Pose> {
        self.nodes.iter().map(|n| n.pose_at(t)).collect()
    }

    /// Frames sampled at `fps` from 0 to `duration` seconds inclusive.
    pub fn frames(&self, duration: f64, fps: u32) -> Vec<Frame> {
        let fps = fps.max(1);
        let count = (duration.max(0.0) * fps as f64).floor() as usize;
        (0..=count)
            .map(|i| {
                let time = i as f64 / fps as f64;
                Frame {
                    time,
                    poses: self.pose_at(time),
                }
            })
            .collect()
    }

    /// Scene plus a short sampled animation, as pretty JSON.
    pub fn to_json(&self, duration: f64, fps: u32) -> CanvasResult<String> {
        let export = SceneExport {
            scene: self,
            frames: self.frames(duration, fps),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    pub fn save(&self, path: &Path, duration: f64, fps: u32) -> CanvasResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json(duration, fps)?)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SceneExport<'a> {
    scene: &'a Scene,
    frames: Vec<Frame>,
}

/// Scene for `key`. Keys without a dedicated scene show the probiotic box.
pub fn build_scene(key: &str) -> Scene {
    let (key, nodes) = match key {
        "intestino" | "intestino_lento" => (key, healthy_intestine()),
        "intestino_inflamado" => (key, inflamed_intestine()),
        "bacterias" => (key, colony()),
        "bacterias_buenas" => (key, good_bacteria()),
        "bacterias_malas" => (key, bad_bacteria()),
        "batalla" => (key, battle()),
        "equilibrio" => {
            let mut nodes = healthy_intestine();
            nodes.extend(colony().into_iter().map(|n| n.appearing_at(0.5)));
            (key, nodes)
        }
        "defensas" | "escudo" => (key, immune_system()),
        "digestion" | "estomago" | "nutrientes" => (key, digestive_process()),
        "alivio" => (key, relief()),
        "probioticos" => (key, pill()),
        _ => ("probiotico", probiotic_box()),
    };
    Scene::new(key, nodes)
}

fn probiotic_box() -> Vec<Node> {
    vec![
        Node::new(
            "probiotic",
            Primitive::RoundedBox {
                width: 1.5,
                height: 3.0,
                depth: 1.5,
                radius: 0.2,
            },
            "#FF6B6B",
            [0.0; 3],
        )
        .moving(Motion::Spin { axis: Axis::Y, speed: 0.3 })
        .moving(Motion::Bob { amplitude: 0.2, speed: 1.0 }),
        Node::new(
            "label",
            Primitive::Label {
                text: "ProBio+".to_string(),
                size: 0.3,
            },
            "#FFFFFF",
            [0.0, 0.0, 0.76],
        )
        .moving(Motion::Spin { axis: Axis::Y, speed: 0.3 })
        .moving(Motion::Bob { amplitude: 0.2, speed: 1.0 }),
    ]
}

fn pill() -> Vec<Node> {
    let capsule = |name: &str, color: &str, y: f64| {
        Node::new(name, Primitive::Capsule { radius: 0.5, length: 1.0 }, color, [0.0, y, 0.0])
            .moving(Motion::Spin { axis: Axis::Y, speed: 0.3 })
            .moving(Motion::Sway {
                axis: Axis::Z,
                amplitude: 0.1,
                speed: 1.0,
            })
    };
    vec![capsule("pill_top", "#FF6B6B", 0.5), capsule("pill_bottom", "#4ECDC4", -0.5)]
}

fn healthy_intestine() -> Vec<Node> {
    vec![Node::new(
        "intestine",
        Primitive::TorusKnot { radius: 2.0, tube: 0.6 },
        "#4ECDC4",
        [0.0; 3],
    )
    .moving(Motion::Sway {
        axis: Axis::Z,
        amplitude: 0.1,
        speed: 0.5,
    })]
}

fn inflamed_intestine() -> Vec<Node> {
    vec![Node::new(
        "inflamed_intestine",
        Primitive::TorusKnot { radius: 2.0, tube: 0.8 },
        "#FF4444",
        [0.0; 3],
    )
    .moving(Motion::Pulse { amplitude: 0.1, speed: 2.0 })]
}

fn bacterium(name: &str, color: &str, position: [f64; 3], scale: f64) -> Vec<Node> {
    let float = |node: Node| {
        node.scaled(scale)
            .moving(Motion::Spin { axis: Axis::Y, speed: 0.5 })
            .moving(Motion::Bob { amplitude: 0.1, speed: 2.0 })
    };
    let at = |dx: f64, dy: f64, dz: f64| {
        [
            position[0] + dx * scale,
            position[1] + dy * scale,
            position[2] + dz * scale,
        ]
    };
    vec![
        float(Node::new(name, Primitive::Sphere { radius: 0.5 }, color, position)),
        float(Node::new(
            &format!("{}_eye_left", name),
            Primitive::Sphere { radius: 0.08 },
            "#FFFFFF",
            at(-0.15, 0.1, 0.4),
        )),
        float(Node::new(
            &format!("{}_eye_right", name),
            Primitive::Sphere { radius: 0.08 },
            "#FFFFFF",
            at(0.15, 0.1, 0.4),
        )),
        float(Node::new(
            &format!("{}_pupil_left", name),
            Primitive::Sphere { radius: 0.04 },
            "#000000",
            at(-0.15, 0.1, 0.45),
        )),
        float(Node::new(
            &format!("{}_pupil_right", name),
            Primitive::Sphere { radius: 0.04 },
            "#000000",
            at(0.15, 0.1, 0.45),
        )),
    ]
}

fn colony() -> Vec<Node> {
    let members: [([f64; 3], &str, f64); 5] = [
        ([-2.0, 1.0, 0.0], "#4CAF50", 1.0),
        ([2.0, -1.0, 0.0], "#66BB6A", 0.8),
        ([0.0, 0.0, 1.0], "#81C784", 1.2),
        ([-1.0, -1.5, -1.0], "#4CAF50", 0.9),
        ([1.5, 1.5, -0.5], "#66BB6A", 1.1),
    ];
    members
        .iter()
        .enumerate()
        .flat_map(|(i, (pos, color, scale))| bacterium(&format!("bacterium_{}", i + 1), color, *pos, *scale))
        .collect()
}

fn good_bacterium(name: &str, position: [f64; 3]) -> Vec<Node> {
    vec![
        Node::new(name, Primitive::Sphere { radius: 0.5 }, "#4CAF50", position)
            .moving(Motion::Bob { amplitude: 0.1, speed: 2.0 }),
        Node::new(
            &format!("{}_face", name),
            Primitive::Label {
                text: "😊".to_string(),
                size: 0.4,
            },
            "#FFFFFF",
            [position[0], position[1], position[2] + 0.55],
        )
        .moving(Motion::Bob { amplitude: 0.1, speed: 2.0 }),
    ]
}

fn bad_bacterium(name: &str, position: [f64; 3]) -> Vec<Node> {
    vec![
        Node::new(
            name,
            Primitive::Cone {
                radius: 0.5,
                height: 1.0,
                segments: 6,
            },
            "#E91E63",
            position,
        )
        .moving(Motion::Spin { axis: Axis::Z, speed: 2.0 }),
        Node::new(
            &format!("{}_face", name),
            Primitive::Label {
                text: "😈".to_string(),
                size: 0.4,
            },
            "#FFFFFF",
            [position[0], position[1], position[2] + 0.55],
        ),
    ]
}

fn good_bacteria() -> Vec<Node> {
    [[-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, -2.0, 0.0]]
        .iter()
        .enumerate()
        .flat_map(|(i, p)| good_bacterium(&format!("good_{}", i + 1), *p))
        .collect()
}

fn bad_bacteria() -> Vec<Node> {
    [[-2.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, -2.0, 0.0]]
        .iter()
        .enumerate()
        .flat_map(|(i, p)| bad_bacterium(&format!("bad_{}", i + 1), *p))
        .collect()
}

fn battle() -> Vec<Node> {
    let good = [[-2.0, 1.0, 0.0], [-2.5, -1.0, 0.0], [-1.5, 0.0, 1.0]];
    let bad = [[2.0, 1.0, 0.0], [2.5, -1.0, 0.0], [1.5, 0.0, -1.0]];
    let mut nodes: Vec<Node> = good
        .iter()
        .enumerate()
        .flat_map(|(i, p)| good_bacterium(&format!("good_{}", i + 1), *p))
        .collect();
    nodes.extend(
        bad.iter()
            .enumerate()
            .flat_map(|(i, p)| bad_bacterium(&format!("bad_{}", i + 1), *p)),
    );
    nodes
}

fn immune_system() -> Vec<Node> {
    vec![
        Node::new(
            "shield_ring",
            Primitive::Ring { inner: 2.0, outer: 2.5 },
            "#2196F3",
            [0.0; 3],
        )
        .rotated([PI / 2.0, 0.0, 0.0])
        .moving(Motion::Spin { axis: Axis::Z, speed: 0.5 }),
        Node::new("core", Primitive::Sphere { radius: 1.5 }, "#64B5F6", [0.0; 3]),
        Node::new(
            "emblem",
            Primitive::Label {
                text: "🛡️".to_string(),
                size: 1.0,
            },
            "#FFFFFF",
            [0.0, 0.0, 1.6],
        ),
    ]
}

fn digestive_process() -> Vec<Node> {
    let group = Motion::Spin { axis: Axis::Y, speed: 0.2 };
    vec![
        Node::new("stomach", Primitive::Sphere { radius: 1.0 }, "#FFB74D", [0.0, 2.0, 0.0]).moving(group),
        Node::new(
            "intestine",
            Primitive::Torus { radius: 1.5, tube: 0.5 },
            "#4FC3F7",
            [0.0, -1.0, 0.0],
        )
        .moving(group),
    ]
}

fn relief() -> Vec<Node> {
    vec![
        Node::new("glow", Primitive::Sphere { radius: 1.2 }, "#C8E6C9", [0.0; 3])
            .moving(Motion::Bob { amplitude: 0.2, speed: 1.0 }),
        Node::new(
            "face",
            Primitive::Label {
                text: "😌".to_string(),
                size: 1.2,
            },
            "#4CAF50",
            [0.0, 0.0, 1.3],
        )
        .moving(Motion::Bob { amplitude: 0.2, speed: 1.0 }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn probiotic_box_spins_and_bobs() {
        let scene = build_scene("probiotico");
        let poses = scene.pose_at(PI / 2.0);
        assert!(close(poses[0].rotation[1], PI / 2.0 * 0.3));
        assert!(close(poses[0].position[1], 0.2));
    }

    #[test]
    fn unknown_key_shows_the_probiotic_box() {
        let scene = build_scene("dragon");
        assert_eq!(scene.key, "probiotico");
        assert!(matches!(scene.nodes[0].primitive, Primitive::RoundedBox { .. }));
        assert_eq!(scene.camera, [0.0, 0.0, 8.0]);
    }

    #[test]
    fn probiotics_show_the_two_tone_pill() {
        let scene = build_scene("probioticos");
        assert_eq!(scene.nodes.len(), 2);
        assert!(matches!(scene.nodes[1].primitive, Primitive::Capsule { .. }));
        assert_eq!(scene.nodes[1].color, "#4ECDC4");
    }

    #[test]
    fn inflamed_intestine_pulses() {
        let scene = build_scene("intestino_inflamado");
        let poses = scene.pose_at(PI / 4.0);
        assert!(close(poses[0].scale[0], 1.1));
        assert!(close(poses[0].scale[1], 1.0));
    }

    #[test]
    fn colony_has_five_bacteria_with_eyes() {
        let scene = build_scene("bacterias");
        assert_eq!(scene.nodes.len(), 25);
        let third = scene.nodes.iter().find(|n| n.name == "bacterium_3").unwrap();
        assert_eq!(third.scale, 1.2);
        assert_eq!(third.color, "#81C784");
    }

    #[test]
    fn equilibrium_adds_bacteria_after_half_a_second() {
        let scene = build_scene("equilibrio");
        let early = scene.pose_at(0.2);
        assert!(early[0].visible);
        assert_eq!(early.iter().filter(|p| p.visible).count(), 1);
        assert!(scene.pose_at(0.5).iter().all(|p| p.visible));
    }

    #[test]
    fn bad_bacteria_spin_on_z() {
        let scene = build_scene("bacterias_malas");
        let pose = scene.pose_at(1.0);
        assert!(close(pose[0].rotation[2], 2.0));
    }

    #[test]
    fn frames_cover_duration_inclusive() {
        let scene = build_scene("alivio");
        let frames = scene.frames(1.0, 10);
        assert_eq!(frames.len(), 11);
        assert!(close(frames[10].time, 1.0));
    }

    #[test]
    fn json_export_is_parseable() {
        let json = build_scene("batalla").to_json(0.5, 4).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["scene"]["key"], "batalla");
        assert_eq!(value["frames"].as_array().unwrap().len(), 3);
        assert_eq!(value["scene"]["nodes"][0]["primitive"]["type"], "sphere");
    }
}
