//! biosketch-canvas: the illustrations that accompany each reply.
//!
//! ```text
//! drawing key ──► sketches::sketch ──► timed shape steps ──► SvgCanvas (800×600)
//!             └─► scene::build_scene ──► nodes + motions ──► pose_at(t) / JSON
//! ```
//!
//! [`IllustrationPlayer`] owns both and plays keys one by one, as a fixed-step
//! sequence or against a reply [`biosketch_core::Timeline`].

pub mod canvas;
pub mod error;
pub mod player;
pub mod scene;
pub mod sketches;

pub use canvas::{PathOp, Shape, Style, SvgCanvas, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use error::{CanvasError, CanvasResult};
pub use player::{IllustrationPlayer, Outputs, CLEARED_ACTION, INITIAL_ACTION};
pub use scene::{build_scene, Axis, Frame, Motion, Node, Pose, Primitive, Scene};
pub use sketches::{arrow, bacterium, sketch, Sketch, SketchStep};
