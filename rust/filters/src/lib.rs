//! Streaming filter stages over scene-description events.
//!
//! Stages are chained back to front with [`build_pipeline`]; each consumes
//! [`DocumentEvent`]s and forwards the (possibly rewritten) stream to its
//! downstream handler. Stages that need whole-node context buffer subtrees
//! with [`NodeBuilder`] and replay them with [`SceneNode::encode`].

pub mod combine;
pub mod context;
pub mod error;
pub mod flatten;
pub mod gen_normals;
pub mod generators;
pub mod identity;
pub mod index;
pub mod node;
pub mod pipeline;
pub mod recode;
pub mod triangulate;

pub use combine::CombineShape;
pub use context::DefMap;
pub use error::FilterError;
pub use flatten::FlattenTransform;
pub use gen_normals::GenNormals;
pub use generators::{generator_registry, GeometryGenerator};
pub use identity::Identity;
pub use index::Index;
pub use node::{FieldEntry, NodeBuilder, SceneNode};
pub use pipeline::{build_pipeline, send_all, DocumentHandler, EventCollector, FilterSpec};
pub use recode::{Encoding, Recode};
pub use triangulate::Triangulation;

pub use x3dfilter_core::DocumentEvent;
