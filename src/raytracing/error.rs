//! Error types for scene construction and frame output.
//!
//! Numeric degeneracies inside the renderer are never errors; these only
//! cover the surrounding plumbing (files, scene descriptions, sinks).

use thiserror::Error;

use super::parser::ParserError;
use super::transform::TransformId;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot load model: {0}")]
    Obj(#[from] obj::ObjError),

    #[error("scene description error: {0}")]
    Parse(#[from] ParserError),

    #[error("unknown material preset '{0}'")]
    UnknownMaterial(String),

    #[error("unknown demo scene '{0}'")]
    UnknownDemo(String),

    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    TransformCycle {
        child: TransformId,
        parent: TransformId,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("frame buffer of {len} bytes does not match {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },
}

pub type SceneResult<T> = std::result::Result<T, SceneError>;
pub type RenderResult<T> = std::result::Result<T, RenderError>;
