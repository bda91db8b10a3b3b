//! Motive Core Primitives
//!
//! This crate provides the foundational value types for the Motive animation
//! runtime:
//!
//! - **Matrix**: 2D affine transforms with composition helpers
//! - **Point / Bounds**: the minimal geometry the runtime needs
//! - **Target**: the scene-graph seam an animation writes into
//!
//! # Example
//!
//! ```rust
//! use motive_core::Matrix;
//!
//! let m = Matrix::translate(10.0, 0.0).multiply(&Matrix::scale(2.0, 2.0));
//! let p = m.apply(1.0, 1.0);
//! assert_eq!(p, (12.0, 2.0));
//! ```

pub mod matrix;
pub mod target;

pub use matrix::{Matrix, Point};
pub use target::{Bounds, Target};
