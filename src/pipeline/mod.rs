//! Pipeline stages around the verification core.
//!
//! Each submodule implements exactly one transformation step and talks to at
//! most one external system, so each can be tested or replaced alone.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ encode ──▶ classify ──▶ crate::verify
//! (URL/path) (pdfium)   (base64)   (VLM)        (pure)
//! ```
//!
//! 1. [`input`]    — load the user-supplied path or URL into memory and sniff
//!    whether it is a PDF or a bare image
//! 2. [`extract`]  — pull embedded raster images out of the PDF; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]   — JPEG-encode and base64-wrap each image for the
//!    multimodal request body
//! 4. [`classify`] — drive the VLM call with retry/backoff; the only stage
//!    talking to the model

pub mod classify;
pub mod encode;
pub mod extract;
pub mod input;
