//! Pipeline stages for narrated-deck conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and implementations (rendering engine, generation backend) can be
//! swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─▶ render ────┐
//! input ─────┤  (pdfium)    ├─▶ encode ─▶ narrate ─▶ assemble
//! (URL/path) └─▶ visualize ─┘  (PNG/b64)  (llm +     (deck)
//!               (layout+paint)             postprocess)
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]    — rasterise a PDF page; the [`render::RenderEngine`] seam
//! 3. [`visualize`] — lay out an existing slide's shapes and have the engine paint them
//! 4. [`encode`]    — PNG-encode images for the backend, the deck and previews
//! 5. [`narrate`]   — resolve narration through the fallback chain
//! 6. [`llm`]       — the [`llm::NarrationBackend`] seam and its LLM implementation
//! 7. [`postprocess`] — deterministic cleanup of backend output
//! 8. [`assemble`]  — aspect-fit image placement and notes on the output deck

pub mod assemble;
pub mod encode;
pub mod input;
pub mod llm;
pub mod narrate;
pub mod postprocess;
pub mod render;
pub mod visualize;
