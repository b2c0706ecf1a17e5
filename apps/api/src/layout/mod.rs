// Layout: document → visual tree → fit plan.
// Everything here is pure and CPU-bound. Callers on the async runtime run the
// heavy parts (render, estimate) inside tokio::task::spawn_blocking.

pub mod fit;
pub mod font_metrics;
pub mod geometry;
pub mod preview;
pub mod renderer;
pub mod templates;
pub mod visual_tree;
