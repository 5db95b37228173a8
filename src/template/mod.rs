// Template compilation and rendering: a fixed placeholder vocabulary
// compiled once per template version, then rendered by a single straight
// walk over the result with no further parsing.

pub mod compiler;
pub mod plan;
pub mod renderer;

pub use compiler::TemplateCompiler;
pub use plan::{Chunk, Placeholder, Plan, RenderData};
pub use renderer::FastRenderer;
