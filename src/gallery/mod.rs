pub mod color;
pub mod renderer;
