pub mod entity;
pub mod item;
pub mod render_index;
pub mod shadow;
pub mod tile;
pub mod viewport;
