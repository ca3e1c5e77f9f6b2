pub mod clip;
pub mod drag;
pub mod fx;
pub mod interval;
pub mod schema;
pub mod selection;
pub mod state;
pub mod sticker;
pub mod timeline;
