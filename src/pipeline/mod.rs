pub mod command;
pub mod conversion;
pub mod filters;
pub mod font;
pub mod preview;
pub mod resize;
pub mod scale_bar;
