mod controls;
mod details;
mod panels;
pub(super) mod palette;
