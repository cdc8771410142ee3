pub mod ai;
pub mod collision;
pub mod entity;
pub mod inventory;
pub mod object;
pub mod tile;
