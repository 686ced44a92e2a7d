pub mod evidence;
pub mod peptides;
pub mod predict;
pub mod ranking;
pub mod result;
pub mod variant;
pub mod workflows;
pub mod writers;
