pub mod epitopes;
pub mod rank;
