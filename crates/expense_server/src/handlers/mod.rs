pub mod collaborators;
pub mod cycles;
pub mod expenses;
pub mod health;
pub mod roles;
