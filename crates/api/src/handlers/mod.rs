pub mod cwv;
pub mod health;
