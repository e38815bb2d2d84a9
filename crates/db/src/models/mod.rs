pub mod cwv;
