pub mod iloc;
