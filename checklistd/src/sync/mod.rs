pub mod controller;
pub mod debounce;
pub mod paths;
