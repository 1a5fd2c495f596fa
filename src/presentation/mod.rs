//! Page templates and the view data handed to them.

pub mod pages;
pub mod views;
