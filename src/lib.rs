//! eportfolio - personal portfolio and blog site
//!
//! Portfolio pages, a blog with comments, a contact form and a newsletter whose
//! subscribers hear about every newly published article.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod templates;
