//! Back-office console for travel services data: suppliers, accounts and
//! booking monitoring, each shown as an independently filterable section.

pub mod controller;
pub mod domain;
pub mod filter;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod portal;
pub mod records;
pub mod section;
pub mod session;
pub mod ui;
