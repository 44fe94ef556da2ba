pub mod flight;
pub mod pilot;
pub mod pirep;
pub mod service;
pub mod validation;
