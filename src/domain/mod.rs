//! Domain entities and value objects of the dental marketplace.

pub mod auth;
pub mod booking;
pub mod clinic;
pub mod dental_chart;
pub mod document;
pub mod hotel;
pub mod message;
pub mod package;
pub mod pricing;
pub mod quote;
pub mod quote_wizard;
pub mod special_offer;
pub mod treatment;
pub mod treatment_plan;
pub mod types;
pub mod user;
