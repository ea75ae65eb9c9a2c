//! Diesel row models and their conversions into domain types.

pub mod booking;
pub mod clinic;
pub mod config;
pub mod dental_chart;
pub mod document;
pub mod hotel;
pub mod message;
pub mod package;
pub mod quote;
pub mod quote_draft;
pub mod special_offer;
pub mod treatment;
pub mod treatment_plan;
pub mod user;
pub mod zmq;
