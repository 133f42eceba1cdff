pub mod events;
pub mod orchestrator;
pub mod upload_service;
