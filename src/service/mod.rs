pub mod chat_service;
pub mod document;
pub mod ollama_service;
