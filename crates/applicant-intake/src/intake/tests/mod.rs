mod common;
mod mapping;
mod service;
