//! K.E.R.O.S. Runtime - Service lifecycle for the terminal backend
//!
//! Long-running components (the facility simulator, bridges to connected
//! terminals) are written as [`service::Service`] implementations and driven
//! by a [`service::ServiceManager`].

pub mod service;

pub use service::{
    Event, EventPublisher, Service, ServiceContext, ServiceError, ServiceHandle, ServiceManager,
    ServiceResult, ServiceSpec, ServiceState,
};
