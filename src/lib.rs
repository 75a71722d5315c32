pub mod config;
pub mod db;
pub mod error;
pub mod helpers;
pub mod routes;
pub mod state;
pub mod store;

pub mod auth {
    pub mod error;
    pub mod keys;
    pub mod token;
}

pub mod models {
    pub mod document;
    pub mod dto;
    pub mod session;
    pub mod speaker;
}

pub mod repositories {
    pub mod document;

    pub use document::DocumentRepository;

    /// Repository over the session container.
    pub type SessionRepository = DocumentRepository<crate::models::session::Session>;
    /// Repository over the speaker container.
    pub type SpeakerRepository = DocumentRepository<crate::models::speaker::Speaker>;
}

pub mod services {
    pub mod sessions;
    pub mod speakers;
}

pub mod handlers {
    pub mod health;
    pub mod sessions;
    pub mod speakers;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod guard;
}

pub mod validation {
    pub mod request;
}
