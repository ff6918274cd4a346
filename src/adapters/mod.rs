// Adapters layer: concrete implementations for external systems (Firebase, storage, http, serving).

pub mod auth;
pub mod credentials;
pub mod firebase;
pub mod firestore;
pub mod http;
pub mod realtime_db;
pub mod server;
pub mod storage;

pub use firebase::{connect_or_disconnected, DisconnectedSource, FirebaseSource};
pub use storage::LocalStorage;
