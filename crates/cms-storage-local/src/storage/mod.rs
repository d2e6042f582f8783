mod local;

pub use local::LocalDocumentStore;
