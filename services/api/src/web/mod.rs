pub mod chat;
pub mod exams;
pub mod outreach;
pub mod protocol;
pub mod rest;
pub mod routine;
pub mod state;
pub mod subjects;

// Re-export the status handler to make it easily accessible
// to the binary that will build the web server router.
pub use rest::status_handler;
