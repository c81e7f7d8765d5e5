pub mod api;
pub mod config;
pub mod flow;
pub mod id_document;
pub mod models;
pub mod processing;
pub mod session;
pub mod utils;
pub mod validation;
pub mod wizard;

pub use api::CheckInClient;
pub use config::KioskConfig;
pub use flow::FlowRouter;
pub use id_document::{IdCapture, IdDocumentReader};
pub use session::VisitorSession;
pub use utils::{CheckInError, Result};
pub use wizard::CheckInWizard;
