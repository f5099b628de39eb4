mod patterns;
mod qualitative;
mod request;
mod run;
mod sections;
mod similarity;

pub use request::{build_document, document_from_request};
pub use run::{PrecheckContext, run_precheck};
