pub mod authenticator;
pub mod bill_downloader;
pub mod diagnostic_writer;
pub mod output_writer;
pub mod record_extractor;
pub mod statement_downloader;

pub use authenticator::{Credentials, LoginState, SessionAuthenticator};
pub use bill_downloader::BillDownloader;
pub use diagnostic_writer::DiagnosticWriter;
pub use output_writer::OutputWriter;
pub use record_extractor::{Extraction, RecordExtractor};
pub use statement_downloader::{StatementDownloader, StatementSummary};
