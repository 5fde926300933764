pub mod domain;
pub mod extractor;
pub mod history;
pub mod login_guard;
pub mod pipeline;
pub mod ports;
pub mod rate_limit;
pub mod session;

pub use domain::{
    download_file_name, Account, AccountCredentials, ExtractionWarning, HistoryEntry, Reservation,
    SummaryOutcome,
};
pub use extractor::{extract_text, Extraction};
pub use history::HistoryLog;
pub use login_guard::{LockedOut, LoginGuard};
pub use pipeline::{Admission, PipelineError, PipelineSettings, SummaryPipeline};
pub use ports::{
    AccountStore, CreditLedger, PortError, PortResult, RenderError, RenderService,
    SummarizationError, SummaryService,
};
pub use rate_limit::{RateDecision, RateLimiter};
pub use session::{SessionContext, SessionRegistry};
