use thiserror::Error;

/// 利用者の入力に起因する警告。
///
/// 処理は状態を変更せずに中断し、`main`で警告として表示される。
/// `anyhow::Error`に包んで返し、`downcast_ref`で区別する。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Warning {
    #[error("Please select a client")]
    NoClientSelected,

    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("This client has no projects assigned")]
    NoProjectsAssigned,

    #[error("Please select both a project and a client")]
    IncompleteAssignment,

    #[error("Please enter both start and end dates for custom range")]
    MissingCustomRange,

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("No time tracked for this client in the selected period")]
    NothingToBill,

    #[error("Invoice #{0} does not exist")]
    InvoiceNotFound(usize),
}
