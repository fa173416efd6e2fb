use log::{debug, info};

use crate::state::InvoiceRecord;

/// `InvoiceSession::finalize`の結果。
#[derive(Debug, PartialEq, Eq)]
pub enum Finalize {
    /// 履歴に追加した。保存が必要。
    Appended,
    /// このプレビューは既に保存済み、または同じ番号が履歴にある。
    AlreadySaved,
    /// プレビュー中の請求書が無い。
    NothingPending,
}

/// プレビュー中の請求書を保持し、履歴への追加を一度だけ行う。
///
/// 印刷の操作が二重に発生しても、同じ請求書が二度追加されることはない。
#[derive(Debug, Default)]
pub struct InvoiceSession {
    pending: Option<InvoiceRecord>,
    saved: bool,
}

impl InvoiceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しいプレビューに差し替える。保存済みフラグはここでのみ戻る。
    pub fn preview(&mut self, record: InvoiceRecord) {
        debug!("Pending invoice {}", record.number);
        self.pending = Some(record);
        self.saved = false;
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<&InvoiceRecord> {
        self.pending.as_ref()
    }

    /// プレビュー中の請求書を履歴に追加する。
    ///
    /// 同じ番号が既に履歴にある場合は何もしない。
    pub fn finalize(&mut self, history: &mut Vec<InvoiceRecord>) -> Finalize {
        let Some(pending) = self.pending.as_ref() else {
            return Finalize::NothingPending;
        };
        if self.saved {
            return Finalize::AlreadySaved;
        }
        if history.iter().any(|invoice| invoice.number == pending.number) {
            self.saved = true;
            return Finalize::AlreadySaved;
        }

        info!("Invoice {} added to history", pending.number);
        history.push(pending.clone());
        self.saved = true;
        Finalize::Appended
    }
}

#[cfg(test)]
mod tests {
    use super::{Finalize, InvoiceSession};
    use crate::state::test_utils::record;

    #[test]
    fn test_finalize_twice_appends_once() {
        let mut history = Vec::new();
        let mut session = InvoiceSession::new();
        session.preview(record("INV-202403-00001"));

        assert_eq!(session.finalize(&mut history), Finalize::Appended);
        assert_eq!(session.finalize(&mut history), Finalize::AlreadySaved);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_finalize_without_preview() {
        let mut history = Vec::new();
        let mut session = InvoiceSession::new();

        assert_eq!(session.finalize(&mut history), Finalize::NothingPending);
        assert!(history.is_empty());
    }

    /// 履歴に同じ番号がある場合は追加しない。
    #[test]
    fn test_finalize_existing_number_is_noop() {
        let mut history = vec![record("INV-202403-00001")];
        let mut session = InvoiceSession::new();
        session.preview(record("INV-202403-00001"));

        assert_eq!(session.finalize(&mut history), Finalize::AlreadySaved);
        assert_eq!(history.len(), 1);
    }

    /// 保存後に履歴から消えても、同じプレビューからは再追加しない。
    #[test]
    fn test_saved_flag_blocks_second_append_without_collision() {
        let mut history = Vec::new();
        let mut session = InvoiceSession::new();
        session.preview(record("INV-202403-00001"));
        session.finalize(&mut history);
        history.clear();

        assert_eq!(session.finalize(&mut history), Finalize::AlreadySaved);
        assert!(history.is_empty());
    }

    #[test]
    fn test_new_preview_resets_flag() {
        let mut history = Vec::new();
        let mut session = InvoiceSession::new();
        session.preview(record("INV-202403-00001"));
        session.finalize(&mut history);

        session.preview(record("INV-202403-00002"));

        assert_eq!(session.finalize(&mut history), Finalize::Appended);
        assert_eq!(history.len(), 2);
        assert_eq!(session.pending().map(|r| r.number.as_str()), Some("INV-202403-00002"));
    }
}
