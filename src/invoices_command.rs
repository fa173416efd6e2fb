use anyhow::Result;
use log::info;

use crate::console::ConsolePresenter;
use crate::state::AppState;

/// 発行済み請求書の履歴を管理するサブコマンド。
#[derive(Debug, clap::Subcommand)]
pub enum InvoicesCommand {
    /// List generated invoices
    List,
    /// Delete a generated invoice by its list position
    Delete {
        #[clap(help = "Position shown by `invoices list`")]
        index: usize,
    },
}

impl InvoicesCommand {
    /// サブコマンドを実行する。状態を変更した場合は`true`を返す。
    pub fn run<P: ConsolePresenter>(self, state: &mut AppState, presenter: &mut P) -> Result<bool> {
        match self {
            InvoicesCommand::List => {
                presenter.show_invoices(&state.generated_invoices)?;
                Ok(false)
            }
            InvoicesCommand::Delete { index } => {
                let removed = state.delete_invoice(index)?;
                info!("Invoice deleted: {}", removed.number);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InvoicesCommand;
    use crate::console::ConsoleMarkdownList;
    use crate::state::test_utils::record;
    use crate::state::AppState;
    use crate::warning::Warning;

    #[test]
    fn test_delete_then_list() {
        let mut state = AppState::default();
        state.generated_invoices.push(record("INV-202403-00001"));
        state.generated_invoices.push(record("INV-202403-00002"));
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        assert!(InvoicesCommand::Delete { index: 0 }
            .run(&mut state, &mut presenter)
            .unwrap());
        assert!(!InvoicesCommand::List.run(&mut state, &mut presenter).unwrap());

        let output = String::from_utf8(writer).unwrap();
        assert!(output.contains("[0] INV-202403-00002"));
        assert!(!output.contains("INV-202403-00001"));
    }

    #[test]
    fn test_delete_out_of_range() {
        let mut state = AppState::default();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        let error = InvoicesCommand::Delete { index: 3 }
            .run(&mut state, &mut presenter)
            .unwrap_err();

        assert_eq!(error.downcast_ref::<Warning>(), Some(&Warning::InvoiceNotFound(3)));
    }
}
