use anyhow::Result;
use log::info;

use crate::console::ConsolePresenter;
use crate::state::{AppState, MyDetails};

/// 請求書に載せる自分の情報を管理するサブコマンド。
#[derive(Debug, clap::Subcommand)]
pub enum DetailsCommand {
    /// Replace your details
    Set {
        #[clap(long = "name")]
        name: String,
        #[clap(long = "email", default_value = "")]
        email: String,
        #[clap(long = "phone", default_value = "")]
        phone: String,
        #[clap(long = "address", default_value = "")]
        address: String,
        #[clap(long = "website", default_value = "")]
        website: String,
        #[clap(long = "tax-id-label", default_value = "")]
        tax_id_label: String,
        #[clap(long = "tax-id", default_value = "")]
        tax_id: String,
        #[clap(long = "bank", default_value = "")]
        bank_details: String,
        #[clap(long = "invoice-title", default_value = "")]
        invoice_title: String,
        #[clap(long = "invoice-message", default_value = "")]
        invoice_message: String,
    },
    /// Show your details
    Show,
}

impl DetailsCommand {
    /// サブコマンドを実行する。状態を変更した場合は`true`を返す。
    ///
    /// 空の項目は既定値で補う。
    pub fn run<P: ConsolePresenter>(self, state: &mut AppState, presenter: &mut P) -> Result<bool> {
        match self {
            DetailsCommand::Set {
                name,
                email,
                phone,
                address,
                website,
                tax_id_label,
                tax_id,
                bank_details,
                invoice_title,
                invoice_message,
            } => {
                state.my_details = MyDetails {
                    name,
                    email,
                    phone,
                    address,
                    website,
                    tax_id_label,
                    tax_id,
                    bank_details,
                    invoice_title,
                    invoice_message,
                }
                .with_defaults();
                info!("Your details saved successfully");
                presenter.show_details(&state.my_details)?;
                Ok(true)
            }
            DetailsCommand::Show => {
                presenter.show_details(&state.my_details)?;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DetailsCommand;
    use crate::console::ConsoleMarkdownList;
    use crate::state::AppState;

    #[test]
    fn test_set_applies_defaults() {
        let mut state = AppState::default();
        let command = DetailsCommand::Set {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: String::new(),
            address: String::new(),
            website: String::new(),
            tax_id_label: String::new(),
            tax_id: "DE123".to_string(),
            bank_details: String::new(),
            invoice_title: String::new(),
            invoice_message: String::new(),
        };
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        let changed = command.run(&mut state, &mut presenter).unwrap();

        assert!(changed);
        assert_eq!(state.my_details.invoice_title, "Invoice");
        assert_eq!(state.my_details.invoice_message, "Thank you for your business!");
        let output = String::from_utf8(writer).unwrap();
        assert!(output.contains("- Name: Jane Doe\n"));
        assert!(output.contains("- Tax ID: DE123\n"));
        assert!(!output.contains("Phone"));
    }
}
