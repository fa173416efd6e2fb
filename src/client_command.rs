use anyhow::Result;
use log::info;

use crate::console::ConsolePresenter;
use crate::datetime;
use crate::state::{AppState, Client, DEFAULT_TAX_NAME};
use crate::time_entry::Project;
use crate::warning::Warning;

/// クライアントの登録内容。
#[derive(Debug, clap::Args)]
pub struct ClientFields {
    #[clap(long = "name", help = "Client name")]
    pub name: String,

    #[clap(long = "rate", help = "Hourly rate")]
    pub hourly_rate: f64,

    #[clap(long = "email", default_value = "")]
    pub email: String,

    #[clap(long = "address", default_value = "")]
    pub address: String,

    #[clap(long = "tax-name", default_value = DEFAULT_TAX_NAME)]
    pub tax_name: String,

    #[clap(long = "tax-rate", default_value_t = 0.0, help = "Tax rate in percent")]
    pub tax_rate: f64,

    #[clap(long = "tax", help = "Add tax to the subtotal")]
    pub tax_enabled: bool,
}

impl ClientFields {
    fn into_client(self, id: String) -> Client {
        Client {
            id,
            name: self.name,
            email: self.email,
            address: self.address,
            hourly_rate: self.hourly_rate,
            tax_name: if self.tax_name.is_empty() {
                DEFAULT_TAX_NAME.to_string()
            } else {
                self.tax_name
            },
            tax_rate: self.tax_rate,
            tax_enabled: self.tax_enabled,
        }
    }
}

/// クライアントとプロジェクト割り当てを管理するサブコマンド。
#[derive(Debug, clap::Subcommand)]
pub enum ClientCommand {
    /// Add a client
    Add(ClientFields),
    /// Replace a client's details
    Update {
        #[clap(long = "id")]
        id: String,
        #[clap(flatten)]
        fields: ClientFields,
    },
    /// Remove a client and its project assignments
    Remove {
        #[clap(long = "id")]
        id: String,
    },
    /// List clients
    List,
    /// Assign a project to a client
    Assign {
        #[clap(long = "project", default_value = "")]
        project: String,
        #[clap(long = "client", default_value = "")]
        client: String,
    },
    /// Remove a project assignment
    Unassign {
        #[clap(long = "project")]
        project: String,
    },
    /// List project assignments
    Assignments,
}

impl ClientCommand {
    /// プロジェクト一覧の取得が必要かどうか。
    pub fn needs_projects(&self) -> bool {
        matches!(self, ClientCommand::Assignments)
    }

    /// サブコマンドを実行する。状態を変更した場合は`true`を返す。
    ///
    /// # Arguments
    ///
    /// * `state` - 操作対象の状態
    /// * `projects` - 割り当て一覧の表示に使うプロジェクト一覧
    /// * `presenter` - 一覧の出力先
    pub fn run<P: ConsolePresenter>(
        self,
        state: &mut AppState,
        projects: &[Project],
        presenter: &mut P,
    ) -> Result<bool> {
        match self {
            ClientCommand::Add(fields) => {
                let id = datetime::now().timestamp_millis().to_string();
                let client = fields.into_client(id);
                info!("Client added: {} ({})", client.name, client.id);
                state.upsert_client(client);
                Ok(true)
            }
            ClientCommand::Update { id, fields } => {
                if state.find_client(&id).is_none() {
                    return Err(Warning::ClientNotFound(id).into());
                }
                state.upsert_client(fields.into_client(id.clone()));
                info!("Client updated: {}", id);
                Ok(true)
            }
            ClientCommand::Remove { id } => {
                let removed = state.remove_client(&id)?;
                info!("Client deleted: {}", removed.name);
                Ok(true)
            }
            ClientCommand::List => {
                presenter.show_clients(&state.clients, &state.project_assignments)?;
                Ok(false)
            }
            ClientCommand::Assign { project, client } => {
                state.assign_project(&project, &client)?;
                info!("Project {} assigned to {}", project, client);
                Ok(true)
            }
            ClientCommand::Unassign { project } => {
                let removed = state.unassign_project(&project);
                if removed {
                    info!("Assignment removed: {}", project);
                }
                Ok(removed)
            }
            ClientCommand::Assignments => {
                presenter.show_assignments(&state.project_assignments, projects, &state.clients)?;
                Ok(false)
            }
        }
    }
}
