use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::warning::Warning;

pub const DEFAULT_INVOICE_TITLE: &str = "Invoice";
pub const DEFAULT_INVOICE_MESSAGE: &str = "Thank you for your business!";
pub const DEFAULT_TAX_ID_LABEL: &str = "Tax ID";
pub const DEFAULT_TAX_NAME: &str = "Tax";

/// 請求書に印字する自分自身の情報。
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MyDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub tax_id_label: String,
    pub tax_id: String,
    pub bank_details: String,
    pub invoice_title: String,
    pub invoice_message: String,
}

impl MyDetails {
    /// 未設定の項目に既定値を入れる。
    pub fn with_defaults(mut self) -> Self {
        if self.invoice_title.is_empty() {
            self.invoice_title = DEFAULT_INVOICE_TITLE.to_string();
        }
        if self.invoice_message.is_empty() {
            self.invoice_message = DEFAULT_INVOICE_MESSAGE.to_string();
        }
        if self.tax_id_label.is_empty() {
            self.tax_id_label = DEFAULT_TAX_ID_LABEL.to_string();
        }
        self
    }

    /// `https://`の付いたWebサイトのURL。
    pub fn website_url(&self) -> Option<String> {
        match self.website.as_str() {
            "" => None,
            site if site.starts_with("http") => Some(site.to_string()),
            site => Some(format!("https://{}", site)),
        }
    }
}

/// 請求先のクライアント。
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub hourly_rate: f64,
    #[serde(default = "default_tax_name")]
    pub tax_name: String,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub tax_enabled: bool,
}

fn default_tax_name() -> String {
    DEFAULT_TAX_NAME.to_string()
}

/// 発行済み請求書の記録。作成後は変更されず、削除のみ行われる。
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub number: String,
    pub client_id: String,
    pub client_name: String,
    pub date: NaiveDate,
    pub period: String,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

/// 永続化されるアプリケーションの状態。
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub my_details: MyDetails,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients: Vec<Client>,
    /// プロジェクトID -> クライアントID
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_assignments: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub generated_invoices: Vec<InvoiceRecord>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl AppState {
    /// 保存されたJSONから状態を復元する。保存データが無い場合は空の状態になる。
    pub fn from_json(data: Option<&str>) -> Result<Self> {
        let state = match data {
            Some(data) => serde_json::from_str::<AppState>(data).context("Failed to parse saved state")?,
            None => AppState::default(),
        };
        Ok(AppState {
            my_details: state.my_details.with_defaults(),
            ..state
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize state")
    }

    pub fn find_client(&self, client_id: &str) -> Option<&Client> {
        self.clients.iter().find(|client| client.id == client_id)
    }

    /// クライアントを追加または更新する。更新した場合は`true`を返す。
    pub fn upsert_client(&mut self, client: Client) -> bool {
        match self.clients.iter_mut().find(|c| c.id == client.id) {
            Some(existing) => {
                *existing = client;
                true
            }
            None => {
                self.clients.push(client);
                false
            }
        }
    }

    /// クライアントを削除し、そのクライアントへのプロジェクト割り当ても外す。
    pub fn remove_client(&mut self, client_id: &str) -> Result<Client> {
        let position = self
            .clients
            .iter()
            .position(|client| client.id == client_id)
            .ok_or_else(|| Warning::ClientNotFound(client_id.to_string()))?;
        self.project_assignments
            .retain(|_, assigned| assigned.as_str() != client_id);
        Ok(self.clients.remove(position))
    }

    /// プロジェクトをクライアントに割り当てる。既存の割り当ては上書きされる。
    pub fn assign_project(&mut self, project_id: &str, client_id: &str) -> Result<()> {
        if project_id.is_empty() || client_id.is_empty() {
            return Err(Warning::IncompleteAssignment.into());
        }
        if self.find_client(client_id).is_none() {
            return Err(Warning::ClientNotFound(client_id.to_string()).into());
        }
        self.project_assignments
            .insert(project_id.to_string(), client_id.to_string());
        Ok(())
    }

    /// 割り当てを外す。割り当てが存在した場合は`true`を返す。
    pub fn unassign_project(&mut self, project_id: &str) -> bool {
        self.project_assignments.remove(project_id).is_some()
    }

    /// クライアントに割り当てられたプロジェクトID。
    pub fn client_project_ids(&self, client_id: &str) -> HashSet<String> {
        self.project_assignments
            .iter()
            .filter(|(_, assigned)| *assigned == client_id)
            .map(|(project_id, _)| project_id.clone())
            .collect()
    }

    /// これまでに発行した請求書番号。
    pub fn issued_numbers(&self) -> impl Iterator<Item = &str> {
        self.generated_invoices
            .iter()
            .map(|invoice| invoice.number.as_str())
    }

    /// 一覧の位置を指定して請求書の記録を削除する。番号は再利用されない。
    pub fn delete_invoice(&mut self, index: usize) -> Result<InvoiceRecord> {
        if index >= self.generated_invoices.len() {
            return Err(Warning::InvoiceNotFound(index).into());
        }
        Ok(self.generated_invoices.remove(index))
    }
}
